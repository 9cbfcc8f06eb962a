//! Activation records and their state transitions.

use crate::code::KeyCode;
use crate::error::{KeyError, KeyResult};
use chrono::{DateTime, Utc};
use danceparty_types::Environment;
use serde::{Deserialize, Serialize};

/// Where a record sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    /// Never activated.
    Available,
    /// Activated at least once, below the limit.
    PartiallyActivated,
    /// Limit reached; no further activation is possible.
    Exhausted,
}

/// Privileges unlocked by a successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// Privilege bitfield sent back as `unlocked_privileges`.
    pub privileges: u32,
    /// Display name of the privilege set.
    pub privilege_name: String,
}

/// Persisted state of one unlock code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRecord {
    pub key_code: KeyCode,
    pub environment: Environment,
    pub privilege_list: u32,
    pub privilege_name: String,
    pub description: String,
    pub game_code: String,
    /// Always at least 1.
    pub max_activations: u32,
    /// Never exceeds `max_activations`.
    pub activation_count: u32,
    /// MAC of the console that owns this key.
    pub owner_mac: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
}

impl ActivationRecord {
    /// Creates a fresh single-use record.
    #[must_use]
    pub fn new(key_code: KeyCode, environment: Environment, privilege_list: u32) -> Self {
        Self {
            key_code,
            environment,
            privilege_list,
            privilege_name: String::new(),
            description: String::new(),
            game_code: String::new(),
            max_activations: 1,
            activation_count: 0,
            owner_mac: None,
            activated_at: None,
        }
    }

    /// Sets the activation limit (at least 1).
    #[must_use]
    pub fn with_max_activations(mut self, max: u32) -> Self {
        self.max_activations = max.max(1);
        self
    }

    #[must_use]
    pub fn with_privilege_name(mut self, name: impl Into<String>) -> Self {
        self.privilege_name = name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_game_code(mut self, game_code: impl Into<String>) -> Self {
        self.game_code = game_code.into();
        self
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ActivationState {
        if self.activation_count >= self.max_activations {
            ActivationState::Exhausted
        } else if self.activation_count == 0 {
            ActivationState::Available
        } else {
            ActivationState::PartiallyActivated
        }
    }

    /// Checks whether `mac` may activate this record now.
    ///
    /// An exhausted record is refused even for its own owner.
    pub fn authorize(&self, mac: &str) -> KeyResult<()> {
        if self.state() == ActivationState::Exhausted {
            return Err(KeyError::AlreadyActivated);
        }
        if self.owner_mac.as_deref().is_some_and(|owner| owner != mac) {
            return Err(KeyError::AlreadyActivated);
        }
        Ok(())
    }

    /// Authorizes and applies one activation by `mac`.
    pub fn activate(&mut self, mac: &str, now: DateTime<Utc>) -> KeyResult<()> {
        self.authorize(mac)?;
        self.owner_mac = Some(mac.to_string());
        self.activated_at = Some(now);
        self.activation_count += 1;
        Ok(())
    }

    /// Returns the record to `Available`.
    pub fn reset(&mut self) {
        self.owner_mac = None;
        self.activated_at = None;
        self.activation_count = 0;
    }

    /// The privileges this record unlocks.
    #[must_use]
    pub fn grant(&self) -> Grant {
        Grant {
            privileges: self.privilege_list,
            privilege_name: self.privilege_name.clone(),
        }
    }
}
