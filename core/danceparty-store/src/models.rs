//! Persisted rows other than activation records.

use chrono::{DateTime, Utc};
use danceparty_crypto::{
    derive_handle, generate_password, product_handle, product_token, user_handle, Handle,
    DEFAULT_PASSWORD_LEN,
};
use danceparty_types::Environment;
use serde::{Deserialize, Serialize};

/// Shard every user is placed on.
pub const DEFAULT_SHARD: &str = "MAIN_Shard";

/// A game build registered with the service.
///
/// Clients identify themselves with `code` and `password`; after login they
/// refer to the product by `product_handle` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_handle: Handle,
    pub name: String,
    /// Code the client sends as `product_code`.
    pub code: String,
    /// Password the client sends as `product_password`.
    pub password: String,
    /// Per-product token derived from code and password.
    pub token: Handle,
    pub environment: Environment,
}

impl Product {
    /// Registers a product with explicit client credentials.
    #[must_use]
    pub fn with_credentials(
        name: impl Into<String>,
        code: &str,
        environment: Environment,
        product_code: impl Into<String>,
        product_password: impl Into<String>,
    ) -> Self {
        let product_code = product_code.into();
        let product_password = product_password.into();
        Self {
            product_handle: product_handle(code, environment.as_str()),
            name: name.into(),
            token: product_token(&product_code, &product_password),
            code: product_code,
            password: product_password,
            environment,
        }
    }

    /// Registers a product with generated client credentials.
    #[must_use]
    pub fn provision(name: impl Into<String>, code: &str, environment: Environment) -> Self {
        let product_code = derive_handle([code]).into_string();
        let password = generate_password(DEFAULT_PASSWORD_LEN);
        Self::with_credentials(name, code, environment, product_code, password)
    }
}

/// A console, keyed by the handle of its MAC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_handle: Handle,
    pub mac_address: String,
    pub shard_id: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds the user row for a console MAC.
    #[must_use]
    pub fn for_mac(mac_address: &str) -> Self {
        Self {
            user_handle: user_handle(mac_address),
            mac_address: mac_address.to_string(),
            shard_id: DEFAULT_SHARD.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// One login of a console into a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_handle: Handle,
    pub user_mac: String,
    pub user_handle: Handle,
    pub ipv4: String,
    pub product_handle: Handle,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
}

/// A telemetry event reported through `track`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub attributes: String,
    pub delta: i64,
    pub sequence: i64,
    pub session_handle: Handle,
    pub product_handle: Handle,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
}
