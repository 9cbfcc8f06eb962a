//! Key redemption against a store.

use crate::code::KeyCode;
use crate::error::{KeyError, KeyResult};
use crate::record::{ActivationRecord, Grant};
use chrono::Utc;
use danceparty_types::Environment;

/// Persistence for activation records.
///
/// Implementations must run [`update_key`](Self::update_key) as a single
/// atomic read-modify-write per record: no other update of the same record
/// may interleave between the read handed to `mutate` and the write of its
/// result.
pub trait ActivationStore: Send + Sync {
    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Duplicate`] if the code already exists in any
    /// environment.
    fn insert_key(&self, record: ActivationRecord) -> KeyResult<()>;

    /// Looks up a record by code and environment.
    fn find_key(&self, code: &KeyCode, env: Environment) -> KeyResult<Option<ActivationRecord>>;

    /// Loads the record, applies `mutate` and persists the result.
    ///
    /// Nothing is written when `mutate` returns an error. Returns the record
    /// as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeyNotFound`] when no record matches, or whatever
    /// `mutate` returns.
    fn update_key(
        &self,
        code: &KeyCode,
        env: Environment,
        mutate: &mut dyn FnMut(&mut ActivationRecord) -> KeyResult<()>,
    ) -> KeyResult<ActivationRecord>;

    /// Clears owner, timestamp and counter.
    fn reset_key(&self, code: &KeyCode, env: Environment) -> KeyResult<ActivationRecord> {
        self.update_key(code, env, &mut |record| {
            record.reset();
            Ok(())
        })
    }
}

/// Redeems `raw_key` for the console identified by `mac`.
///
/// Steps, each short-circuiting: grammar check, lookup, exhaustion check,
/// ownership check, then owner/timestamp/counter update. Everything after the
/// grammar check runs inside one [`ActivationStore::update_key`] call.
///
/// # Errors
///
/// [`KeyError::InvalidKeyFormat`], [`KeyError::KeyNotFound`],
/// [`KeyError::AlreadyActivated`], or a store error.
pub fn activate<S>(store: &S, raw_key: &str, env: Environment, mac: &str) -> KeyResult<Grant>
where
    S: ActivationStore + ?Sized,
{
    let code = KeyCode::parse(raw_key)?;
    activate_code(store, &code, env, mac)
}

/// [`activate`] for a code that has already passed the grammar check.
///
/// # Errors
///
/// Same as [`activate`], minus [`KeyError::InvalidKeyFormat`].
pub fn activate_code<S>(store: &S, code: &KeyCode, env: Environment, mac: &str) -> KeyResult<Grant>
where
    S: ActivationStore + ?Sized,
{
    let now = Utc::now();
    let record = store.update_key(code, env, &mut |record| record.activate(mac, now))?;
    Ok(record.grant())
}

/// Mints `count` fresh codes with a shared template and inserts them.
///
/// Codes that collide with existing ones are regenerated.
pub fn mint_keys<S>(
    store: &S,
    prefix: &str,
    count: usize,
    template: &ActivationRecord,
) -> KeyResult<Vec<KeyCode>>
where
    S: ActivationStore + ?Sized,
{
    const MAX_ATTEMPTS: usize = 8;

    let mut minted = Vec::with_capacity(count);
    for _ in 0..count {
        let mut attempt = 0;
        loop {
            let code = KeyCode::generate(prefix)?;
            let record = ActivationRecord {
                key_code: code.clone(),
                ..template.clone()
            };
            match store.insert_key(record) {
                Ok(()) => {
                    minted.push(code);
                    break;
                }
                Err(KeyError::Duplicate(_)) if attempt + 1 < MAX_ATTEMPTS => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
    Ok(minted)
}
