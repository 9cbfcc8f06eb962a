//! In-memory store.

use crate::error::{StoreError, StoreResult};
use crate::models::{Product, Session, Tag, User};
use crate::TrackingStore;
use danceparty_crypto::Handle;
use danceparty_keys::{ActivationRecord, ActivationStore, KeyCode, KeyError, KeyResult};
use danceparty_types::Environment;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    products: HashMap<Handle, Product>,
    users: HashMap<Handle, User>,
    sessions: HashMap<Handle, Session>,
    tags: Vec<Tag>,
    keys: HashMap<String, ActivationRecord>,
}

/// A store holding every table behind one mutex.
///
/// The lock is held for the whole of each operation, which makes
/// `update_key` atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ActivationStore for MemoryStore {
    fn insert_key(&self, record: ActivationRecord) -> KeyResult<()> {
        let mut tables = self.tables()?;
        let code = record.key_code.as_str().to_string();
        if tables.keys.contains_key(&code) {
            return Err(KeyError::Duplicate(code));
        }
        tables.keys.insert(code, record);
        Ok(())
    }

    fn find_key(&self, code: &KeyCode, env: Environment) -> KeyResult<Option<ActivationRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .keys
            .get(code.as_str())
            .filter(|r| r.environment == env)
            .cloned())
    }

    fn update_key(
        &self,
        code: &KeyCode,
        env: Environment,
        mutate: &mut dyn FnMut(&mut ActivationRecord) -> KeyResult<()>,
    ) -> KeyResult<ActivationRecord> {
        let mut tables = self.tables()?;
        let stored = tables
            .keys
            .get_mut(code.as_str())
            .filter(|r| r.environment == env)
            .ok_or(KeyError::KeyNotFound)?;

        let mut next = stored.clone();
        mutate(&mut next)?;
        *stored = next.clone();
        Ok(next)
    }
}

impl TrackingStore for MemoryStore {
    fn insert_product(&self, product: Product) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.products.contains_key(&product.product_handle) {
            return Err(StoreError::Duplicate(product.product_handle.into_string()));
        }
        tables.products.insert(product.product_handle.clone(), product);
        Ok(())
    }

    fn find_product(
        &self,
        code: &str,
        password: &str,
        env: Environment,
    ) -> StoreResult<Option<Product>> {
        let tables = self.tables()?;
        Ok(tables
            .products
            .values()
            .find(|p| p.code == code && p.password == password && p.environment == env)
            .cloned())
    }

    fn find_product_by_handle(&self, handle: &Handle) -> StoreResult<Option<Product>> {
        Ok(self.tables()?.products.get(handle).cloned())
    }

    fn find_user(&self, handle: &Handle) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(handle).cloned())
    }

    fn find_or_create_user(&self, user: User) -> StoreResult<(User, bool)> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.users.get(&user.user_handle) {
            return Ok((existing.clone(), false));
        }
        tables.users.insert(user.user_handle.clone(), user.clone());
        Ok((user, true))
    }

    fn insert_session(&self, session: Session) -> StoreResult<()> {
        let mut tables = self.tables()?;
        if tables.sessions.contains_key(&session.session_handle) {
            return Err(StoreError::Duplicate(session.session_handle.into_string()));
        }
        tables.sessions.insert(session.session_handle.clone(), session);
        Ok(())
    }

    fn find_session(&self, handle: &Handle) -> StoreResult<Option<Session>> {
        Ok(self.tables()?.sessions.get(handle).cloned())
    }

    fn insert_tag(&self, tag: Tag) -> StoreResult<()> {
        self.tables()?.tags.push(tag);
        Ok(())
    }

    fn list_tags(&self, session: &Handle) -> StoreResult<Vec<Tag>> {
        Ok(self
            .tables()?
            .tags
            .iter()
            .filter(|t| &t.session_handle == session)
            .cloned()
            .collect())
    }
}
