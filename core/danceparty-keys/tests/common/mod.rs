//! Minimal store for exercising the activation rule.

#![allow(dead_code)]

use danceparty_keys::{ActivationRecord, ActivationStore, KeyCode, KeyError, KeyResult};
use danceparty_types::Environment;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct TestStore {
    records: Mutex<HashMap<String, ActivationRecord>>,
}

impl TestStore {
    pub fn with(records: impl IntoIterator<Item = ActivationRecord>) -> Self {
        let store = Self::default();
        for r in records {
            store.insert_key(r).unwrap();
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl ActivationStore for TestStore {
    fn insert_key(&self, record: ActivationRecord) -> KeyResult<()> {
        let mut records = self.records.lock().unwrap();
        let code = record.key_code.as_str().to_string();
        if records.contains_key(&code) {
            return Err(KeyError::Duplicate(code));
        }
        records.insert(code, record);
        Ok(())
    }

    fn find_key(&self, code: &KeyCode, env: Environment) -> KeyResult<Option<ActivationRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records
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
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(code.as_str())
            .filter(|r| r.environment == env)
            .ok_or(KeyError::KeyNotFound)?;
        let mut next = record.clone();
        mutate(&mut next)?;
        *record = next.clone();
        Ok(next)
    }
}

pub const CODE: &str = "JD5-ABCD-1234-WXY9-0000";
pub const MAC_A: &str = "00:09:BF:00:00:0A";
pub const MAC_B: &str = "00:09:BF:00:00:0B";

pub fn key(code: &str) -> KeyCode {
    KeyCode::parse(code).unwrap()
}

pub fn fresh(code: &str, max: u32) -> ActivationRecord {
    ActivationRecord::new(key(code), Environment::Prod, 12)
        .with_privilege_name("Extra songs")
        .with_max_activations(max)
}
