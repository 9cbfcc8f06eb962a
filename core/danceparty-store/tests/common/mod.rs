//! Checks shared by every store implementation.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use danceparty_crypto::{session_handle, Handle};
use danceparty_keys::{
    activate, ActivationRecord, ActivationState, ActivationStore, KeyCode, KeyError,
};
use danceparty_store::{Product, Session, StoreError, Tag, TrackingStore, User, DEFAULT_SHARD};
use danceparty_types::Environment;
use std::sync::{Arc, Barrier};
use std::thread;

pub const MAC: &str = "00:09:BF:12:34:56";
pub const OTHER_MAC: &str = "00:09:BF:65:43:21";
pub const CODE: &str = "JD5-ABCD-1234-WXY9-0000";

pub fn key(code: &str) -> KeyCode {
    KeyCode::parse(code).unwrap()
}

pub fn product() -> Product {
    Product::with_credentials("Just Dance", "SJDE", Environment::Prod, "jd-code", "pa55word")
}

pub fn session_for(product: &Product, user: &User) -> Session {
    Session {
        session_handle: session_handle(&user.mac_address, 1_700_000_000_000, &product.product_handle),
        user_mac: user.mac_address.clone(),
        user_handle: user.user_handle.clone(),
        ipv4: "192.168.1.20".to_string(),
        product_handle: product.product_handle.clone(),
        environment: product.environment,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

pub fn tag(session: &Session, name: &str, sequence: i64) -> Tag {
    Tag {
        name: name.to_string(),
        attributes: format!("song={sequence}"),
        delta: 250,
        sequence,
        session_handle: session.session_handle.clone(),
        product_handle: session.product_handle.clone(),
        environment: session.environment,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 1).unwrap(),
    }
}

pub fn record(code: &str, max: u32) -> ActivationRecord {
    ActivationRecord::new(key(code), Environment::Prod, 12)
        .with_privilege_name("Extra songs")
        .with_description("Bonus pack")
        .with_game_code("SJDE")
        .with_max_activations(max)
}

// ── Products ─────────────────────────────────────────────────────

pub fn products_roundtrip<S: TrackingStore>(store: &S) {
    let p = product();
    store.insert_product(p.clone()).unwrap();

    let found = store.find_product("jd-code", "pa55word", Environment::Prod).unwrap();
    assert_eq!(found, Some(p.clone()));
    assert_eq!(store.find_product_by_handle(&p.product_handle).unwrap(), Some(p));
}

pub fn products_filter_on_credentials<S: TrackingStore>(store: &S) {
    store.insert_product(product()).unwrap();

    assert!(store.find_product("jd-code", "wrong", Environment::Prod).unwrap().is_none());
    assert!(store.find_product("other", "pa55word", Environment::Prod).unwrap().is_none());
    assert!(store.find_product("jd-code", "pa55word", Environment::Dev).unwrap().is_none());
}

pub fn duplicate_product_rejected<S: TrackingStore>(store: &S) {
    store.insert_product(product()).unwrap();
    let err = store.insert_product(product()).unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)), "{err:?}");
}

// ── Users and sessions ───────────────────────────────────────────

pub fn find_or_create_user_is_idempotent<S: TrackingStore>(store: &S) {
    let first = User::for_mac(MAC);
    let (created, was_new) = store.find_or_create_user(first.clone()).unwrap();
    assert!(was_new);
    assert_eq!(created.shard_id, DEFAULT_SHARD);

    let (again, was_new) = store.find_or_create_user(User::for_mac(MAC)).unwrap();
    assert!(!was_new);
    assert_eq!(again.user_handle, first.user_handle);
    assert_eq!(again.created_at, first.created_at);

    assert_eq!(store.find_user(&first.user_handle).unwrap().unwrap().mac_address, MAC);
    assert!(store.find_user(&User::for_mac(OTHER_MAC).user_handle).unwrap().is_none());
}

pub fn sessions_roundtrip<S: TrackingStore>(store: &S) {
    let p = product();
    let (user, _) = store.find_or_create_user(User::for_mac(MAC)).unwrap();
    let session = session_for(&p, &user);
    store.insert_session(session.clone()).unwrap();

    assert_eq!(store.find_session(&session.session_handle).unwrap(), Some(session.clone()));

    let err = store.insert_session(session).unwrap_err();
    assert!(matches!(err, StoreError::Duplicate(_)));
}

pub fn missing_session_is_none<S: TrackingStore>(store: &S) {
    let handle = Handle::parse(&"a".repeat(40)).unwrap();
    assert!(store.find_session(&handle).unwrap().is_none());
}

// ── Tags ─────────────────────────────────────────────────────────

pub fn tags_listed_in_insertion_order<S: TrackingStore>(store: &S) {
    let p = product();
    let user = User::for_mac(MAC);
    let session = session_for(&p, &user);
    let other = session_for(&p, &User::for_mac(OTHER_MAC));

    store.insert_tag(tag(&session, "song_start", 1)).unwrap();
    store.insert_tag(tag(&other, "song_start", 1)).unwrap();
    store.insert_tag(tag(&session, "song_end", 2)).unwrap();

    let tags = store.list_tags(&session.session_handle).unwrap();
    let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["song_start", "song_end"]);
    assert_eq!(tags[1], tag(&session, "song_end", 2));
}

// ── Keys ─────────────────────────────────────────────────────────

pub fn keys_roundtrip<S: TrackingStore>(store: &S) {
    let r = record(CODE, 2);
    store.insert_key(r.clone()).unwrap();

    assert_eq!(store.find_key(&key(CODE), Environment::Prod).unwrap(), Some(r));
    assert!(store.find_key(&key(CODE), Environment::Dev).unwrap().is_none());

    let err = store.insert_key(record(CODE, 1)).unwrap_err();
    assert!(matches!(err, KeyError::Duplicate(_)), "{err:?}");
}

pub fn activation_persists<S: TrackingStore>(store: &S) {
    store.insert_key(record(CODE, 1)).unwrap();

    let grant = activate(store, CODE, Environment::Prod, MAC).unwrap();
    assert_eq!(grant.privileges, 12);
    assert_eq!(grant.privilege_name, "Extra songs");

    let stored = store.find_key(&key(CODE), Environment::Prod).unwrap().unwrap();
    assert_eq!(stored.activation_count, 1);
    assert_eq!(stored.owner_mac.as_deref(), Some(MAC));
    assert!(stored.activated_at.is_some());
    assert_eq!(stored.state(), ActivationState::Exhausted);

    let err = activate(store, CODE, Environment::Prod, MAC).unwrap_err();
    assert!(matches!(err, KeyError::AlreadyActivated));
}

pub fn failed_mutation_writes_nothing<S: TrackingStore>(store: &S) {
    store.insert_key(record(CODE, 3)).unwrap();
    activate(store, CODE, Environment::Prod, MAC).unwrap();

    let err = activate(store, CODE, Environment::Prod, OTHER_MAC).unwrap_err();
    assert!(matches!(err, KeyError::AlreadyActivated));

    let stored = store.find_key(&key(CODE), Environment::Prod).unwrap().unwrap();
    assert_eq!(stored.activation_count, 1);
    assert_eq!(stored.owner_mac.as_deref(), Some(MAC));
}

pub fn reset_clears_activation<S: TrackingStore>(store: &S) {
    store.insert_key(record(CODE, 1)).unwrap();
    activate(store, CODE, Environment::Prod, MAC).unwrap();

    let reset = store.reset_key(&key(CODE), Environment::Prod).unwrap();
    assert_eq!(reset.activation_count, 0);
    assert!(reset.owner_mac.is_none());
    assert!(reset.activated_at.is_none());

    activate(store, CODE, Environment::Prod, OTHER_MAC).unwrap();
}

pub fn update_of_missing_key_fails<S: TrackingStore>(store: &S) {
    let err = store.reset_key(&key(CODE), Environment::Prod).unwrap_err();
    assert!(matches!(err, KeyError::KeyNotFound));
}

/// Races `threads` activations of one key; exactly `max` must win.
pub fn concurrent_activation_respects_limit<S>(store: Arc<S>, threads: usize, max: u32)
where
    S: TrackingStore + 'static,
{
    store.insert_key(record(CODE, max)).unwrap();
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                activate(store.as_ref(), CODE, Environment::Prod, MAC)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, max as usize);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, KeyError::AlreadyActivated)));

    let stored = store.find_key(&key(CODE), Environment::Prod).unwrap().unwrap();
    assert_eq!(stored.activation_count, max);
}
