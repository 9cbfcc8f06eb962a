//! Service fixtures: a seeded memory store and tokens sealed for it.

#![allow(dead_code)]

use danceparty_crypto::{Token, TokenCipher, TokenSecrets};
use danceparty_keys::{ActivationRecord, ActivationStore, KeyCode};
use danceparty_store::{MemoryStore, Product, TrackingStore};
use danceparty_tracking::{TrackingRequest, TrackingService};
use danceparty_types::Environment;
use danceparty_wire::WireResponse;

pub const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const IV_HEX: &str = "a0a1a2a3a4a5a6a7a8a9aaabacadaeaf";
pub const MAGIC_HEX: &str = "deadbeefcafebabe";

pub const PRODUCT_CODE: &str = "jd2015-code";
pub const PRODUCT_PASSWORD: &str = "k3yb0ard";
pub const KEY: &str = "JD5-ABCD-1234-WXY9-0000";
pub const MAC_A: &str = "00:09:BF:12:34:56";
pub const MAC_B: &str = "00:09:BF:65:43:21";
pub const CLIENT_IP: &str = "203.0.113.7";

pub type Service = TrackingService<MemoryStore>;

pub fn cipher() -> TokenCipher {
    TokenCipher::new(TokenSecrets::from_hex(KEY_HEX, IV_HEX, MAGIC_HEX).unwrap())
}

pub fn product() -> Product {
    Product::with_credentials(
        "Just Dance 2015",
        "SJDE",
        Environment::Prod,
        PRODUCT_CODE,
        PRODUCT_PASSWORD,
    )
}

/// A service with one product and one single-use key.
pub fn service() -> Service {
    let store = MemoryStore::new();
    store.insert_product(product()).unwrap();
    store
        .insert_key(
            ActivationRecord::new(KeyCode::parse(KEY).unwrap(), Environment::Prod, 12)
                .with_privilege_name("Extra songs"),
        )
        .unwrap();
    TrackingService::new(cipher(), store)
}

pub fn token_for(mac: &str) -> String {
    cipher()
        .seal(&Token {
            issued_at: 1_700_000_000,
            game_code: "SJDE".to_string(),
            user_id: 0x0A1B_2C3D_4E5F,
            region: 1,
            language: 2,
            challenge: "ABCDEFGH".to_string(),
            ip_address: "192.168.1.20".to_string(),
            mac_address: mac.to_string(),
        })
        .unwrap()
}

pub fn login_request(mac: &str) -> TrackingRequest {
    TrackingRequest {
        action: Some("login".to_string()),
        token: Some(token_for(mac)),
        product_code: Some(PRODUCT_CODE.to_string()),
        product_password: Some(PRODUCT_PASSWORD.to_string()),
        env: Some("prod".to_string()),
        ..Default::default()
    }
}

pub fn activate_request(mac: &str, key: &str) -> TrackingRequest {
    TrackingRequest {
        action: Some("activatekey".to_string()),
        key: Some(key.to_string()),
        ..login_request(mac)
    }
}

/// Logs in and returns a `track` request for the new session.
pub fn track_request(service: &Service, mac: &str, tag: &str) -> TrackingRequest {
    let login = service.handle(&login_request(mac), CLIENT_IP);
    TrackingRequest {
        action: Some("track".to_string()),
        product_id: Some(text(&login, "product_id")),
        user_id: Some(text(&login, "user_id")),
        session_id: Some(text(&login, "session_id")),
        tag: Some(tag.to_string()),
        env: Some("prod".to_string()),
        ..Default::default()
    }
}

pub fn text(response: &WireResponse, name: &str) -> String {
    response
        .get(name)
        .and_then(|v| v.as_str())
        .unwrap_or_else(|| panic!("missing string field {name} in {response}"))
        .to_string()
}
