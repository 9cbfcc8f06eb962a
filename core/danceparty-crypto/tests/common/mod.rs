//! Shared fixtures for token tests.

#![allow(dead_code)]

use danceparty_crypto::{Token, TokenCipher, TokenSecrets};

pub const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
pub const IV_HEX: &str = "a0a1a2a3a4a5a6a7a8a9aaabacadaeaf";
pub const MAGIC_HEX: &str = "deadbeefcafebabe";

/// Produced by an independent AES-256-CBC implementation from
/// [`golden_fields`] with the secrets above.
pub const GOLDEN_TOKEN: &str = "NDSw4hktchi9ffkzaaxZ8YEH+5UstUdt8EWHYJxbi2CGXSb/W+IlFwSsmH404QoB85Hcs06voWWdy3Lytq0uWLWrrRMK6IiH+1Q8yWxF2aDmyA=";

pub fn secrets() -> TokenSecrets {
    TokenSecrets::from_hex(KEY_HEX, IV_HEX, MAGIC_HEX).unwrap()
}

pub fn cipher() -> TokenCipher {
    TokenCipher::new(secrets())
}

pub fn cipher_with_magic(magic_hex: &str) -> TokenCipher {
    TokenCipher::new(TokenSecrets::from_hex(KEY_HEX, IV_HEX, magic_hex).unwrap())
}

pub fn golden_fields() -> Token {
    Token {
        issued_at: 1_700_000_000,
        game_code: "SJDE".to_string(),
        user_id: 0x0A1B_2C3D_4E5F,
        region: 1,
        language: 2,
        challenge: "ABCDEFGH".to_string(),
        ip_address: "192.168.1.20".to_string(),
        mac_address: "00:09:BF:12:34:56".to_string(),
    }
}
