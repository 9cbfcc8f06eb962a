mod common;

use common::{
    cipher, cipher_with_magic, golden_fields, secrets, GOLDEN_TOKEN, IV_HEX, KEY_HEX, MAGIC_HEX,
};
use danceparty_crypto::{CryptoError, Token, TokenCipher, TokenSecrets, TOKEN_PREFIX};

// ── Decryption ───────────────────────────────────────────────────

#[test]
fn golden_token_decrypts_every_field() {
    let token = cipher().decrypt(GOLDEN_TOKEN, None).unwrap();
    assert_eq!(token.issued_at, 1_700_000_000);
    assert_eq!(token.game_code, "SJDE");
    assert_eq!(token.user_id, 0x0A1B_2C3D_4E5F);
    assert_eq!(token.region, 1);
    assert_eq!(token.language, 2);
    assert_eq!(token.challenge, "ABCDEFGH");
    assert_eq!(token.ip_address, "192.168.1.20");
    assert_eq!(token.mac_address, "00:09:BF:12:34:56");
}

#[test]
fn seal_reproduces_golden_token() {
    let sealed = cipher().seal(&golden_fields()).unwrap();
    assert_eq!(sealed, GOLDEN_TOKEN);
}

#[test]
fn unpadded_base64_is_accepted() {
    let unpadded = GOLDEN_TOKEN.trim_end_matches('=');
    let token = cipher().decrypt(unpadded, None).unwrap();
    assert_eq!(token, golden_fields());
}

#[test]
fn product_secret_does_not_change_result() {
    let c = cipher();
    let plain = c.decrypt(GOLDEN_TOKEN, None).unwrap();
    let with_secret = c.decrypt(GOLDEN_TOKEN, Some("product-token")).unwrap();
    assert_eq!(plain, with_secret);
}

#[test]
fn short_fields_are_nul_trimmed() {
    let c = cipher();
    let token = Token {
        game_code: "JD".to_string(),
        ip_address: "1.2.3.4".to_string(),
        ..golden_fields()
    };
    let decoded = c.decrypt(&c.seal(&token).unwrap(), None).unwrap();
    assert_eq!(decoded.game_code, "JD");
    assert_eq!(decoded.ip_address, "1.2.3.4");
}

// ── Rejection ────────────────────────────────────────────────────

fn assert_invalid(result: Result<Token, CryptoError>) {
    assert!(matches!(result, Err(CryptoError::TokenInvalid)), "{result:?}");
}

#[test]
fn missing_prefix_is_invalid() {
    let body = &GOLDEN_TOKEN[TOKEN_PREFIX.len()..];
    assert_invalid(cipher().decrypt(body, None));
    assert_invalid(cipher().decrypt(&format!("XYZ{body}"), None));
}

#[test]
fn prefix_is_case_sensitive() {
    let body = &GOLDEN_TOKEN[TOKEN_PREFIX.len()..];
    assert_invalid(cipher().decrypt(&format!("nds{body}"), None));
}

#[test]
fn empty_and_prefix_only_are_invalid() {
    assert_invalid(cipher().decrypt("", None));
    assert_invalid(cipher().decrypt("NDS", None));
}

#[test]
fn bad_base64_is_invalid() {
    assert_invalid(cipher().decrypt("NDS!!!not base64!!!", None));
}

#[test]
fn partial_block_is_invalid() {
    // 60 base64 chars decode to 45 bytes, not a whole number of blocks.
    let cut = &GOLDEN_TOKEN[..TOKEN_PREFIX.len() + 60];
    assert_invalid(cipher().decrypt(cut, None));
}

#[test]
fn magic_mismatch_is_invalid() {
    let other = cipher_with_magic("0011223344556677");
    assert_invalid(other.decrypt(GOLDEN_TOKEN, None));
}

#[test]
fn magic_prefix_is_accepted() {
    let short = cipher_with_magic(&MAGIC_HEX[..4]);
    assert_eq!(short.decrypt(GOLDEN_TOKEN, None).unwrap(), golden_fields());

    let one_byte = cipher_with_magic(&MAGIC_HEX[..2]);
    assert!(one_byte.decrypt(GOLDEN_TOKEN, None).is_ok());
}

#[test]
fn magic_longer_than_record_is_invalid() {
    let longer = cipher_with_magic(&format!("{MAGIC_HEX}00"));
    assert_invalid(longer.decrypt(GOLDEN_TOKEN, None));
}

#[test]
fn wrong_key_is_invalid() {
    let key = "ff".repeat(32);
    let other = TokenCipher::new(TokenSecrets::from_hex(&key, IV_HEX, MAGIC_HEX).unwrap());
    assert_invalid(other.decrypt(GOLDEN_TOKEN, None));
}

// ── Sealing limits ───────────────────────────────────────────────

#[test]
fn seal_rejects_oversized_fields() {
    let token = Token {
        game_code: "TOOLONG".to_string(),
        ..golden_fields()
    };
    let err = cipher().seal(&token).unwrap_err();
    assert!(matches!(err, CryptoError::FieldTooLong { field: "game_code", max: 4 }));
}

#[test]
fn seal_rejects_user_id_over_48_bits() {
    let token = Token {
        user_id: 1 << 48,
        ..golden_fields()
    };
    assert!(matches!(cipher().seal(&token), Err(CryptoError::UserIdOutOfRange(_))));
}

// ── Secrets ──────────────────────────────────────────────────────

#[test]
fn secrets_reject_wrong_key_length() {
    let err = TokenSecrets::from_hex("0011", IV_HEX, MAGIC_HEX).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidKeyLength { expected: 32, actual: 2 }));
}

#[test]
fn secrets_reject_wrong_iv_length() {
    let err = TokenSecrets::from_hex(KEY_HEX, "00", MAGIC_HEX).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidIvLength { expected: 16, actual: 1 }));
}

#[test]
fn secrets_reject_empty_magic() {
    assert!(matches!(
        TokenSecrets::from_hex(KEY_HEX, IV_HEX, ""),
        Err(CryptoError::EmptyMagic)
    ));
}

#[test]
fn secrets_reject_bad_hex() {
    assert!(matches!(
        TokenSecrets::from_hex("zz", IV_HEX, MAGIC_HEX),
        Err(CryptoError::InvalidHex(_))
    ));
}

#[test]
fn secrets_debug_is_redacted() {
    let debug = format!("{:?}", secrets());
    assert!(debug.contains("REDACTED"));
    assert!(!debug.contains("deadbeef"));
}

#[test]
fn token_invalid_display_hides_cause() {
    assert_eq!(CryptoError::TokenInvalid.to_string(), "console token invalid");
}
