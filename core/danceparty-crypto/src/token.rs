//! Console token decryption.
//!
//! A token is `NDS` followed by base64 of an AES-256-CBC (PKCS#7) ciphertext.
//! The plaintext is a fixed little-endian record:
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 8    | issued_at   |
//! | 8      | 4    | game_code   |
//! | 12     | 6    | user_id     |
//! | 18     | 1    | region      |
//! | 19     | 1    | language    |
//! | 20     | 8    | challenge   |
//! | 28     | 15   | ip_address  |
//! | 43     | 17   | mac_address |
//! | 60     | n    | magic       |
//!
//! Bytes following the magic are ignored.

use crate::error::{CryptoError, CryptoResult};
use crate::secrets::TokenSecrets;
use aes::Aes256;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};
use tracing::debug;

type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Marker every console token starts with.
pub const TOKEN_PREFIX: &str = "NDS";

/// Size of the record preceding the magic.
pub const RECORD_SIZE: usize = 60;

const GAME_CODE_LEN: usize = 4;
const USER_ID_LEN: usize = 6;
const CHALLENGE_LEN: usize = 8;
const IP_ADDRESS_LEN: usize = 15;
const MAC_ADDRESS_LEN: usize = 17;
const USER_ID_MAX: u64 = (1 << 48) - 1;

/// Standard alphabet, padding optional on decode.
const TOKEN_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Fields recovered from a console token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Issue time as written by the issuing service.
    pub issued_at: u64,
    /// Four-character game code, NULs removed.
    pub game_code: String,
    /// 48-bit console user id.
    pub user_id: u64,
    pub region: u8,
    pub language: u8,
    /// Eight bytes of opaque challenge text, kept verbatim.
    pub challenge: String,
    /// Client IP as seen by the issuing service, NULs removed.
    pub ip_address: String,
    /// Console MAC in `AA:BB:CC:DD:EE:FF` form.
    pub mac_address: String,
}

impl Token {
    /// Serializes the fixed record (without magic).
    pub fn to_record(&self) -> CryptoResult<Vec<u8>> {
        if self.user_id > USER_ID_MAX {
            return Err(CryptoError::UserIdOutOfRange(self.user_id));
        }

        let mut out = Vec::with_capacity(RECORD_SIZE);
        out.extend_from_slice(&self.issued_at.to_le_bytes());
        put_text(&mut out, "game_code", &self.game_code, GAME_CODE_LEN)?;
        out.extend_from_slice(&self.user_id.to_le_bytes()[..USER_ID_LEN]);
        out.push(self.region);
        out.push(self.language);
        put_text(&mut out, "challenge", &self.challenge, CHALLENGE_LEN)?;
        put_text(&mut out, "ip_address", &self.ip_address, IP_ADDRESS_LEN)?;
        put_text(&mut out, "mac_address", &self.mac_address, MAC_ADDRESS_LEN)?;
        Ok(out)
    }

    /// Parses a decrypted plaintext, checking the trailing magic.
    fn from_plaintext(plain: &[u8], magic: &[u8]) -> Result<Self, Rejection> {
        let mut r = Reader::new(plain);

        let issued_at = u64::from_le_bytes(r.array::<8>()?);
        let game_code = stripped_text(r.take(GAME_CODE_LEN)?);
        let mut user_id = [0u8; 8];
        user_id[..USER_ID_LEN].copy_from_slice(r.take(USER_ID_LEN)?);
        let region = r.byte()?;
        let language = r.byte()?;
        let challenge = String::from_utf8_lossy(r.take(CHALLENGE_LEN)?).into_owned();
        let ip_address = stripped_text(r.take(IP_ADDRESS_LEN)?);
        let mac_address = stripped_text(r.take(MAC_ADDRESS_LEN)?);

        if !bytes_equal(r.take(magic.len())?, magic) {
            return Err(Rejection::Magic);
        }

        Ok(Self {
            issued_at,
            game_code,
            user_id: u64::from_le_bytes(user_id),
            region,
            language,
            challenge,
            ip_address,
            mac_address,
        })
    }
}

/// Why a token was rejected. Only ever logged, never returned.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    Prefix,
    Base64,
    Cipher,
    Truncated,
    Magic,
}

/// Decrypts and seals console tokens with one set of secrets.
#[derive(Debug, Clone)]
pub struct TokenCipher {
    secrets: TokenSecrets,
}

impl TokenCipher {
    /// Creates a cipher over the given secrets.
    #[must_use]
    pub fn new(secrets: TokenSecrets) -> Self {
        Self { secrets }
    }

    /// Decodes a console token.
    ///
    /// `product_secret` is the per-product token from the product record. This
    /// token generation is encrypted with the shared secrets only, so it does
    /// not change the result.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::TokenInvalid`] for every kind of failure.
    pub fn decrypt(&self, token: &str, product_secret: Option<&str>) -> CryptoResult<Token> {
        self.open(token).map_err(|reason| {
            debug!(
                ?reason,
                has_product_secret = product_secret.is_some(),
                "console token rejected"
            );
            CryptoError::TokenInvalid
        })
    }

    fn open(&self, token: &str) -> Result<Token, Rejection> {
        let body = token.strip_prefix(TOKEN_PREFIX).ok_or(Rejection::Prefix)?;
        let ciphertext = TOKEN_BASE64
            .decode(body.trim_end())
            .map_err(|_| Rejection::Base64)?;

        let plain = Aes256CbcDec::new(self.secrets.key().into(), self.secrets.iv().into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| Rejection::Cipher)?;

        Token::from_plaintext(&plain, self.secrets.magic())
    }

    /// Encodes a token the way the issuing service does.
    pub fn seal(&self, token: &Token) -> CryptoResult<String> {
        let mut plain = token.to_record()?;
        plain.extend_from_slice(self.secrets.magic());

        let ciphertext = Aes256CbcEnc::new(self.secrets.key().into(), self.secrets.iv().into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plain);

        Ok(format!("{TOKEN_PREFIX}{}", TOKEN_BASE64.encode(ciphertext)))
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Rejection> {
        let end = self.pos.checked_add(n).ok_or(Rejection::Truncated)?;
        let slice = self.buf.get(self.pos..end).ok_or(Rejection::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], Rejection> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn byte(&mut self) -> Result<u8, Rejection> {
        Ok(self.take(1)?[0])
    }
}

fn stripped_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).replace('\0', "")
}

fn put_text(out: &mut Vec<u8>, field: &'static str, value: &str, len: usize) -> CryptoResult<()> {
    let bytes = value.as_bytes();
    if bytes.len() > len {
        return Err(CryptoError::FieldTooLong { field, max: len });
    }
    out.extend_from_slice(bytes);
    out.resize(out.len() + (len - bytes.len()), 0);
    Ok(())
}

// Length-checked comparison that inspects every byte.
fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
