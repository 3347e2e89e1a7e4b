// common/src/token.rs
//! Reversible mapping between a [`UserId`] and the opaque `token` URL parameter.
//!
//! The cipher is deterministic and unauthenticated (no IV, no tag): the same
//! identifier always produces the same token. The issuing side depends on
//! this, so it stays until both ends move to an authenticated scheme.
use std::fmt;

use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use serde::{Deserialize, Serialize};

use crate::config::TokenConfig;
use crate::error::TokenError;
use crate::models::UserId;

type Aes128EcbEnc = ecb::Encryptor<aes::Aes128>;
type Aes128EcbDec = ecb::Decryptor<aes::Aes128>;

pub const AES_KEY_LEN: usize = 16;
const AES_BLOCK_LEN: usize = 16;

/// Cipher applied to the identifier bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScheme {
    /// AES-128, ECB mode, PKCS#7 padding
    #[default]
    Aes128Ecb,
    /// Repeating-key XOR used by the first issuer
    Xor,
}

/// Textual form of the ciphertext inside the URL
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEncoding {
    /// URL-safe base64 without padding (`=` padding tolerated on input)
    #[default]
    Base64url,
    /// Standard base64 with padding
    Base64,
    /// Lowercase hex
    Hex,
}

impl TokenEncoding {
    fn encode(self, bytes: &[u8]) -> String {
        match self {
            TokenEncoding::Base64url => base64::encode_config(bytes, base64::URL_SAFE_NO_PAD),
            TokenEncoding::Base64 => base64::encode_config(bytes, base64::STANDARD),
            TokenEncoding::Hex => hex::encode(bytes),
        }
    }

    /// Decode `token`, accepting only the spelling `encode` would produce.
    fn decode(self, token: &str) -> Result<Vec<u8>, TokenError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Decode("empty token".into()));
        }

        let (bytes, body) = match self {
            TokenEncoding::Base64url => {
                let body = token.trim_end_matches('=');
                let bytes = base64::decode_config(body, base64::URL_SAFE_NO_PAD)
                    .map_err(|e| TokenError::Decode(e.to_string()))?;
                (bytes, body)
            }
            TokenEncoding::Base64 => {
                let bytes = base64::decode_config(token, base64::STANDARD)
                    .map_err(|e| TokenError::Decode(e.to_string()))?;
                (bytes, token)
            }
            TokenEncoding::Hex => {
                let bytes = hex::decode(token).map_err(|e| TokenError::Decode(e.to_string()))?;
                (bytes, token)
            }
        };

        // every ciphertext has exactly one accepted spelling
        let canonical = match self {
            TokenEncoding::Base64url => base64::encode_config(&bytes, base64::URL_SAFE_NO_PAD),
            other => other.encode(&bytes),
        };
        if canonical != body {
            return Err(TokenError::Decode("non-canonical encoding".into()));
        }
        Ok(bytes)
    }
}

#[derive(Clone)]
enum Cipher {
    Aes128Ecb([u8; AES_KEY_LEN]),
    Xor(Vec<u8>),
}

impl Cipher {
    fn seal(&self, plaintext: &[u8]) -> Vec<u8> {
        match self {
            Cipher::Aes128Ecb(key) => {
                Aes128EcbEnc::new(&(*key).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
            }
            Cipher::Xor(key) => xor_with_key(plaintext, key),
        }
    }

    fn open(&self, ciphertext: &[u8]) -> Result<Vec<u8>, TokenError> {
        match self {
            Cipher::Aes128Ecb(key) => {
                if ciphertext.is_empty() || ciphertext.len() % AES_BLOCK_LEN != 0 {
                    return Err(TokenError::Crypto(format!(
                        "ciphertext length {} is not a whole number of blocks",
                        ciphertext.len()
                    )));
                }
                Aes128EcbDec::new(&(*key).into())
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| TokenError::Crypto("inconsistent padding".into()))
            }
            Cipher::Xor(key) => Ok(xor_with_key(ciphertext, key)),
        }
    }
}

fn xor_with_key(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(byte, k)| byte ^ k)
        .collect()
}

/// Encrypts identifiers into URL tokens and back, with a fixed shared key
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Cipher,
    encoding: TokenEncoding,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.cipher {
            Cipher::Aes128Ecb(_) => TokenScheme::Aes128Ecb,
            Cipher::Xor(_) => TokenScheme::Xor,
        };
        f.debug_struct("TokenCodec")
            .field("scheme", &scheme)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(key: &[u8], scheme: TokenScheme, encoding: TokenEncoding) -> Result<Self, TokenError> {
        let cipher = match scheme {
            TokenScheme::Aes128Ecb => {
                let key: [u8; AES_KEY_LEN] = key.try_into().map_err(|_| {
                    TokenError::InvalidKey(format!(
                        "AES-128 needs a {AES_KEY_LEN}-byte key, got {} bytes",
                        key.len()
                    ))
                })?;
                Cipher::Aes128Ecb(key)
            }
            TokenScheme::Xor => {
                if key.is_empty() {
                    return Err(TokenError::InvalidKey("XOR key is empty".into()));
                }
                Cipher::Xor(key.to_vec())
            }
        };
        Ok(Self { cipher, encoding })
    }

    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenError> {
        Self::new(config.key.as_bytes(), config.scheme, config.encoding)
    }

    /// Encrypt an identifier into its URL token
    pub fn encrypt(&self, user_id: &UserId) -> String {
        let ciphertext = self.cipher.seal(user_id.as_str().as_bytes());
        self.encoding.encode(&ciphertext)
    }

    /// Recover the identifier carried by `token`.
    ///
    /// Anything that does not decrypt to a plausible identifier is an error;
    /// callers never see a garbage identifier.
    pub fn decrypt(&self, token: &str) -> Result<UserId, TokenError> {
        let ciphertext = self.encoding.decode(token)?;
        let plaintext = self.cipher.open(&ciphertext)?;
        let text = String::from_utf8(plaintext)
            .map_err(|_| TokenError::Crypto("plaintext is not valid UTF-8".into()))?;
        UserId::parse(&text)
            .map_err(|_| TokenError::Crypto("plaintext is not a plausible identifier".into()))
    }
}
