//! The symmetric cipher wrapper around every request and response.
//!
//! Everything crossing the local call boundary is UTF-8 text, PKCS#7-padded,
//! encrypted with AES-256-CBC under the session token, and base64-encoded so
//! it survives text-oriented transports. Both directions use the same
//! key/IV pair, so the operations here are deterministic for a given token
//! and input.
//!
//! The IV is fixed for the whole session rather than re-randomized per
//! message. That is a deliberate design decision, not an oversight: the
//! token is single-use, single-session and never persisted, so repeated
//! identical plaintexts leak nothing beyond what the token channel already
//! protects. Changing this would break the existing front end, which
//! derives the same key/IV split from the URL fragment.
//!
//! # Examples
//!
//! ```
//! use backchannel::envelope;
//! use backchannel::token::SessionToken;
//!
//! let token = SessionToken::generate();
//!
//! let blob = envelope::encrypt("hello", token.key(), token.iv());
//! let text = envelope::decrypt(blob.as_bytes(), token.key(), token.iv()).unwrap();
//! assert_eq!(text, "hello");
//! ```

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use crate::token::{IV_LEN, KEY_LEN};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Errors surfaced while unwrapping an encrypted blob.
///
/// These are distinguished internally so logs stay useful, but the gateway
/// collapses all of them into one opaque error body at the call boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The blob was not valid base64.
    #[error("invalid transport encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// The ciphertext was not block-aligned or carried bad padding.
    ///
    /// Wrong-key decryption usually lands here too, since garbage plaintext
    /// rarely ends in valid PKCS#7 padding.
    #[error("malformed ciphertext")]
    Cipher,
    /// The decrypted bytes were not valid UTF-8.
    #[error("decrypted data is not valid text: {0}")]
    Text(#[from] std::string::FromUtf8Error),
}

/// Encrypts plaintext into a base64 transport blob.
///
/// Pads with PKCS#7 (a full extra block when the input is already
/// block-aligned), encrypts with AES-256-CBC, and base64-encodes the result.
///
/// # Examples
///
/// Plaintexts whose length is an exact multiple of the block size still
/// round-trip; the full padding block added here is removed on decrypt:
///
/// ```
/// use backchannel::envelope;
///
/// let key = [1u8; 32];
/// let iv = [2u8; 16];
///
/// let aligned = "0123456789abcdef"; // exactly one AES block
/// let blob = envelope::encrypt(aligned, &key, &iv);
/// // one content block plus one full padding block
/// use base64::{Engine, prelude::BASE64_STANDARD};
/// assert_eq!(BASE64_STANDARD.decode(&blob).unwrap().len(), 32);
/// assert_eq!(envelope::decrypt(blob.as_bytes(), &key, &iv).unwrap(), aligned);
/// ```
pub fn encrypt(plaintext: &str, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> String {
    let ciphertext =
        Aes256CbcEnc::new(key.into(), iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    BASE64_STANDARD.encode(ciphertext)
}

/// Decrypts a base64 transport blob back into plaintext.
///
/// Reverses [`encrypt`]: base64-decode, AES-256-CBC decrypt, strip the
/// PKCS#7 padding, and require the result to be UTF-8.
///
/// # Examples
///
/// Truncated or corrupted input fails rather than yielding garbage:
///
/// ```
/// use backchannel::envelope;
///
/// let key = [1u8; 32];
/// let iv = [2u8; 16];
///
/// // not base64 at all
/// assert!(envelope::decrypt(b"%%not base64%%", &key, &iv).is_err());
///
/// // valid base64, but not block-aligned ciphertext
/// assert!(envelope::decrypt(b"AAAA", &key, &iv).is_err());
///
/// // decrypting under the wrong key never silently yields the original
/// let blob = envelope::encrypt("top secret", &key, &iv);
/// let wrong_key = [9u8; 32];
/// let leaked = envelope::decrypt(blob.as_bytes(), &wrong_key, &iv)
///     .map(|text| text == "top secret")
///     .unwrap_or(false);
/// assert!(!leaked);
/// ```
pub fn decrypt(blob: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Result<String, Error> {
    let ciphertext = BASE64_STANDARD.decode(blob)?;
    let plaintext = Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| Error::Cipher)?;
    Ok(String::from_utf8(plaintext)?)
}
