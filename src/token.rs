//! Session token handling.
//!
//! A session token is the single shared secret between the gateway and the
//! browser front end. It is generated once per process, handed to the browser
//! inside a URL fragment, and held in memory for the lifetime of the gateway.
//! It is never persisted, never rotated, and never reused across processes.
//!
//! The token is 48 random bytes: the first 32 are the AES-256 key, the
//! remaining 16 are the CBC initialization vector. Both halves stay fixed for
//! the whole session, so the confidentiality of repeated identical plaintexts
//! rests on the secrecy of the token itself rather than on nonce freshness.
//!
//! # Examples
//!
//! ```
//! use backchannel::token::SessionToken;
//!
//! let token = SessionToken::generate();
//! assert_eq!(token.key().len(), 32);
//! assert_eq!(token.iv().len(), 16);
//!
//! // The hex rendering round-trips through from_bytes.
//! let hex = token.to_hex();
//! assert_eq!(hex.len(), 96);
//! let bytes = hex::decode(&hex).unwrap();
//! let restored = SessionToken::from_bytes(&bytes).unwrap();
//! assert_eq!(restored.key(), token.key());
//! assert_eq!(restored.iv(), token.iv());
//! ```

use rand::RngCore;

/// Length of the confidentiality key, in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// Length of the initialization vector, in bytes (AES block size).
pub const IV_LEN: usize = 16;
/// Total token length, in bytes.
pub const TOKEN_LEN: usize = KEY_LEN + IV_LEN;

/// The shared secret securing one gateway process's traffic.
///
/// Binds an AES-256 key and a CBC IV together for the lifetime of a session.
/// The `Debug` implementation redacts the material so a token can never leak
/// through logging.
///
/// # Examples
///
/// ```
/// use backchannel::token::SessionToken;
///
/// let token = SessionToken::generate();
/// assert_eq!(format!("{:?}", token), "SessionToken(<redacted>)");
/// ```
pub struct SessionToken {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

/// Error returned when rebuilding a token from a byte slice of the wrong size.
#[derive(Debug, thiserror::Error)]
#[error("security token must be {TOKEN_LEN} bytes, got {0}")]
pub struct InvalidTokenLength(pub usize);

impl SessionToken {
    /// Generates a fresh random token.
    ///
    /// Called exactly once per process, at startup.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        SessionToken { key, iv }
    }

    /// Rebuilds a token from exactly [`TOKEN_LEN`] bytes.
    ///
    /// The first 32 bytes become the key, the remaining 16 the IV.
    ///
    /// # Examples
    ///
    /// ```
    /// use backchannel::token::SessionToken;
    ///
    /// let token = SessionToken::from_bytes(&[7u8; 48]).unwrap();
    /// assert_eq!(token.key(), &[7u8; 32]);
    ///
    /// assert!(SessionToken::from_bytes(&[7u8; 47]).is_err());
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvalidTokenLength> {
        if bytes.len() != TOKEN_LEN {
            return Err(InvalidTokenLength(bytes.len()));
        }
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        key.copy_from_slice(&bytes[..KEY_LEN]);
        iv.copy_from_slice(&bytes[KEY_LEN..]);
        Ok(SessionToken { key, iv })
    }

    /// The confidentiality key (first 32 bytes of the token).
    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    /// The initialization vector (last 16 bytes of the token).
    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// Renders the token as 96 lowercase hex characters.
    ///
    /// This is the form embedded in the URL fragment opened in the browser;
    /// the fragment never reaches the server in HTTP requests, so the secret
    /// travels only over the local launch channel.
    pub fn to_hex(&self) -> String {
        let mut out = hex::encode(self.key);
        out.push_str(&hex::encode(self.iv));
        out
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken(<redacted>)")
    }
}
