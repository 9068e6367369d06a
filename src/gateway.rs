//! The encrypted call gateway.
//!
//! One gateway exists per process. It owns the session token and the
//! wrapped client handle, and exposes a single operation: take an
//! encrypted request blob, decrypt it, dispatch the decoded call, and hand
//! back the encrypted response. The front door never sees plaintext.
//!
//! # Dispatch
//!
//! The decrypted request is a JSON [`Envelope`] naming a method and an
//! ordered argument list. Methods resolve against a statically declared
//! allow-list — `exit`, `name`, `pull`, `push` — and nothing else. The
//! original design resolved method names reflectively against object
//! members, first on the proxy and then on the wrapped client; the static
//! list preserves that precedence (the gateway surface is consulted first
//! and exclusively) while making the exposed surface auditable and closing
//! the arbitrary-invocation hazard.
//!
//! `pull` and `push` are not pass-throughs: the wrapped client speaks raw
//! bytes while the transport speaks text, so `pull` decodes each queued
//! blob to UTF-8 and `push` encodes the message text to bytes before
//! forwarding.
//!
//! # Errors
//!
//! Internally the gateway distinguishes decrypt, parse, unknown-method,
//! bad-params and client failures. Externally they all collapse to one
//! opaque outcome: an encrypted error string plus an out-of-band error
//! status on the transport. The one structurally distinct outcome is
//! `exit`, which asks the host to terminate instead of returning a value.
//!
//! # Examples
//!
//! The example scenario end to end — a `name` call encrypted under the
//! session token comes back as the client's identity, encrypted under the
//! same token:
//!
//! ```
//! use backchannel::client::memory::MemoryClient;
//! use backchannel::envelope;
//! use backchannel::gateway::{CallOutcome, Gateway};
//! use backchannel::token::SessionToken;
//!
//! let token = SessionToken::generate();
//! let (key, iv) = (*token.key(), *token.iv());
//! let mut gateway = Gateway::new(token, Box::new(MemoryClient::new("alice")));
//!
//! let request = envelope::encrypt(r#"{"method": "name", "params": null}"#, &key, &iv);
//! match gateway.call(request.as_bytes()) {
//!     CallOutcome::Response(blob) => {
//!         let text = envelope::decrypt(blob.as_bytes(), &key, &iv).unwrap();
//!         assert_eq!(text, r#""alice""#);
//!     }
//!     other => panic!("expected a response, got {other:?}"),
//! }
//! ```

use serde_json::Value;

use crate::client::{ClientError, MessagingClient};
use crate::envelope;
use crate::token::SessionToken;

/// The wire unit exchanged with the front end, after decryption.
///
/// `params` is an ordered list of JSON-compatible values; the front end
/// sends `null` for calls that take no arguments.
///
/// # Examples
///
/// ```
/// use backchannel::gateway::Envelope;
///
/// let envelope: Envelope = serde_json::from_str(
///     r#"{"method": "push", "params": ["bob", "hi"]}"#,
/// ).unwrap();
/// assert_eq!(envelope.method, "push");
/// assert_eq!(envelope.params.unwrap().len(), 2);
///
/// // null params are accepted
/// let envelope: Envelope = serde_json::from_str(
///     r#"{"method": "pull", "params": null}"#,
/// ).unwrap();
/// assert!(envelope.params.is_none());
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    /// The operation to invoke.
    pub method: String,
    /// Positional arguments, or `None`/`null` for none.
    pub params: Option<Vec<Value>>,
}

/// The result of one gateway call, as seen by the front door.
#[derive(Debug)]
pub enum CallOutcome {
    /// The encrypted JSON-serialized return value. Deliver with a success
    /// status.
    Response(String),
    /// The encrypted error description. Deliver with a 500-class status;
    /// the encrypted body and the out-of-band status are both required.
    Failure(String),
    /// The `exit` operation was invoked. The host process should terminate
    /// without producing a further encrypted response.
    Exit,
}

/// Everything that can go wrong between decryption and invocation.
///
/// This taxonomy exists for logs; callers of [`Gateway::call`] only ever
/// see the rendered text inside [`CallOutcome::Failure`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request blob failed to decrypt or decode.
    #[error("{0}")]
    Envelope(#[from] envelope::Error),
    /// The decrypted text was not a valid call envelope.
    #[error("malformed call envelope: {0}")]
    Parse(#[from] serde_json::Error),
    /// The method is not on the exposed surface.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
    /// The method exists but the arguments don't fit it.
    #[error("invalid params for {method}: {detail}")]
    InvalidParams {
        /// The method being invoked.
        method: &'static str,
        /// What was wrong with the arguments.
        detail: String,
    },
    /// The wrapped client reported a failure.
    #[error("{0}")]
    Client(#[from] ClientError),
    /// A pulled message was not valid UTF-8 and cannot cross the text
    /// transport.
    #[error("message is not valid text: {0}")]
    MessageText(#[from] std::string::FromUtf8Error),
}

/// One gateway session: a security token bound to a wrapped client handle.
///
/// Exactly one of these exists per running process. The front door is
/// expected to serialize calls into it (connections may be concurrent, the
/// gateway is not), which is why it is typically held behind a mutex.
///
/// # Examples
///
/// Unknown or unexposed method names come back as the generic failure,
/// never a crash:
///
/// ```
/// use backchannel::client::memory::MemoryClient;
/// use backchannel::envelope;
/// use backchannel::gateway::{CallOutcome, Gateway};
/// use backchannel::token::SessionToken;
///
/// let token = SessionToken::generate();
/// let (key, iv) = (*token.key(), *token.iv());
/// let mut gateway = Gateway::new(token, Box::new(MemoryClient::new("alice")));
///
/// for method in ["drop_table", "user", "__dict__", ""] {
///     let text = serde_json::to_string(
///         &backchannel::gateway::Envelope { method: method.into(), params: None },
///     ).unwrap();
///     let request = envelope::encrypt(&text, &key, &iv);
///     match gateway.call(request.as_bytes()) {
///         CallOutcome::Failure(blob) => {
///             let error = envelope::decrypt(blob.as_bytes(), &key, &iv).unwrap();
///             assert!(error.contains("unknown method"));
///         }
///         other => panic!("expected a failure, got {other:?}"),
///     }
/// }
/// ```
///
/// Tampered ciphertext fails the same way instead of being dispatched as
/// garbage:
///
/// ```
/// use backchannel::client::memory::MemoryClient;
/// use backchannel::gateway::{CallOutcome, Gateway};
/// use backchannel::token::SessionToken;
///
/// let mut gateway = Gateway::new(
///     SessionToken::generate(),
///     Box::new(MemoryClient::new("alice")),
/// );
/// assert!(matches!(
///     gateway.call(b"@@@ not even base64 @@@"),
///     CallOutcome::Failure(_)
/// ));
/// ```
pub struct Gateway {
    token: SessionToken,
    client: Box<dyn MessagingClient>,
}

impl Gateway {
    /// Binds a session token to a wrapped client handle.
    pub fn new(token: SessionToken, client: Box<dyn MessagingClient>) -> Self {
        Gateway { token, client }
    }

    /// The single call boundary: encrypted request in, encrypted response out.
    ///
    /// Decrypts the request under the session token, parses and dispatches
    /// the envelope, then re-encrypts either the JSON result or the error
    /// text under the same token. Invariant: the response key/IV are always
    /// the ones that decrypted the request.
    ///
    /// # Examples
    ///
    /// `push` then `pull` against a synchronously-enqueuing client returns
    /// the pushed text:
    ///
    /// ```
    /// use backchannel::client::memory::MemoryClient;
    /// use backchannel::envelope;
    /// use backchannel::gateway::{CallOutcome, Gateway};
    /// use backchannel::token::SessionToken;
    ///
    /// let token = SessionToken::generate();
    /// let (key, iv) = (*token.key(), *token.iv());
    /// let mut gateway = Gateway::new(token, Box::new(MemoryClient::new("alice")));
    ///
    /// let push = envelope::encrypt(
    ///     r#"{"method": "push", "params": ["bob", "hi"]}"#, &key, &iv,
    /// );
    /// match gateway.call(push.as_bytes()) {
    ///     CallOutcome::Response(blob) => {
    ///         let text = envelope::decrypt(blob.as_bytes(), &key, &iv).unwrap();
    ///         assert_eq!(text, "null");
    ///     }
    ///     other => panic!("push failed: {other:?}"),
    /// }
    ///
    /// let pull = envelope::encrypt(r#"{"method": "pull", "params": null}"#, &key, &iv);
    /// match gateway.call(pull.as_bytes()) {
    ///     CallOutcome::Response(blob) => {
    ///         let text = envelope::decrypt(blob.as_bytes(), &key, &iv).unwrap();
    ///         let messages: Vec<String> = serde_json::from_str(&text).unwrap();
    ///         assert_eq!(messages, vec!["hi".to_string()]);
    ///     }
    ///     other => panic!("pull failed: {other:?}"),
    /// }
    /// ```
    ///
    /// `exit` is the one call that yields no encrypted response:
    ///
    /// ```
    /// use backchannel::client::memory::MemoryClient;
    /// use backchannel::envelope;
    /// use backchannel::gateway::{CallOutcome, Gateway};
    /// use backchannel::token::SessionToken;
    ///
    /// let token = SessionToken::generate();
    /// let (key, iv) = (*token.key(), *token.iv());
    /// let mut gateway = Gateway::new(token, Box::new(MemoryClient::new("alice")));
    ///
    /// let request = envelope::encrypt(r#"{"method": "exit", "params": null}"#, &key, &iv);
    /// assert!(matches!(gateway.call(request.as_bytes()), CallOutcome::Exit));
    /// ```
    pub fn call(&mut self, request: &[u8]) -> CallOutcome {
        match self.dispatch(request) {
            Ok(Some(result)) => CallOutcome::Response(self.encrypt(&result)),
            Ok(None) => CallOutcome::Exit,
            Err(e) => {
                logwise::warn_sync!(
                    "gateway call failed: {error}",
                    error = logwise::privacy::LogIt(&e)
                );
                CallOutcome::Failure(self.encrypt(&e.to_string()))
            }
        }
    }

    fn encrypt(&self, text: &str) -> String {
        envelope::encrypt(text, self.token.key(), self.token.iv())
    }

    /// Decrypts, parses and invokes. `Ok(None)` means `exit` was called.
    fn dispatch(&mut self, request: &[u8]) -> Result<Option<String>, Error> {
        let plaintext = envelope::decrypt(request, self.token.key(), self.token.iv())?;
        let envelope: Envelope = serde_json::from_str(&plaintext)?;
        let params = envelope.params.unwrap_or_default();

        let result = match envelope.method.as_str() {
            "exit" => return Ok(None),
            "name" => Value::String(self.client.user()),
            "pull" => {
                let mut texts = Vec::new();
                for data in self.client.pull()? {
                    texts.push(Value::String(String::from_utf8(data)?));
                }
                Value::Array(texts)
            }
            "push" => {
                let receiver = str_param(&params, 0, "push")?;
                let message = str_param(&params, 1, "push")?;
                self.client.push(receiver, message.as_bytes())?;
                Value::Null
            }
            other => return Err(Error::UnknownMethod(other.to_string())),
        };

        Ok(Some(serde_json::to_string(&result)?))
    }
}

/// Extracts a required positional string argument.
fn str_param<'a>(params: &'a [Value], index: usize, method: &'static str) -> Result<&'a str, Error> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::InvalidParams {
            method,
            detail: format!("expected a string at position {index}"),
        })
}
