//! The wrapped messaging client.
//!
//! The gateway does not implement a messaging protocol of its own; it
//! forwards calls to an existing client. That client is byte-oriented
//! (messages are raw byte blobs), while the browser transport is
//! text-oriented, so the gateway's `pull`/`push` handlers re-encode at the
//! boundary. The [`MessagingClient`] trait is the seam between the two.
//!
//! Two implementations ship with the crate:
//!
//! - [`command::CommandClient`] drives a real messaging CLI as a
//!   subprocess. This is what the `backchannel` binary uses.
//! - [`memory::MemoryClient`] is an in-process loopback client with a FIFO
//!   inbox, handy for demos and for exercising the gateway in tests.

pub mod command;
pub mod memory;

/// Failure reported by a wrapped client.
///
/// The gateway does not distinguish client error kinds; whatever text the
/// client produces travels back to the front end inside the generic
/// encrypted error body.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ClientError(String);

impl ClientError {
    /// Creates a client error carrying the given description.
    pub fn new(message: impl Into<String>) -> Self {
        ClientError(message.into())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError(e.to_string())
    }
}

/// The external messaging client the gateway proxies for.
///
/// Implementations expose the client's canonical identity plus its two
/// message operations. `pull` and `push` are ordinary synchronous calls;
/// any blocking or timeout behavior is inherited from the client itself.
///
/// # Examples
///
/// ```
/// use backchannel::client::{ClientError, MessagingClient};
///
/// struct Silent;
///
/// impl MessagingClient for Silent {
///     fn user(&self) -> String {
///         "nobody".to_string()
///     }
///     fn pull(&mut self) -> Result<Vec<Vec<u8>>, ClientError> {
///         Ok(vec![])
///     }
///     fn push(&mut self, _receiver: &str, _message: &[u8]) -> Result<(), ClientError> {
///         Err(ClientError::new("this client cannot send"))
///     }
/// }
///
/// let mut client = Silent;
/// assert_eq!(client.user(), "nobody");
/// assert!(client.pull().unwrap().is_empty());
/// assert!(client.push("bob", b"hi").is_err());
/// ```
pub trait MessagingClient: Send {
    /// The client's canonical identity string.
    fn user(&self) -> String;

    /// Returns the queued messages, oldest first, as raw byte blobs.
    fn pull(&mut self) -> Result<Vec<Vec<u8>>, ClientError>;

    /// Sends raw message bytes to the named receiver.
    fn push(&mut self, receiver: &str, message: &[u8]) -> Result<(), ClientError>;
}
