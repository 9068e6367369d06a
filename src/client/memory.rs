//! An in-process loopback client.

use std::collections::VecDeque;

use super::{ClientError, MessagingClient};

/// A loopback [`MessagingClient`] with a FIFO inbox.
///
/// Every pushed message lands in the client's own inbox regardless of the
/// named receiver, and `pull` drains the inbox in order. Useful for trying
/// the front end without a real messaging CLI, and for exercising the
/// gateway in tests.
///
/// # Examples
///
/// ```
/// use backchannel::client::MessagingClient;
/// use backchannel::client::memory::MemoryClient;
///
/// let mut client = MemoryClient::new("alice");
/// assert_eq!(client.user(), "alice");
///
/// client.push("bob", b"hi").unwrap();
/// client.push("bob", b"there").unwrap();
/// let messages = client.pull().unwrap();
/// assert_eq!(messages, vec![b"hi".to_vec(), b"there".to_vec()]);
///
/// // pull drains
/// assert!(client.pull().unwrap().is_empty());
/// ```
pub struct MemoryClient {
    user: String,
    inbox: VecDeque<Vec<u8>>,
}

impl MemoryClient {
    /// Creates a loopback client with the given identity and an empty inbox.
    pub fn new(user: impl Into<String>) -> Self {
        MemoryClient {
            user: user.into(),
            inbox: VecDeque::new(),
        }
    }
}

impl MessagingClient for MemoryClient {
    fn user(&self) -> String {
        self.user.clone()
    }

    fn pull(&mut self) -> Result<Vec<Vec<u8>>, ClientError> {
        Ok(self.inbox.drain(..).collect())
    }

    fn push(&mut self, _receiver: &str, message: &[u8]) -> Result<(), ClientError> {
        self.inbox.push_back(message.to_vec());
        Ok(())
    }
}
