//! A subprocess adapter for an external messaging CLI.

use std::io::Write;
use std::process::{Command, Stdio};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;

use super::{ClientError, MessagingClient};

/// A [`MessagingClient`] that shells out to an external CLI.
///
/// The program is expected to expose three subcommands:
///
/// - `<program> name` — prints the canonical user name on stdout.
/// - `<program> pull` — prints queued messages on stdout, one per line,
///   each base64-encoded (messages are raw bytes, stdout is a text pipe).
/// - `<program> push <receiver>` — reads the raw message bytes from stdin.
///
/// A non-zero exit status turns into a [`ClientError`] carrying the
/// program's stderr. The identity is probed once at construction, which
/// doubles as a check that the program exists and works at all.
///
/// # Examples
///
/// ```no_run
/// use backchannel::client::MessagingClient;
/// use backchannel::client::command::CommandClient;
///
/// let mut client = CommandClient::new("pssst").unwrap();
/// client.push("bob", b"hi").unwrap();
/// ```
pub struct CommandClient {
    program: String,
    user: String,
}

impl CommandClient {
    /// Wraps the given CLI program, probing `<program> name` for identity.
    pub fn new(program: impl Into<String>) -> Result<Self, ClientError> {
        let program = program.into();
        let stdout = run(&program, &["name"], None)?;
        let user = stdout.trim().to_string();
        if user.is_empty() {
            return Err(ClientError::new(format!("{program} name printed no user")));
        }
        Ok(CommandClient { program, user })
    }
}

impl MessagingClient for CommandClient {
    fn user(&self) -> String {
        self.user.clone()
    }

    fn pull(&mut self) -> Result<Vec<Vec<u8>>, ClientError> {
        let stdout = run(&self.program, &["pull"], None)?;
        let mut messages = Vec::new();
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let data = BASE64_STANDARD
                .decode(line)
                .map_err(|e| ClientError::new(format!("undecodable message from {}: {e}", self.program)))?;
            messages.push(data);
        }
        Ok(messages)
    }

    fn push(&mut self, receiver: &str, message: &[u8]) -> Result<(), ClientError> {
        run(&self.program, &["push", receiver], Some(message))?;
        Ok(())
    }
}

/// Runs the program once, feeding `stdin` if given, and returns its stdout.
fn run(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<String, ClientError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| ClientError::new(format!("failed to start {program}: {e}")))?;

    if let Some(bytes) = stdin {
        // stdin was configured as piped above
        if let Some(mut pipe) = child.stdin.take() {
            pipe.write_all(bytes)?;
        }
        // pipe drops here, closing stdin so the child can finish
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::new(format!(
            "{program} {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|_| ClientError::new(format!("{program} printed non-text output")))
}
