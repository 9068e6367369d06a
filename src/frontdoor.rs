//! The HTTP front door.
//!
//! A small threaded HTTP server — no async runtime, just a listener thread
//! and one named thread per connection. The browser front end POSTs opaque
//! encrypted blobs to `/call` and fetches its static assets from `/app`;
//! everything else is a 404.
//!
//! The server binds to loopback and speaks plain HTTP by design:
//! confidentiality of the link is the session token's job, not TLS's.
//! Connections may be concurrent, but every gateway call goes through one
//! mutex, so calls execute strictly sequentially — the wrapped client's own
//! concurrency guarantees are unspecified and are never relied on.
//!
//! # Examples
//!
//! ```no_run
//! use backchannel::client::memory::MemoryClient;
//! use backchannel::frontdoor::Server;
//! use backchannel::gateway::Gateway;
//! use backchannel::token::SessionToken;
//!
//! let gateway = Gateway::new(
//!     SessionToken::generate(),
//!     Box::new(MemoryClient::new("alice")),
//! );
//! let server = Server::bind("127.0.0.1:62222", gateway, None).unwrap();
//! server.run().unwrap(); // serves until exit() is called
//! ```

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::gateway::{CallOutcome, Gateway};

/// How long to let the final response flush before `exit` kills the process.
const EXIT_GRACE: std::time::Duration = std::time::Duration::from_millis(50);

/// The HTTP front door for one gateway session.
///
/// Routes:
///
/// - `POST /call` — the encrypted call boundary. Success is a 200 with the
///   encrypted result; any failure is a 500 whose body is the encrypted
///   error text. An `exit` call gets an empty 200 and then terminates the
///   process.
/// - `GET /` — redirects to `/app/`.
/// - `GET /app[/...]` — static front-end assets, `index.html` as the
///   directory index. 404 when no asset directory is configured.
pub struct Server {
    listener: TcpListener,
    gateway: Arc<Mutex<Gateway>>,
    assets: Option<PathBuf>,
}

impl Server {
    /// Binds the listener and takes ownership of the gateway session.
    ///
    /// `assets` is the directory served under `/app`, if any.
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        gateway: Gateway,
        assets: Option<PathBuf>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        logwise::info_sync!(
            "gateway listening on {addr}",
            addr = logwise::privacy::LogIt(&listener.local_addr()?)
        );
        Ok(Server {
            listener,
            gateway: Arc::new(Mutex::new(gateway)),
            assets,
        })
    }

    /// The bound address, useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process exits.
    ///
    /// Each connection gets its own named thread; a connection error kills
    /// only that thread.
    pub fn run(self) -> io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept()?;
            let gateway = self.gateway.clone();
            let assets = self.assets.clone();
            std::thread::Builder::new()
                .name(format!("backchannel-{addr}"))
                .spawn(move || {
                    let session = Session {
                        stream,
                        gateway,
                        assets,
                    };
                    if let Err(e) = session.run() {
                        logwise::warn_sync!(
                            "connection {addr} ended with error: {error}",
                            addr = logwise::privacy::LogIt(&addr),
                            error = logwise::privacy::LogIt(&e)
                        );
                    }
                })?;
        }
    }
}

/// One HTTP connection.
struct Session {
    stream: TcpStream,
    gateway: Arc<Mutex<Gateway>>,
    assets: Option<PathBuf>,
}

/// A parsed request head plus how many body bytes follow it.
struct RequestHead {
    method: String,
    target: String,
    content_length: usize,
    /// Offset of the first body byte in the connection buffer.
    body_start: usize,
}

impl Session {
    /// Reads and answers requests until the peer hangs up.
    fn run(mut self) -> io::Result<()> {
        let mut buf = Vec::new();
        let mut read_buffer = [0u8; 1024];
        loop {
            // answer every complete request already buffered
            while let Some(head) = parse_head(&buf)? {
                let total = head.body_start + head.content_length;
                if buf.len() < total {
                    break; // body still in flight
                }
                let body = buf[head.body_start..total].to_vec();
                self.handle(&head, &body)?;
                buf.drain(..total);
            }
            match self.stream.read(&mut read_buffer)? {
                0 => return Ok(()), // connection closed
                n => buf.extend_from_slice(&read_buffer[..n]),
            }
        }
    }

    fn handle(&mut self, head: &RequestHead, body: &[u8]) -> io::Result<()> {
        match (head.method.as_str(), head.target.as_str()) {
            ("POST", "/call") => self.handle_call(body),
            ("GET", "/") => self.respond(
                "302 Found",
                &[("Location", "/app/")],
                "text/plain; charset=utf-8",
                b"",
            ),
            ("GET", target) if target == "/app" || target.starts_with("/app/") => {
                self.handle_asset(target)
            }
            _ => self.respond_plain("404 Not Found", "404 Not Found"),
        }
    }

    /// The encrypted call boundary.
    fn handle_call(&mut self, body: &[u8]) -> io::Result<()> {
        let outcome = {
            // serialize all calls into the single gateway session
            let mut gateway = self.gateway.lock().unwrap_or_else(|e| e.into_inner());
            gateway.call(body)
        };
        match outcome {
            CallOutcome::Response(blob) => {
                self.respond("200 OK", &[], "text/plain; charset=utf-8", blob.as_bytes())
            }
            CallOutcome::Failure(blob) => {
                // encrypted error body plus out-of-band error status
                self.respond(
                    "500 Internal Server Error",
                    &[],
                    "text/plain; charset=utf-8",
                    blob.as_bytes(),
                )
            }
            CallOutcome::Exit => {
                self.respond("200 OK", &[], "text/plain; charset=utf-8", b"")?;
                logwise::info_sync!("exit requested, shutting down");
                std::thread::Builder::new()
                    .name("backchannel-exit".to_string())
                    .spawn(|| {
                        std::thread::sleep(EXIT_GRACE);
                        std::process::exit(0);
                    })?;
                Ok(())
            }
        }
    }

    /// Serves a static front-end asset from under the asset directory.
    fn handle_asset(&mut self, target: &str) -> io::Result<()> {
        let Some(assets) = self.assets.clone() else {
            return self.respond_plain("404 Not Found", "no front end is configured");
        };
        let relative = target
            .strip_prefix("/app")
            .unwrap_or("")
            .trim_start_matches('/');
        let Some(path) = resolve_asset(&assets, relative) else {
            return self.respond_plain("404 Not Found", "404 Not Found");
        };
        match std::fs::read(&path) {
            Ok(contents) => self.respond("200 OK", &[], content_type(&path), &contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.respond_plain("404 Not Found", "404 Not Found")
            }
            Err(e) => Err(e),
        }
    }

    fn respond_plain(&mut self, status: &str, body: &str) -> io::Result<()> {
        self.respond(status, &[], "text/plain; charset=utf-8", body.as_bytes())
    }

    fn respond(
        &mut self,
        status: &str,
        extra_headers: &[(&str, &str)],
        content_type: &str,
        body: &[u8],
    ) -> io::Result<()> {
        let mut head = format!("HTTP/1.1 {status}\r\n");
        for (name, value) in extra_headers {
            head.push_str(&format!("{name}: {value}\r\n"));
        }
        head.push_str(&format!(
            "Content-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
            body.len()
        ));
        self.stream.write_all(head.as_bytes())?;
        self.stream.write_all(body)?;
        self.stream.flush()
    }
}

/// Parses the request line and headers once they are fully buffered.
///
/// Returns `Ok(None)` while the head is still incomplete.
fn parse_head(buf: &[u8]) -> io::Result<Option<RequestHead>> {
    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let head_text = String::from_utf8_lossy(&buf[..end]);
    let mut lines = head_text.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty request"))?;
    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "malformed request line",
        ));
    };

    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidData, "bad content-length")
                })?;
            }
        }
    }

    Ok(Some(RequestHead {
        method: method.to_string(),
        // the fragment never reaches the server; strip any query instead
        target: target.split('?').next().unwrap_or(target).to_string(),
        content_length,
        body_start: end + 4,
    }))
}

/// Maps a request path to a file under the asset directory.
///
/// Rejects anything that would escape the directory and resolves the empty
/// path (and directories) to `index.html`.
fn resolve_asset(assets: &Path, relative: &str) -> Option<PathBuf> {
    let candidate = Path::new(relative);
    if candidate
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    let mut path = assets.join(candidate);
    if relative.is_empty() || path.is_dir() {
        path.push("index.html");
    }
    Some(path)
}

/// Content type by file extension; the front end is a handful of web assets.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
