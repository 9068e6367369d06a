/*!
A local encrypted-call gateway between a browser front end and a messaging CLI.

backchannel lets a browser-based UI drive a pre-existing encrypted-messaging
command-line client. The browser never talks to the messaging network itself;
it POSTs encrypted JSON remote calls to a loopback HTTP server, which
decrypts them, forwards them to the wrapped client, and encrypts the result
on the way back.

# Overview

One process hosts exactly one session, made of three small parts:

- a **session token** — 48 random bytes generated at startup, split into an
  AES-256 key and a CBC IV, and handed to the browser inside the URL
  fragment of the tab the process opens,
- a **gateway** — the single `call(encrypted bytes) -> encrypted bytes`
  boundary: decrypt, parse a `{method, params}` envelope, dispatch against
  a static allow-list (`exit`, `name`, `pull`, `push`), re-encrypt,
- a **front door** — a threaded HTTP server that receives the opaque blobs
  on `POST /call`, serves the front-end assets, and surfaces call failures
  as a 500 status with an encrypted error body.

There is no async runtime anywhere in this crate: the front door uses a
listener thread plus one thread per connection, and every gateway call is
serialized through a single mutex. The wrapped client is reached through
the [`client::MessagingClient`] trait; the binary wraps a real CLI as a
subprocess, and an in-memory loopback client ships for demos and tests.

# Quick start

```
use backchannel::client::memory::MemoryClient;
use backchannel::envelope;
use backchannel::gateway::{CallOutcome, Gateway};
use backchannel::token::SessionToken;

let token = SessionToken::generate();
let (key, iv) = (*token.key(), *token.iv());
let mut gateway = Gateway::new(token, Box::new(MemoryClient::new("alice")));

// What the front end does: encrypt an envelope, post it, decrypt the reply.
let request = envelope::encrypt(r#"{"method": "name", "params": null}"#, &key, &iv);
let CallOutcome::Response(blob) = gateway.call(request.as_bytes()) else {
    panic!("call failed");
};
assert_eq!(
    envelope::decrypt(blob.as_bytes(), &key, &iv).unwrap(),
    r#""alice""#
);
```

To serve it over HTTP:

```no_run
use backchannel::client::memory::MemoryClient;
use backchannel::frontdoor::Server;
use backchannel::gateway::Gateway;
use backchannel::token::SessionToken;

let token = SessionToken::generate();
println!("token fragment: #{}", token.to_hex());
let gateway = Gateway::new(token, Box::new(MemoryClient::new("alice")));
Server::bind("127.0.0.1:62222", gateway, None).unwrap().run().unwrap();
```

# Security model

This is a *local* proxy. There is no TLS and no per-message nonce; the
whole scheme rests on two things:

1. the server binds to loopback only, and
2. the token travels once, in a URL fragment, to a browser tab on the same
   machine. Fragments are never sent in HTTP requests.

The IV being fixed per session is a deliberate consequence of that model
(see [`envelope`]); tokens are never persisted, rotated, or reused across
processes.

# Why is the exposed surface an allow-list?

Resolving method names reflectively against whatever the gateway or the
wrapped client happens to have is an arbitrary-code-invocation hazard and
impossible to audit. The dispatcher in [`gateway`] instead matches against
the four exposed operations and nothing else; gateway-level names take
precedence over (and fully shadow) the wrapped client's own surface.

# Module organization

- [`token`] — session token generation and key/IV split
- [`envelope`] — AES-256-CBC + PKCS#7 + base64 cipher wrapper
- [`gateway`] — call envelope, dispatcher, and the call boundary
- [`client`] — the wrapped-client trait and its implementations
- [`frontdoor`] — the threaded HTTP server
*/

pub mod client;
pub mod envelope;
pub mod frontdoor;
pub mod gateway;
pub mod token;
