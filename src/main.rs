//! The `backchannel` binary.
//!
//! Boots one gateway session: parse the port argument, generate the session
//! token, open a browser tab with the token in the URL fragment, wrap the
//! external messaging CLI, and serve until `exit` is called.
//!
//! Configuration is deliberately thin:
//!
//! - the single positional argument is the port (default 62222),
//! - `BACKCHANNEL_CLIENT` names the messaging CLI program (default `pssst`),
//! - `BACKCHANNEL_ASSETS` points at the front-end asset directory
//!   (default: an `app` directory next to the working directory, if present).

use std::path::PathBuf;

use backchannel::client::command::CommandClient;
use backchannel::frontdoor::Server;
use backchannel::gateway::Gateway;
use backchannel::token::SessionToken;

const DEFAULT_PORT: u16 = 62222;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("-h") | Some("--help") | Some("/?") => {
            usage();
            0
        }
        Some("-l") | Some("--license") => {
            println!("Licensed under either of MIT or Apache-2.0, at your option.");
            0
        }
        Some("-v") | Some("--version") => {
            println!("backchannel {}", env!("CARGO_PKG_VERSION"));
            0
        }
        None => serve(DEFAULT_PORT),
        Some(arg) => match arg.parse::<u16>() {
            Ok(port) => serve(port),
            Err(_) => {
                eprintln!("Unknown option or invalid port: {arg}");
                eprintln!("Please use --help for help on usage.");
                2 // incorrect usage
            }
        },
    }
}

fn usage() {
    println!("Usage: backchannel [option|port]");
    println!();
    println!("Options:");
    println!("  -h, --help      Shows the usage");
    println!("  -l, --license   Shows the license");
    println!("  -v, --version   Shows the version");
}

fn serve(port: u16) -> i32 {
    let program =
        std::env::var("BACKCHANNEL_CLIENT").unwrap_or_else(|_| "pssst".to_string());
    let client = match CommandClient::new(program) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Requires a working messaging CLI ({e})");
            eprintln!("Set BACKCHANNEL_CLIENT to the client program to wrap.");
            return 1;
        }
    };

    let token = SessionToken::generate();
    let url = format!("http://127.0.0.1:{port}/app#{}", token.to_hex());

    let gateway = Gateway::new(token, Box::new(client));
    let server = match Server::bind(("127.0.0.1", port), gateway, assets_dir()) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Error: cannot listen on port {port}: {e}");
            return 1;
        }
    };

    // The URL fragment is the shared secret; handing it to the browser is
    // what establishes the session.
    if let Err(e) = webbrowser::open(&url) {
        logwise::warn_sync!(
            "could not open a browser tab: {error}",
            error = logwise::privacy::LogIt(&e)
        );
        println!("Open this address manually: {url}");
    }

    match server.run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    }
}

fn assets_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("BACKCHANNEL_ASSETS") {
        return Some(PathBuf::from(dir));
    }
    let default = PathBuf::from("app");
    default.is_dir().then_some(default)
}
