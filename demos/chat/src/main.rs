//! PeerLink chat shell
//!
//! Asks for a role, then runs one encrypted chat session on the terminal.
//!
//! Environment variables:
//! - PEERLINK_LOG: log filter for stderr (default `warn`)
//! - PEERLINK_CLIENT_ID: pin the client id instead of the device fingerprint
//! - PEERLINK_*: session settings, see `SessionConfig::apply_env`

use std::io::{self, BufRead, BufReader, Stdin, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::{EnvFilter, prelude::*};

use peerlink::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "peerlink", about = "Direct encrypted P2P chat over UDP")]
struct Cli {
    /// JSON session config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Add a client id to the allow list and save it
    #[arg(long, value_name = "CLIENT_ID")]
    allow: Vec<String>,

    /// Suppress replies to unsolicited traffic
    #[arg(long)]
    stealth: bool,

    /// Client id to present as guest
    #[arg(long, env = "PEERLINK_CLIENT_ID", value_name = "CLIENT_ID")]
    client_id: Option<String>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("allow list: {0}")]
    AllowList(#[from] StoreError),

    #[error("invalid client id {0:?}")]
    ClientId(String),

    #[error("input closed")]
    InputClosed,

    #[error(transparent)]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("PEERLINK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    }
    .apply_env()?;
    if cli.stealth {
        config.stealth = true;
    }

    if !cli.allow.is_empty() {
        let mut list = AllowList::load(&config.allow_list_path)?;
        for id in &cli.allow {
            let id = ClientId::new(id).map_err(|_| CliError::ClientId(id.clone()))?;
            if list.insert(id.clone()) {
                println!("Allowed client id: {id}");
            }
        }
        list.save(&config.allow_list_path)?;
        info!(path = %config.allow_list_path.display(), entries = list.len(), "allow list saved");
    }

    let mut env = SessionEnv::new(config);
    if let Some(id) = &cli.client_id {
        let id = ClientId::new(id).map_err(|_| CliError::ClientId(id.clone()))?;
        env = env.with_client_ids(StaticClientId(id));
    }

    let mut input = BufReader::new(io::stdin());
    let selection = loop {
        match prompt(&mut input, "Host or Guest? [h/g]: ")?.to_ascii_lowercase().as_str() {
            "h" | "host" => break RoleSelection::host(),
            "g" | "guest" => {
                let code = prompt(&mut input, "Session code: ")?;
                let ip = prompt(&mut input, "Host public IP: ")?;
                let port = prompt(&mut input, "Host port: ")?;
                break RoleSelection::guest(&code, &ip, &port)?;
            }
            _ => println!("Please answer h or g."),
        }
    };

    println!("Type a message and press Enter. /exit to quit.");
    let report = run_session(selection, env, input, io::stdout())?;
    info!(?report, "session finished");
    Ok(())
}

fn prompt(input: &mut BufReader<Stdin>, question: &str) -> Result<String, CliError> {
    print!("{question}");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(CliError::InputClosed);
    }
    Ok(line.trim().to_string())
}
