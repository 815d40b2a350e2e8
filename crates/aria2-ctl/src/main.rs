//! aria2-ctl - command-line control client for a running aria2 daemon.
//!
//! Connects over the daemon's JSON-RPC WebSocket, submits one call, prints
//! every inbound frame seen during a short wait window, then disconnects.

use anyhow::{bail, Context, Result};
use aria2_client::{
    Aria2Client, ClientOptions, ClientOptionsUpdate, DownloadOptions, Inbound, ProtocolEvent,
    SendOutcome,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "aria2-ctl")]
#[command(about = "Control a running aria2 daemon over JSON-RPC")]
struct Args {
    /// WebSocket endpoint of the daemon
    #[arg(long)]
    url: Option<String>,

    /// RPC secret configured with --rpc-secret
    #[arg(long)]
    token: Option<String>,

    /// How long to wait for the connection to open
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON settings file ({"url", "token", "timeout", "dir"})
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// How long to print inbound frames after submitting
    #[arg(long, default_value = "1000")]
    wait_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the daemon's version and enabled features
    Version,

    /// Queue a download from one or more mirrors of the same file
    AddUri {
        #[arg(required = true)]
        uris: Vec<String>,

        /// Directory to store the download in
        #[arg(long)]
        dir: Option<String>,

        /// File name of the download
        #[arg(long)]
        out: Option<String>,

        /// Position in the download queue
        #[arg(long)]
        position: Option<u32>,
    },
}

fn load_options(args: &Args) -> Result<ClientOptions> {
    let mut options = match &args.config {
        Some(path) => ClientOptions::from_json_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => ClientOptions::default(),
    };
    options.merge(ClientOptionsUpdate {
        url: args.url.clone(),
        token: args.token.clone(),
        timeout: args.timeout_ms.map(Duration::from_millis),
        dir: None,
    });
    Ok(options)
}

async fn wait_for_open(client: &mut Aria2Client) -> Result<()> {
    let deadline = client.timeout();
    let opened: std::result::Result<Result<()>, _> = timeout(deadline, async {
        loop {
            match client.next_event().await {
                ProtocolEvent::Opened => return Ok(()),
                ProtocolEvent::Closed(info) => {
                    bail!("Connection closed before opening (code {:?})", info.code)
                }
                _ => {}
            }
        }
    })
    .await;

    match opened {
        Ok(result) => result,
        Err(_) => bail!("Timed out after {:?} waiting for {}", deadline, client.url()),
    }
}

fn submit(client: &mut Aria2Client, command: Command, default_dir: Option<String>) -> SendOutcome {
    match command {
        Command::Version => client.get_version(),
        Command::AddUri {
            uris,
            dir,
            out,
            position,
        } => {
            let mut options = DownloadOptions::new();
            if let Some(dir) = dir.or(default_dir) {
                options = options.dir(dir);
            }
            if let Some(out) = out {
                options = options.out(out);
            }
            let options = (!options.is_empty()).then_some(options);
            client.add_uri(uris, options, position)
        }
    }
}

/// Handle events until `deadline`, stopping early on Ctrl+C or a close.
async fn drain_until(client: &mut Aria2Client, deadline: Instant) -> Result<()> {
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return Ok(()),
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                return Ok(());
            }
            event = client.next_event() => {
                if let ProtocolEvent::Closed(_) = event {
                    return Ok(());
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let options = load_options(&args)?;
    let default_dir = options.dir.clone();
    let wait = Duration::from_millis(args.wait_ms);

    let mut client = Aria2Client::new(options);
    client.on_message(|inbound| match inbound {
        Inbound::Response(response) => match serde_json::to_string_pretty(response) {
            Ok(text) => println!("{}", text),
            Err(e) => warn!("Failed to render response: {}", e),
        },
        Inbound::Notification(notification) => {
            let params = notification.params.clone().unwrap_or_default();
            println!("{} {}", notification.method, params)
        }
        Inbound::Malformed { text, reason } => warn!("Unreadable frame ({}): {}", reason, text),
    });

    client.connect(None, None, None)?;
    wait_for_open(&mut client).await?;

    match submit(&mut client, args.command, default_dir) {
        SendOutcome::Sent(id) => info!("Request {} sent", id),
        other => bail!("Request was not sent: {:?}", other),
    }

    drain_until(&mut client, Instant::now() + wait).await?;

    if client.disconnect().is_closing() {
        let deadline = Instant::now() + client.timeout();
        drain_until(&mut client, deadline).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aria2_client::testing::{MockConnector, MockRemote};
    use aria2_client::IdMode;
    use serde_json::{json, Value};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("aria2-ctl").chain(args.iter().copied())).unwrap()
    }

    fn settings_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// A client whose connection is already open on the in-memory connector.
    fn open_client() -> (Aria2Client, MockRemote) {
        let connector = MockConnector::new();
        let mut client = Aria2Client::with_connector(
            ClientOptions::default(),
            Arc::new(connector.clone()),
            IdMode::Integer,
        );
        client.connect(None, None, None).unwrap();
        let remote = connector.latest().unwrap();
        remote.open();
        client.process_pending();
        (client, remote)
    }

    fn sent_params(remote: &MockRemote) -> Value {
        remote.sent_json()[0]["params"].clone()
    }

    #[test]
    fn test_flags_override_settings_file() {
        let file = settings_file(
            r#"{"url":"ws://10.0.0.2:6800/jsonrpc","token":"from-file","timeout":2000,"dir":"/data"}"#,
        );
        let path = file.path().to_str().unwrap();
        let args = parse(&["--config", path, "--token", "from-flag", "version"]);

        let options = load_options(&args).unwrap();
        assert_eq!(options.url, "ws://10.0.0.2:6800/jsonrpc");
        assert_eq!(options.token.as_deref(), Some("from-flag"));
        assert_eq!(options.timeout, Duration::from_millis(2000));
        assert_eq!(options.dir.as_deref(), Some("/data"));
    }

    #[test]
    fn test_flags_without_settings_file() {
        let args = parse(&["--url", "ws://host:6800/jsonrpc", "--timeout-ms", "250", "version"]);

        let options = load_options(&args).unwrap();
        assert_eq!(options.url, "ws://host:6800/jsonrpc");
        assert_eq!(options.timeout, Duration::from_millis(250));
        assert!(options.token.is_none());
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let args = parse(&["--config", path.to_str().unwrap(), "version"]);

        assert!(load_options(&args).is_err());
    }

    #[test]
    fn test_add_uri_requires_a_uri() {
        assert!(Args::try_parse_from(["aria2-ctl", "add-uri"]).is_err());
    }

    #[test]
    fn test_version_sends_get_version() {
        let (mut client, remote) = open_client();

        let outcome = submit(&mut client, parse(&["version"]).command, None);

        assert!(outcome.is_sent());
        assert_eq!(remote.sent_json()[0]["method"], "aria2.getVersion");
    }

    #[test]
    fn test_add_uri_falls_back_to_settings_dir() {
        let (mut client, remote) = open_client();
        let command = parse(&["add-uri", "http://x/y"]).command;

        submit(&mut client, command, Some("/data".to_string()));

        assert_eq!(sent_params(&remote), json!([["http://x/y"], {"dir": "/data"}]));
    }

    #[test]
    fn test_add_uri_dir_flag_beats_settings_dir() {
        let (mut client, remote) = open_client();
        let command = parse(&["add-uri", "http://x/y", "--dir", "/tmp", "--out", "y.iso"]).command;

        submit(&mut client, command, Some("/data".to_string()));

        assert_eq!(
            sent_params(&remote),
            json!([["http://x/y"], {"dir": "/tmp", "out": "y.iso"}])
        );
    }

    #[test]
    fn test_add_uri_lone_position_sends_empty_options() {
        let (mut client, remote) = open_client();
        let command = parse(&["add-uri", "http://a/f", "http://b/f", "--position", "2"]).command;

        submit(&mut client, command, None);

        assert_eq!(
            sent_params(&remote),
            json!([["http://a/f", "http://b/f"], {}, 2])
        );
    }

    #[test]
    fn test_add_uri_without_options_or_position() {
        let (mut client, remote) = open_client();

        submit(&mut client, parse(&["add-uri", "http://x/y"]).command, None);

        assert_eq!(sent_params(&remote), json!([["http://x/y"]]));
    }
}
