//! A small demo client: connects, logs every event, and pings the server on a timer until
//! interrupted.

use std::path::PathBuf;
use std::time::Duration;

use ami_client::callback::Immediate;
use ami_client::{Client, ClientConfig, Packet, Repeat};
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(version, author, about = "Pings an Asterisk Manager Interface and logs every event")]
struct Opts {
    /// Path to a TOML config file; CLI flags below override whatever it sets.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    #[arg(short, long)]
    username: Option<String>,

    #[arg(short, long)]
    secret: Option<String>,

    /// How often to submit the periodic `Ping` action, e.g. "10s".
    #[arg(long, value_parser = humantime::parse_duration)]
    ping_every: Option<Duration>,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,
}

#[actix_rt::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => ClientConfig::from_toml_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = opts.host {
        config.host = host;
    }
    if let Some(port) = opts.port {
        config.port = port;
    }
    if let Some(username) = opts.username {
        config.username = username;
    }
    if let Some(secret) = opts.secret {
        config.secret = secret;
    }
    match opts.verbosity {
        0 => {}
        1 => config.log = "debug".to_string(),
        _ => config.log = "trace".to_string(),
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log))
        .init();

    let client = Client::with_banner_callback(config, |banner| {
        info!(%banner, "connected");
    });

    client.register_event(&["*"], Immediate::new(|packet: Packet| {
        info!(?packet, "event");
    }));

    client.create_action(
        Packet::action("Ping"),
        None::<Immediate<fn(Packet)>>,
        Repeat::Periodic(opts.ping_every.unwrap_or(Duration::from_secs(10))),
    );

    client.connect().await?;

    Ok(())
}
