mod api;
mod live;
mod router;
mod startup;
mod state;

use clap::{Parser, Subcommand};
use tracing::info;

use loader_core::Config;
use loader_credential::EncryptionKey;

// ── CLI ─────────────────────────────────────────────────────────────

/// Resumable batch imports of uploaded JSON and CSV data into Redis.
#[derive(Parser, Debug)]
#[command(name = "redis-loader", version, about)]
struct Cli {
    /// Config profile; env keys are looked up as `{PROFILE}_{KEY}` first.
    #[arg(long, env = "LOADER_PROFILE", default_value = "", global = true)]
    profile: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP and WebSocket server (default).
    Serve {
        /// Override the configured bind host.
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Encrypt a connection URL with the configured key and print the
    /// `redisConUrlEncrypted` payload.
    EncryptUrl { url: String },
    /// Print a fresh random encryption key (64 hex characters).
    GenerateKey,
}

fn load_config(profile: &str) -> anyhow::Result<Config> {
    let config = Config::for_profile(profile);
    config.validate()?;
    Ok(config)
}

async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.log_summary();

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = startup::build_app_state(config).await?;
    let app = router::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn encrypt_url(config: &Config, url: &str) -> anyhow::Result<()> {
    let Some(hex_key) = config.redis.encryption_key.as_deref() else {
        anyhow::bail!("REDIS_CON_URL_ENCRYPTION_KEY is not set");
    };
    let key = EncryptionKey::from_hex(hex_key)?;
    let encrypted = loader_credential::encrypt(&key, url)?;
    println!("{}", serde_json::to_string_pretty(&encrypted)?);
    Ok(())
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    loader_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.profile)?;

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => serve(config, host, port).await?,
        Command::EncryptUrl { url } => encrypt_url(&config, &url)?,
        Command::GenerateKey => println!("{}", EncryptionKey::generate().to_hex()),
    }

    Ok(())
}
