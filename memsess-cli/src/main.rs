use clap::{Args, Parser, Subcommand};
use memsess_core::SessionManagerConfig;
use memsess_http::{start_server, ServerConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "memsess", version, about = "In-memory cookie session server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP session server
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:8080")]
    address: String,

    /// Name of the session cookie
    #[arg(long, default_value = "memsess_id")]
    cookie_name: String,

    /// Seconds a session may stay idle before it is swept
    #[arg(long, default_value_t = 1800, value_parser = clap::value_parser!(u64).range(1..))]
    ttl_secs: u64,

    /// Seconds between two sweeps of expired sessions
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,
}

impl ServeArgs {
    fn into_config(self) -> ServerConfig {
        ServerConfig::new(self.address).with_session_manager(
            SessionManagerConfig::default()
                .with_cookie_name(self.cookie_name)
                .with_ttl(Duration::from_secs(self.ttl_secs))
                .with_sweep_interval(Duration::from_secs(self.sweep_interval_secs)),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => {
            tracing::debug!("serve args: {:?}", args);
            start_server(args.into_config())
                .await
                .map_err(|e| anyhow::anyhow!("server error: {}", e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "memsess",
            "serve",
            "--address",
            "0.0.0.0:9000",
            "--cookie-name",
            "sid",
            "--ttl-secs",
            "90",
            "--sweep-interval-secs",
            "3",
        ]);
        let Commands::Serve(args) = cli.command;
        let config = args.into_config();
        assert_eq!(config.address, "0.0.0.0:9000");
        assert_eq!(config.session_manager.cookie_name, "sid");
        assert_eq!(config.session_manager.ttl, Duration::from_secs(90));
        assert_eq!(config.session_manager.sweep_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["memsess", "serve"]);
        let Commands::Serve(args) = cli.command;
        let config = args.into_config();
        assert_eq!(config.session_manager.ttl, Duration::from_secs(1800));
        assert_eq!(config.session_manager.cookie_name, "memsess_id");
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(Cli::try_parse_from(["memsess", "serve", "--ttl-secs", "0"]).is_err());
    }
}
