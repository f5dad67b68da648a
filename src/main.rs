#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use signal_relay_server::config;
use signal_relay_server::logging;
use signal_relay_server::server::RelayServer;
use signal_relay_server::websocket;
use std::net::SocketAddr;

/// Signal Relay -- in-memory WebSocket signaling relay for WebRTC peers
#[derive(Parser, Debug)]
#[command(name = "signal-relay-server")]
#[command(about = "An in-memory WebSocket signaling relay for WebRTC peers")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load();

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // load() only warns on invalid settings; here they are fatal.
    let validation_result = config::validate_config(&cfg);

    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Max message size: {}", cfg.server.max_message_size);
                println!(
                    "  Max connections per IP: {}",
                    cfg.server.max_connections_per_ip
                );
                println!("  TURN mode: {:?}", cfg.turn.mode);
                println!(
                    "  Metrics auth required: {}",
                    cfg.security.require_metrics_auth
                );
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    validation_result?;

    let _log_guard = logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting signal relay server");

    let server = RelayServer::from_config(&cfg)?;
    websocket::run_server(addr, server, &cfg.security).await
}

#[cfg(test)]
mod cli_tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_flags() {
        let cli = Cli::try_parse_from(["signal-relay-server"]).unwrap();
        assert!(!cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_validate_config_short() {
        let cli = Cli::try_parse_from(["signal-relay-server", "-c"]).unwrap();
        assert!(cli.validate_config);
        assert!(!cli.print_config);
    }

    #[test]
    fn test_cli_print_config() {
        let cli = Cli::try_parse_from(["signal-relay-server", "--print-config"]).unwrap();
        assert!(!cli.validate_config);
        assert!(cli.print_config);
    }

    #[test]
    fn test_cli_validate_and_print_config_conflict() {
        let result =
            Cli::try_parse_from(["signal-relay-server", "--validate-config", "--print-config"]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot be used with"));
    }
}
