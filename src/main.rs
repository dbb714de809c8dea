use clap::{Parser, Subcommand};
use figment::providers::Serialized;
use sonargate::{app_state, router, telemetry};
use sonargate_config::Config;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::net::TcpListener;
use tokio::signal;

/// Upload a zipped repository, get a SonarCloud scan back.
#[derive(Debug, Parser)]
#[command(name = "sonargate", version, about)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the defaults and
    /// the user configuration directory.
    #[arg(long, global = true, env = "SONARGATE_CONFIG")]
    config: Option<PathBuf>,
    /// Address to listen on, overriding `server.bind`.
    #[arg(long, global = true)]
    bind: Option<SocketAddr>,
    /// Tracing filter directive, overriding `logging.level`.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default).
    Serve,
    /// Load and validate configuration, print it as JSON, then exit.
    CheckConfig,
}

impl Cli {
    /// Flags are the last layer, above environment variables.
    fn config(&self) -> sonargate_config::error::Result<Config> {
        let mut figment = Config::figment(self.config.as_deref())?;
        if let Some(bind) = self.bind {
            figment = figment.merge(Serialized::default("server.bind", bind));
        }
        if let Some(level) = &self.log_level {
            figment = figment.merge(Serialized::default("logging.level", level));
        }
        Config::from_figment(figment)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}\n{err:?}", *err);
            return ExitCode::FAILURE;
        },
    };
    match cli.command.unwrap_or(Command::Serve) {
        Command::CheckConfig => match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            },
            Err(e) => {
                eprintln!("Failed to render configuration: {e}");
                ExitCode::FAILURE
            },
        },
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> ExitCode {
    telemetry::init(&config.logging);
    let app = router(app_state(&config), config.server.max_upload_bytes);
    let listener = match TcpListener::bind(config.server.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(bind = %config.server.bind, error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        },
    };
    tracing::info!(bind = %config.server.bind, temp_dir = %config.workspace.base().display(), "Listening");
    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    tracing::info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Resolves on Ctrl+C or SIGTERM. In-flight analyses are allowed to finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_flags_override_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file("sonargate.toml", "[server]\nbind = \"127.0.0.1:7000\"\n\n[logging]\nlevel = \"warn\"\n")?;
            jail.set_env("SONARGATE_LOGGING__LEVEL", "error");
            let cli = Cli::try_parse_from([
                "sonargate",
                "--config",
                "sonargate.toml",
                "--bind",
                "127.0.0.1:9100",
                "--log-level",
                "sonargate=debug",
                "check-config",
            ])
            .unwrap();
            assert!(matches!(cli.command, Some(Command::CheckConfig)));
            let config = cli.config().unwrap();
            assert_eq!(config.server.bind, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
            assert_eq!(config.logging.level, "sonargate=debug");
            Ok(())
        });
    }

    #[test]
    fn test_without_flags_file_values_stand() {
        Jail::expect_with(|jail| {
            jail.create_file("sonargate.toml", "[server]\nbind = \"127.0.0.1:7000\"\n")?;
            let cli = Cli::try_parse_from(["sonargate", "--config", "sonargate.toml"]).unwrap();
            assert!(cli.command.is_none());
            let config = cli.config().unwrap();
            assert_eq!(config.server.bind, "127.0.0.1:7000".parse::<SocketAddr>().unwrap());
            assert_eq!(config.logging.level, "info");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_bind_flag_is_rejected() {
        assert!(Cli::try_parse_from(["sonargate", "--bind", "not-an-address"]).is_err());
    }
}
