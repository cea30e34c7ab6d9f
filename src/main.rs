use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medical_bot::commands::{chat, load_config, serve, show_status, store_index};
use medical_bot::config::{
    PineconeCredentials, load_dotenv, run_interactive_config, show_config,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medical-bot")]
#[command(about = "A retrieval-augmented medical question answering chatbot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Ollama connection, models and index name
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed every PDF in the data directory into the vector index
    StoreIndex {
        /// Directory containing the PDF files (defaults to the configured one)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Serve the web chat over HTTP
    Serve {
        /// Address to bind (defaults to the configured one)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (defaults to the configured one)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat in the terminal
    Chat,
    /// Show the vector index and how many vectors it holds
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    load_dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::StoreIndex { data_dir } => {
            let config = load_config()?;
            let credentials = PineconeCredentials::from_env()?;
            let data_dir = data_dir.unwrap_or_else(|| config.ingestion.data_dir.clone());
            tokio::task::spawn_blocking(move || store_index(&config, &credentials, &data_dir))
                .await
                .context("ingestion panicked")??;
        }
        Commands::Serve { host, port } => {
            let config = load_config()?;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve(config, &host, port).await?;
        }
        Commands::Chat => {
            let config = load_config()?;
            tokio::task::spawn_blocking(move || chat(config))
                .await
                .context("chat session panicked")??;
        }
        Commands::Status => {
            let config = load_config()?;
            let credentials = PineconeCredentials::from_env()?;
            tokio::task::spawn_blocking(move || show_status(&config, &credentials))
                .await
                .context("status check panicked")??;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn store_index_defaults_to_configured_dir() {
        let cli = Cli::try_parse_from(["medical-bot", "store-index"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(
                parsed.command,
                Commands::StoreIndex { data_dir: None }
            ));
        }
    }

    #[test]
    fn store_index_with_data_dir() {
        let cli = Cli::try_parse_from(["medical-bot", "store-index", "--data-dir", "pdfs"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::StoreIndex { data_dir } = parsed.command {
                assert_eq!(data_dir, Some(PathBuf::from("pdfs")));
            }
        }
    }

    #[test]
    fn serve_with_host_and_port() {
        let cli = Cli::try_parse_from([
            "medical-bot",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve { host, port } = parsed.command {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(9000));
            }
        }
    }

    #[test]
    fn invalid_port_is_rejected() {
        let cli = Cli::try_parse_from(["medical-bot", "serve", "--port", "99999"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn chat_and_status_commands() {
        let chat = Cli::try_parse_from(["medical-bot", "chat"]).expect("chat parses");
        assert!(matches!(chat.command, Commands::Chat));

        let status = Cli::try_parse_from(["medical-bot", "status"]).expect("status parses");
        assert!(matches!(status.command, Commands::Status));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["medical-bot", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["medical-bot", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["medical-bot", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
