//! CLI entry point for gemchat

mod chat;

use anyhow::{Context, Result};
use clap::Parser;
use gemchat_core::config::validate::validate_config;
use gemchat_core::config::ConfigLoader;
use gemchat_core::logging::init_logging;
use gemchat_core::session::{ChatHistory, SessionManager};
use gemchat_core::utils::expand_tilde;
use gemchat_providers::{ChatSession, GeminiClient};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use chat::{load_or_empty, restore_history, run_chat, ChatOptions, Console};

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(about = "Chat with Gemini from the terminal and keep sessions on disk")]
#[command(version)]
struct Cli {
    /// Configuration directory
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Directory where session files are listed and saved
    #[arg(short, long)]
    sessions_dir: Option<PathBuf>,

    /// Model to use instead of the configured one
    #[arg(short, long)]
    model: Option<String>,

    /// Restore this session file without asking (relative to the current directory)
    #[arg(short, long, conflicts_with = "new")]
    load: Option<PathBuf>,

    /// Start with an empty history without asking
    #[arg(short, long)]
    new: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A missing .env is fine; the variables may come from the shell.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = &cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    let mut config = config_loader.load_unvalidated()?;
    if let Some(model) = cli.model.clone() {
        config.provider.model = model;
    }
    validate_config(&config)?;

    let _log_guard = init_logging(&config.logging);

    let sessions_dir = cli
        .sessions_dir
        .clone()
        .unwrap_or_else(|| expand_tilde(&config.chat.sessions_dir));
    let manager = SessionManager::from_config(&sessions_dir, &config.chat);
    let provider = Arc::new(
        GeminiClient::from_config(&config.provider).context("failed to set up Gemini client")?,
    );
    info!(
        "Starting chat with {} (sessions in {})",
        config.provider.model,
        sessions_dir.display()
    );

    let stdin = io::stdin();
    let mut console = Console::new(stdin.lock(), io::stdout());

    let history = if cli.new {
        ChatHistory::new()
    } else if let Some(file) = &cli.load {
        let file = load_path(file).context("failed to resolve --load path")?;
        load_or_empty(&mut console, &manager, file)?
    } else {
        match restore_history(&mut console, &manager)? {
            Some(history) => history,
            None => return Ok(()),
        }
    };

    let mut session = ChatSession::new(provider, history);
    console.separator()?;

    let options = ChatOptions {
        show_progress: io::stderr().is_terminal(),
    };
    run_chat(&mut console, &mut session, &manager, options).await?;

    Ok(())
}

/// Anchor a `--load` path at the current directory, not the sessions directory
fn load_path(file: &Path) -> io::Result<PathBuf> {
    if file.is_absolute() {
        Ok(file.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_load_conflicts_with_new() {
        let err = Cli::try_parse_from(["gemchat", "--load", "a.cht", "--new"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_load_path_is_relative_to_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            load_path(Path::new("b/x.cht")).unwrap(),
            cwd.join("b").join("x.cht")
        );

        let absolute = cwd.join("saved.cht");
        assert_eq!(load_path(&absolute).unwrap(), absolute);
    }

    #[test]
    fn test_parse_overrides() {
        let cli = Cli::try_parse_from([
            "gemchat",
            "--sessions-dir",
            "/tmp/chats",
            "--model",
            "gemini-2.0-flash",
        ])
        .unwrap();
        assert_eq!(cli.sessions_dir, Some(PathBuf::from("/tmp/chats")));
        assert_eq!(cli.model.as_deref(), Some("gemini-2.0-flash"));
        assert!(!cli.new);
    }
}
