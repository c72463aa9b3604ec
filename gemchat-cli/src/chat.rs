//! Interactive restore prompt and relay loop

use console::style;
use gemchat_core::session::{ChatHistory, SessionManager};
use gemchat_providers::ChatSession;
use indicatif::ProgressBar;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const EXIT_COMMAND: &str = "\\X";
pub const SAVE_COMMAND: &str = "\\S";
pub const EXPORT_COMMAND: &str = "\\T";

const SEPARATOR: &str = "--------";

/// What a line typed at the main prompt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Save,
    Export,
    Message(String),
}

/// Reserved tokens match exactly; everything else is relayed verbatim
pub fn parse_command(input: &str) -> Command {
    match input {
        EXIT_COMMAND => Command::Exit,
        SAVE_COMMAND => Command::Save,
        EXPORT_COMMAND => Command::Export,
        other => Command::Message(other.to_string()),
    }
}

/// Index typed at the restore prompt, if it is all digits and in range
pub fn parse_selection(input: &str, len: usize) -> Option<usize> {
    if input.is_empty() || !input.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    input.parse::<usize>().ok().filter(|index| *index < len)
}

/// Line-oriented terminal I/O
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `prompt` without a newline and read one line.
    ///
    /// Returns `None` once input is closed.
    pub fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    pub fn say(&mut self, line: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }

    pub fn separator(&mut self) -> io::Result<()> {
        writeln!(self.output, "{}", style(SEPARATOR).red())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Ask whether to restore an old chat and load the chosen snapshot.
///
/// Every failure short of closed input ends in an empty history. Returns
/// `None` when input closes before a decision.
pub fn restore_history<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    manager: &SessionManager,
) -> io::Result<Option<ChatHistory>> {
    loop {
        let Some(answer) = console.prompt("Do you want to load an old chat? (y/n) ")? else {
            return Ok(None);
        };
        match answer.as_str() {
            "y" => break,
            "n" => return Ok(Some(ChatHistory::new())),
            _ => continue,
        }
    }

    let sessions = match manager.list_sessions() {
        Ok(sessions) => sessions,
        Err(e) => {
            info!("Failed to list {}: {}", manager.sessions_dir().display(), e);
            console.say("Could not list chats in the directory.")?;
            return Ok(Some(ChatHistory::new()));
        }
    };
    if sessions.is_empty() {
        console.say("No chats available in the directory.")?;
        return Ok(Some(ChatHistory::new()));
    }

    let selected = loop {
        console.say("Available chats:")?;
        for (i, name) in sessions.iter().enumerate() {
            console.say(format!("{}: {}", i, name))?;
        }
        let Some(number) = console.prompt("Which chat file (input the number)? ")? else {
            return Ok(None);
        };
        if let Some(index) = parse_selection(&number, sessions.len()) {
            break &sessions[index];
        }
    };

    Ok(Some(load_or_empty(console, manager, selected)?))
}

/// Load a snapshot, reporting failure and falling back to an empty history
pub fn load_or_empty<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    manager: &SessionManager,
    file: impl AsRef<Path>,
) -> io::Result<ChatHistory> {
    match manager.load(file) {
        Ok(history) => Ok(history),
        Err(e) => {
            info!("{}", e);
            console.say("Could not load file.")?;
            Ok(ChatHistory::new())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Idle,
    AwaitingResponse,
}

/// Relay loop options
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    /// Draw a spinner on stderr while a request is in flight
    pub show_progress: bool,
}

/// Totals reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSummary {
    pub relayed: usize,
    pub failed: usize,
}

/// Read commands until exit or closed input, relaying everything that is
/// not a reserved token.
pub async fn run_chat<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    session: &mut ChatSession,
    manager: &SessionManager,
    options: ChatOptions,
) -> io::Result<ChatSummary> {
    let mut summary = ChatSummary::default();
    let mut state = RelayState::Idle;

    loop {
        debug_assert_eq!(state, RelayState::Idle);
        console.say(format!(
            "User: ({} exit, {} save chat history, {} dump history as JSON)",
            EXIT_COMMAND, SAVE_COMMAND, EXPORT_COMMAND
        ))?;
        let Some(request) = console.prompt("> ")? else {
            debug!("Input closed, leaving chat");
            break;
        };

        match parse_command(&request) {
            Command::Exit => {
                console.say("Exiting")?;
                break;
            }
            Command::Save => {
                let Some(name) = console.prompt("Name of the chat file: ")? else {
                    break;
                };
                match manager.save_named(name.trim(), session.history()) {
                    Ok(path) => console.say(format!("Chat saved to {}", path.display()))?,
                    Err(e) => {
                        info!("Save failed: {}", e);
                        console.say("Could not save chat.")?;
                    }
                }
            }
            Command::Export => {
                let Some(name) = console.prompt("Name of the json file: ")? else {
                    break;
                };
                match manager.export_named(name.trim(), session.history()) {
                    Ok(path) => console.say(format!("History written to {}", path.display()))?,
                    Err(e) => {
                        info!("Export failed: {}", e);
                        console.say("Could not save chat.")?;
                    }
                }
            }
            Command::Message(text) => {
                state = RelayState::AwaitingResponse;
                debug!(?state, model = %session.model(), "Request in flight");
                let spinner = options.show_progress.then(|| {
                    let bar = ProgressBar::new_spinner();
                    bar.set_message(format!("Waiting for {}...", session.model()));
                    bar.enable_steady_tick(Duration::from_millis(100));
                    bar
                });

                let result = session.send_message(&text).await;

                if let Some(bar) = spinner {
                    bar.finish_and_clear();
                }
                state = RelayState::Idle;
                debug!(?state, ok = result.is_ok(), "Request finished");

                match result {
                    Ok(reply) => {
                        summary.relayed += 1;
                        console.separator()?;
                        console.say("Gemini:")?;
                        console.say(reply)?;
                        console.separator()?;
                    }
                    Err(e) => {
                        summary.failed += 1;
                        info!("Relay failed: {}", e);
                        console.say(format!("Could not get a response: {}", e))?;
                        if e.is_auth() {
                            console.say("Check that GEMINI_API_KEY holds a valid key.")?;
                        }
                    }
                }
            }
        }
    }

    info!(
        "Chat ended after {} relayed message(s), {} failure(s)",
        summary.relayed, summary.failed
    );
    Ok(summary)
}
