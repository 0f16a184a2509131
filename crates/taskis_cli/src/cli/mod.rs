use clap::{Parser, Subcommand, ValueEnum};
use taskis_core::RelayMode;
use taskis_core::config::{BuildMode, ConfigOverrides};
use taskis_core::model::TaskFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Task store base URL (wins over config and --mode)
    #[arg(long, env = "TASKIS_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Pick the default endpoint: production or local
    #[arg(long, value_parser = parse_mode, global = true)]
    pub mode: Option<BuildMode>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List tasks
    ///
    /// Example: taskis list --filter active
    List {
        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
    },
    /// Add a new task
    ///
    /// Example: taskis add "Buy milk"
    Add { title: Option<String> },
    /// Add several tasks in one request
    ///
    /// Example: taskis bulk "Buy milk" "Walk the dog"
    Bulk { titles: Vec<String> },
    /// Flip a task between completed and pending
    ///
    /// Example: taskis toggle 1718000000000
    Toggle { id: i64 },
    /// Delete a task
    ///
    /// Example: taskis delete 1718000000000
    Delete { id: i64 },
    /// Show how many tasks are complete
    Progress,
    /// Send a message to the assistant
    ///
    /// Example: taskis chat "Buy milk"
    /// Example: taskis chat --converse "What should I do first?"
    Chat {
        message: Option<String>,
        /// Talk to the chat endpoint instead of creating a task
        #[arg(long)]
        converse: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArg {
    All,
    Active,
    Completed,
}

impl From<FilterArg> for TaskFilter {
    fn from(value: FilterArg) -> Self {
        match value {
            FilterArg::All => TaskFilter::All,
            FilterArg::Active => TaskFilter::Active,
            FilterArg::Completed => TaskFilter::Completed,
        }
    }
}

fn parse_mode(raw: &str) -> Result<BuildMode, String> {
    BuildMode::parse(raw).ok_or_else(|| format!("unknown mode '{raw}' (expected production or local)"))
}

/// Commands only meaningful inside an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Help,
    Exit,
    Retry,
    Reset,
    Transcript,
    Mode(RelayMode),
}

pub fn parse_session_command(line: &str) -> Option<Result<SessionCommand, String>> {
    let mut words = line.split_whitespace();
    let head = words.next()?.to_ascii_lowercase();
    let command = match head.as_str() {
        "help" | "?" => SessionCommand::Help,
        "exit" | "quit" => SessionCommand::Exit,
        "retry" => SessionCommand::Retry,
        "reset" => SessionCommand::Reset,
        "transcript" => SessionCommand::Transcript,
        "mode" => {
            let mode = match words.next().map(str::to_ascii_lowercase).as_deref() {
                Some("task") | Some("tasks") => RelayMode::TaskTitle,
                Some("chat") | Some("converse") => RelayMode::Conversation,
                Some(other) => return Some(Err(format!("unknown chat mode '{other}'"))),
                None => return Some(Err("mode requires 'task' or 'chat'".to_string())),
            };
            SessionCommand::Mode(mode)
        }
        _ => return None,
    };

    if words.next().is_some() && !matches!(command, SessionCommand::Mode(_)) {
        return Some(Err(format!("'{head}' takes no arguments")));
    }

    Some(Ok(command))
}

/// Parse raw `KEY=VALUE` strings into config overrides. Later values win.
pub fn parse_config_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        apply_config_override(&mut overrides, entry)?;
    }
    Ok(overrides)
}

fn apply_config_override(overrides: &mut ConfigOverrides, raw: &str) -> Result<(), String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    match field.as_str() {
        "mode" => {
            overrides.mode = Some(parse_mode(value)?);
        }
        "base_url" | "url" => {
            if value.is_empty() {
                return Err("base_url override cannot be empty".to_string());
            }
            overrides.base_url = Some(value.to_string());
        }
        "timeout" | "request_timeout_secs" => {
            let secs = value
                .parse::<u64>()
                .map_err(|_| format!("timeout must be a whole number of seconds, got '{value}'"))?;
            overrides.request_timeout_secs = Some(secs);
        }
        other => return Err(format!("unknown config field '{other}'")),
    }

    Ok(())
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
