use clap::{CommandFactory, Parser};
use std::sync::Arc;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskis_cli::cli::{Cli, Command, SessionCommand, parse_config_overrides, parse_session_command};
use taskis_core::config::{Config, ConfigOverrides, load_config_with_fallback, merge_overrides};
use taskis_core::model::{ChatMessage, Role, Task, TaskFilter};
use taskis_core::remote::HttpBackend;
use taskis_core::{AppError, ChatRelay, RelayMode, Submission, TaskList};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: &'static str,
}

fn status_label(task: &Task) -> &'static str {
    if task.completed { "completed" } else { "pending" }
}

fn print_tasks_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet");
        return;
    }

    let rows = tasks.iter().map(|task| TaskRow {
        id: task.id,
        title: task.title.clone(),
        status: status_label(task),
    });
    let mut table = Table::new(rows);
    table.with(Style::psql());
    println!("{table}");
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_messages(messages: &[ChatMessage], json: bool) -> Result<(), AppError> {
    if json {
        return print_json(messages);
    }

    for message in messages {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("{speaker}: {}", message.content);
    }
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
    println!("Session commands: retry, reset, transcript, mode task|chat, exit");
}

fn resolve_config(cli: &Cli) -> Result<Config, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        eprintln!("WARN: ignoring config file: {err}");
    }

    let mut overrides = parse_config_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
    if cli.mode.is_some() {
        overrides.mode = cli.mode;
    }
    let mut config = merge_overrides(&loaded.config, &overrides);
    if let Some(base_url) = cli.base_url.as_ref() {
        config = merge_overrides(
            &config,
            &ConfigOverrides {
                base_url: Some(base_url.clone()),
                ..ConfigOverrides::default()
            },
        );
    }
    Ok(config)
}

struct Session {
    tasks: TaskList,
    relay: ChatRelay,
}

impl Session {
    fn open(config: &Config) -> Result<Self, AppError> {
        let backend = Arc::new(HttpBackend::from_config(config)?);
        tracing::info!(base_url = backend.base_url(), "using task store");
        let tasks = TaskList::new(backend.clone());
        let relay = ChatRelay::new(tasks.clone(), backend);
        Ok(Self { tasks, relay })
    }

    async fn run_command(&self, command: Command, json: bool) -> Result<(), AppError> {
        match command {
            Command::List { filter } => {
                let tasks = self.tasks.filtered(TaskFilter::from(filter));
                if json {
                    print_json(&tasks)?;
                } else {
                    print_tasks_table(&tasks);
                }
            }
            Command::Add { title } => {
                let title = match title {
                    Some(value) if !value.trim().is_empty() => value,
                    _ => return Err(AppError::invalid_input("title is required")),
                };

                let task = self
                    .tasks
                    .add(&title)
                    .await?
                    .ok_or_else(|| AppError::invalid_input("title is required"))?;
                if json {
                    print_json(&task)?;
                } else {
                    println!("Added task: {} ({})", task.title, task.id);
                }
            }
            Command::Bulk { titles } => {
                let created = self.tasks.add_bulk(titles.as_slice()).await?;
                if json {
                    print_json(&created)?;
                } else {
                    println!("Added {} tasks", created.len());
                    for task in &created {
                        println!("  {} ({})", task.title, task.id);
                    }
                }
            }
            Command::Toggle { id } => {
                let task = self
                    .tasks
                    .find(id)
                    .ok_or_else(|| AppError::invalid_input("task not found"))?;
                let updated = self.tasks.toggle(&task).await?;
                if json {
                    print_json(&updated)?;
                } else if updated.completed {
                    println!("Completed task: {} ({})", updated.title, updated.id);
                } else {
                    println!("Reopened task: {} ({})", updated.title, updated.id);
                }
            }
            Command::Delete { id } => {
                self.tasks.remove(id).await?;
                if json {
                    print_json(&serde_json::json!({ "deleted": id }))?;
                } else {
                    println!("Deleted task: {id}");
                }
            }
            Command::Progress => {
                let progress = self.tasks.progress();
                if json {
                    print_json(&progress)?;
                } else {
                    println!(
                        "{} of {} tasks complete ({}%)",
                        progress.completed, progress.total, progress.percentage
                    );
                }
            }
            Command::Chat { message, converse } => {
                let message = match message {
                    Some(value) if !value.trim().is_empty() => value,
                    _ => return Err(AppError::invalid_input("message is required")),
                };

                if converse {
                    self.relay.set_mode(RelayMode::Conversation);
                }
                let before = self.relay.messages().len();
                let outcome = self.relay.submit(&message).await;
                let messages = self.relay.messages();
                print_messages(&messages[before.min(messages.len())..], json)?;
                if let Submission::Failed(err) = outcome {
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    async fn run_session_command(&self, command: SessionCommand) -> Result<bool, AppError> {
        match command {
            SessionCommand::Help => print_help(),
            SessionCommand::Exit => return Ok(false),
            SessionCommand::Retry => {
                let tasks = self.tasks.retry().await?;
                println!("Loaded {} tasks", tasks.len());
            }
            SessionCommand::Reset => {
                self.relay.reset();
                print_messages(&self.relay.messages(), false)?;
            }
            SessionCommand::Transcript => print_messages(&self.relay.messages(), false)?,
            SessionCommand::Mode(mode) => {
                self.relay.set_mode(mode);
                match mode {
                    RelayMode::TaskTitle => println!("Chat messages now create tasks"),
                    RelayMode::Conversation => println!("Chat messages now go to the assistant"),
                }
            }
        }

        Ok(true)
    }
}

async fn run_interactive(session: Session) -> Result<(), AppError> {
    if let Err(err) = session.tasks.fetch_all().await {
        eprintln!("ERROR: {}", err);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(input) = lines
        .next_line()
        .await
        .map_err(|err| AppError::io(err.to_string()))?
    {
        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(parsed) = parse_session_command(line) {
            match parsed {
                Ok(command) => match session.run_session_command(command).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => eprintln!("ERROR: {}", err),
                },
                Err(message) => eprintln!("ERROR: {}", AppError::invalid_input(message)),
            }
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskis".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        let Some(command) = cli.command else {
            continue;
        };

        if let Err(err) = session.run_command(command, cli.json).await {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli)?;
    let session = Session::open(&config)?;

    match cli.command {
        None => run_interactive(session).await,
        Some(command) => {
            session.tasks.fetch_all().await?;
            session.run_command(command, cli.json).await
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            // --help and --version
            let _ = err.print();
            return;
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli).await {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
