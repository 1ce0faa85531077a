//! nl2sql-chat: terminal frontend for the NL-to-SQL engine.
//! With a question argument it answers once and exits; otherwise it reads
//! commands and questions from stdin and streams answers to stdout.

use clap::Parser;
use nl2sql_client::config::{self, Config};
use nl2sql_client::session::CATALOG_UNAVAILABLE_MESSAGE;
use nl2sql_client::{Action, Notice, NoticeLevel, Session, Speaker};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /connect            probe the engine and load its databases
  /endpoint <url>     change the engine endpoint
  /databases          list database connections
  /use <alias>        select a database connection
  /status             show endpoint, connection and database
  /history            show the conversation so far
  /reset              clear the chat history
  /help               show this help
  /quit               exit
Anything else is sent to the engine as a question.";

const INTRODUCTION: &str = "\
Query your databases in natural language.
A sample question you can ask against the NOAA database is: What was the longest dry spell in Cary, NC in 2024?";

#[derive(Debug, Parser)]
#[command(name = "nl2sql-chat", version, about = "Chat with a natural-language-to-SQL engine")]
struct Cli {
    /// Config file (default: ~/.nl2sql-chat/config.yaml)
    #[arg(long, env = "NL2SQL_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Engine endpoint, overriding the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Database alias to query, overriding the default
    #[arg(long)]
    database: Option<String>,

    /// Ask a single question and exit
    question: Option<String>,
}

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Action(Action),
    Databases,
    Status,
    History,
    Help,
    Quit,
    Unknown(String),
    Blank,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Action(Action::Submit(line.to_string()));
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("connect", _) => Input::Action(Action::Connect),
        ("endpoint", url) if !url.is_empty() => Input::Action(Action::SetEndpoint(url.to_string())),
        ("use", alias) if !alias.is_empty() => {
            Input::Action(Action::SelectDatabase(alias.to_string()))
        }
        ("reset", _) => Input::Action(Action::Reset),
        ("databases", _) => Input::Databases,
        ("status", _) => Input::Status,
        ("history", _) => Input::History,
        ("help", _) => Input::Help,
        ("quit", _) | ("exit", _) => Input::Quit,
        _ => Input::Unknown(line.to_string()),
    }
}

fn load_config(cli: &Cli) -> Config {
    // An explicitly named file must load; the default one is optional.
    let result = match &cli.config {
        Some(path) => config::load(path),
        None => match config::default_config_path() {
            Some(path) => config::load_or_default(&path),
            None => Ok(Config::default()),
        },
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    })
}

fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Error => eprintln!("Error: {}", notice.message),
        NoticeLevel::Warning => println!("Warning: {}", notice.message),
        NoticeLevel::Success | NoticeLevel::Info => println!("{}", notice.message),
    }
}

fn print_chunk(chunk: &str) {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = write!(out, "{}", chunk);
    let _ = out.flush();
}

fn print_databases(session: &Session) {
    if session.catalog().is_empty() {
        println!("No database connections available.");
        return;
    }
    let selected = session.selected_database_id();
    for connection in session.catalog().iter() {
        let marker = if selected == Some(connection.id.as_str()) { "*" } else { " " };
        println!("{} {} ({})", marker, connection.alias, connection.id);
    }
}

fn print_status(session: &Session) {
    println!("Engine: {}", session.endpoint());
    if session.is_connected() {
        println!("Connected to engine.");
        print_notice(&session.database_notice());
    } else {
        println!("Not connected.");
    }
}

fn print_history(session: &Session) {
    for turn in session.conversation().detailed() {
        match turn.speaker {
            Speaker::User => println!("> {}", turn.text),
            Speaker::Assistant => println!("{}\n", turn.text),
        }
    }
}

/// Connect, then apply a `--database` override. `Err` carries the exit message.
async fn connect(session: &mut Session, database: Option<&str>) -> Result<bool, String> {
    if !session.connect().await {
        return Ok(false);
    }
    if let Some(alias) = database {
        session.select_database(alias).map_err(|e| e.to_string())?;
    }
    Ok(true)
}

async fn run_once(session: &mut Session, database: Option<&str>, question: &str) -> i32 {
    match connect(session, database).await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("Error: could not connect to engine at {}", session.endpoint());
            return 1;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    if session.selected_database_id().is_none() {
        eprintln!("Warning: no database selected");
    }
    match session.submit(question, print_chunk).await {
        Ok(reply) => {
            println!();
            if reply.final_answer.is_missing() {
                eprintln!("Warning: the engine response contained no final answer");
            }
            0
        }
        Err(e) => {
            println!();
            eprintln!("Error: connection failed due to {}", e);
            1
        }
    }
}

async fn run_interactive(session: &mut Session, database: Option<&str>) -> i32 {
    println!("{}", INTRODUCTION);
    println!("Engine: {}", session.endpoint());
    match connect(session, database).await {
        Ok(true) => {
            println!("Connected to engine.");
            print_notice(&session.database_notice());
        }
        Ok(false) => {
            eprintln!("Error: could not connect to engine. Use /connect or /endpoint <url>.")
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: failed to read input: {}", e);
                break;
            }
        };
        match parse_input(&line) {
            Input::Blank => {}
            Input::Quit => break,
            Input::Help => println!("{}", HELP),
            Input::Databases => {
                if !session.refresh_catalog().await {
                    print_notice(&Notice::warning(CATALOG_UNAVAILABLE_MESSAGE));
                }
                print_databases(session);
            }
            Input::Status => print_status(session),
            Input::History => print_history(session),
            Input::Unknown(text) => eprintln!("Unknown command: {} (try /help)", text),
            Input::Action(action) => {
                let connecting = action == Action::Connect;
                let asking = matches!(action, Action::Submit(_));
                if let Some(notice) = session.dispatch(action, print_chunk).await {
                    if asking {
                        println!();
                    }
                    print_notice(&notice);
                } else if asking {
                    println!("\n");
                }
                if connecting && session.is_connected() {
                    print_notice(&session.database_notice());
                }
            }
        }
    }
    0
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli);

    let mut session = Session::new(&cfg).unwrap_or_else(|e| {
        eprintln!("Error: failed to create engine client: {}", e);
        process::exit(1);
    });
    if let Some(endpoint) = &cli.endpoint {
        session.set_endpoint(endpoint.clone());
    }

    // Single-threaded: one session, one flow of control.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to create runtime: {}", e);
            process::exit(1);
        });

    let database = cli.database.as_deref();
    let code = rt.block_on(async {
        match &cli.question {
            Some(question) => run_once(&mut session, database, question).await,
            None => run_interactive(&mut session, database).await,
        }
    });
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_a_question() {
        assert_eq!(
            parse_input("  how many stations?  "),
            Input::Action(Action::Submit("how many stations?".to_string()))
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            parse_input("/endpoint http://engine:8080"),
            Input::Action(Action::SetEndpoint("http://engine:8080".to_string()))
        );
        assert_eq!(
            parse_input("/use gdelt"),
            Input::Action(Action::SelectDatabase("gdelt".to_string()))
        );
    }

    #[test]
    fn test_command_missing_argument_is_unknown() {
        assert!(matches!(parse_input("/use"), Input::Unknown(_)));
        assert!(matches!(parse_input("/endpoint   "), Input::Unknown(_)));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_input("/reset"), Input::Action(Action::Reset));
        assert_eq!(parse_input("/connect"), Input::Action(Action::Connect));
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input(""), Input::Blank);
    }
}
