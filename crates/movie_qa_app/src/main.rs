//! movie-qa: command-line front end for the movie Q&A backend.
//! Restores the saved session, runs one command, prints the result on stdout
//! (or the failure on stderr with a non-zero exit code).

use clap::{Parser, Subcommand};
use movie_qa_app::panels::CHAT_PLACEHOLDER;
use movie_qa_app::{App, Outcome};
use movie_qa_client::config::{self, Config, CONFIG_ENV};
use movie_qa_client::{Client, FileTokenStore, Session};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "movie-qa")]
#[command(about = "Ask the movie encyclopedia, and manage its knowledge base", long_about = None)]
struct Cli {
    /// Config file (default: ~/.movie-qa/config.yaml)
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Where the session token is kept (default: ~/.movie-qa/token)
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,

    /// Print results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show the current role
    Whoami,
    /// Ask the chat assistant (requires login)
    Chat { question: String },
    /// Ask the knowledge base
    Ask { question: String },
    /// Ingest a PDF into the knowledge base (admins only)
    Upload { path: PathBuf },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Config, String> {
    // An explicitly named config must exist; the default one is optional.
    if let Some(path) = explicit {
        return config::load(path).map_err(|e| e.to_string());
    }
    match config::default_config_path() {
        Some(path) => config::load_or_default(&path).map_err(|e| e.to_string()),
        None => Ok(Config::default()),
    }
}

#[derive(Serialize)]
struct SessionView {
    logged_in: bool,
    role: String,
    can_upload_documents: bool,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            logged_in: s.logged_in,
            role: s.role.to_string(),
            can_upload_documents: movie_qa_client::can_upload_documents(s),
        }
    }
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: cannot encode output: {}", e),
    }
}

fn report(outcome: &Outcome, json: bool) -> ExitCode {
    if json {
        print_json(outcome);
        return if matches!(outcome, Outcome::Success(_)) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }
    match outcome {
        Outcome::Success(message) => {
            println!("{}", message);
            ExitCode::SUCCESS
        }
        Outcome::Prompt(message) | Outcome::Failure(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, app: App) -> ExitCode {
    let json = cli.json;
    // Signing out needs no session check.
    let session = match cli.command {
        Commands::Logout => app.session(),
        _ => app.start().await,
    };

    match cli.command {
        Commands::Logout => {
            let session = app.sign_out();
            if json {
                print_json(&SessionView::from(&session));
            } else {
                println!("Signed out.");
            }
            ExitCode::SUCCESS
        }
        Commands::Login { username, password } => {
            app.login.set_username(&username);
            app.login.set_password(&password);
            match app.login.submit().await {
                Ok(session) if json => {
                    print_json(&SessionView::from(&session));
                    ExitCode::SUCCESS
                }
                Ok(session) => {
                    println!("Signed in as {} ({}).", username.trim(), session.role);
                    ExitCode::SUCCESS
                }
                Err(e) => report(&Outcome::Failure(e.to_string()), json),
            }
        }
        Commands::Whoami => {
            if json {
                print_json(&SessionView::from(&session));
            } else if session.logged_in {
                println!("{}", session.role);
            } else {
                println!("Not signed in ({}).", session.role);
            }
            ExitCode::SUCCESS
        }
        Commands::Chat { question } => match app.chat.ask(&question).await {
            Some(Outcome::Success(answer)) if answer.is_empty() && !json => {
                println!("{}", CHAT_PLACEHOLDER);
                ExitCode::SUCCESS
            }
            Some(outcome) => report(&outcome, json),
            // Not signed in: the chat stays silent.
            None => ExitCode::SUCCESS,
        },
        Commands::Ask { question } => report(&app.rag.ask(&question).await, json),
        Commands::Upload { path } => {
            let Some(panel) = app.upload_panel() else {
                let denied = "Uploading documents requires an administrator account.";
                return report(&Outcome::Failure(denied.into()), json);
            };
            if let Err(e) = panel.select_path(&path) {
                return report(&Outcome::Failure(format!("Upload error: {}", e)), json);
            }
            report(&panel.upload().await, json)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let cfg = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let base_url = cfg.base_url(cli.base_url.as_deref());
    let Some(token_path) = cfg.token_path(cli.token_file.as_deref()) else {
        eprintln!("Error: unable to determine token file (set --token-file)");
        return ExitCode::FAILURE;
    };
    tracing::debug!(%base_url, token_file = %token_path.display(), "starting");

    let client = match Client::with_timeout(&base_url, cfg.timeout()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: cannot create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let app = App::new(client, Arc::new(FileTokenStore::new(token_path)));

    // Single-threaded event loop; panels never need more.
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };
    rt.block_on(run(cli, app))
}
