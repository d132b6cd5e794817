mod api;
mod app;
mod config;
mod constants;
mod history;
mod input;
mod navigator;
#[cfg(feature = "notifications")]
mod notification;
mod probe;
mod scheduler;
mod sync;
mod ui;

use std::env;
use std::io::{self, Write};

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::ResourceKind;
use crate::app::App;
use crate::config::Config;

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,genwatch=debug"));

    // Try to create a log file in the config directory
    let log_file = Config::config_dir()
        .ok()
        .map(|dir| dir.join("genwatch.log"))
        .and_then(|path| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&path)
                .ok()
        });

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        // Fallback to stderr if file logging fails
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    let kinds: Vec<&str> = ResourceKind::ALL.iter().map(|kind| kind.as_str()).collect();
    eprintln!(
        r#"genwatch - Terminal monitor for generation jobs

Usage: genwatch [command | kind]

Commands:
    (none)      Watch the kind configured in config.toml
    <kind>      Watch one kind of job: {}
    init        Write a default configuration file
    help        Show this help message

Configuration file: ~/.config/genwatch/config.toml
"#,
        kinds.join(", ")
    );
}

fn run_init() -> Result<()> {
    let config_path = Config::config_path()?;
    if config_path.exists() {
        print!(
            "{} already exists. Overwrite? [y/N]: ",
            config_path.display()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    Config::default().save()?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

async fn run(kind: Option<ResourceKind>) -> Result<()> {
    setup_logging();

    let mut config = Config::load()?;
    config.ensure_dirs()?;
    if let Some(kind) = kind {
        config.server.kind = kind;
    }

    crate::ui::theme::init_theme(config.ui.theme);

    tracing::info!(
        "Watching {} jobs on {}",
        config.server.kind,
        config.server.base_url
    );
    let mut app = App::new(config)?;
    app.run().await
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("help") | Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        Some("init") => run_init(),
        Some(arg) => match arg.parse::<ResourceKind>() {
            Ok(kind) => run(Some(kind)).await,
            Err(e) => {
                eprintln!("{}", e);
                print_usage();
                std::process::exit(1);
            }
        },
        None => run(None).await,
    }
}
