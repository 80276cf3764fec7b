//! Scaffold CLI
//!
//! Commands: render, log
//! Rendered pages go to stdout, errors are JSON objects on stdout
//! Returns non-zero on failure

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use scaffold_core::{
    AppConfig, FsTemplateSource, Identity, LayoutView, LogError, MarkupEngine, Payload,
    RequestContext, Severity, VariableScope,
};

#[derive(Parser)]
#[command(name = "scaffold-cli")]
#[command(about = "Scaffold CLI - render views into layouts and write log lines")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Views root (overrides config)
    #[arg(long)]
    views_dir: Option<PathBuf>,

    /// Log directory (overrides config)
    #[arg(long)]
    logs_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a view inside its layout
    Render {
        /// Controller name
        #[arg(short, long)]
        controller: String,

        /// Action name
        #[arg(short, long, default_value = "index")]
        action: String,

        /// View to render instead of the action's own (e.g. admin/report)
        #[arg(long)]
        view: Option<String>,

        /// JSON object of view variables
        #[arg(long)]
        vars: Option<String>,

        /// Layout name
        #[arg(short, long)]
        layout: Option<String>,
    },

    /// Append one line to a log file
    Log {
        #[arg(short, long, value_enum, default_value_t = Level::Info)]
        level: Level,

        /// Identity column value
        #[arg(short, long)]
        uid: Option<String>,

        /// Treat MESSAGE as JSON and log it as a structured value
        #[arg(long)]
        json: bool,

        message: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Debug,
    Info,
    Warn,
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Debug => Severity::Debug,
            Level::Info => Severity::Info,
            Level::Warn => Severity::Warn,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match AppConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", serde_json::json!({ "error": e.to_string() }));
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.views_dir {
        config.views_dir = dir;
    }
    if let Some(dir) = cli.logs_dir {
        config.logs_dir = dir;
    }

    match cli.command {
        Commands::Render { controller, action, view, vars, layout } => {
            let vars: VariableScope = match vars.as_deref().map(|v| serde_json::from_str::<VariableScope>(v)).transpose() {
                Ok(v) => v.unwrap_or_default(),
                Err(e) => {
                    println!("{}", serde_json::json!({ "error": format!("Invalid vars: {}", e) }));
                    return ExitCode::FAILURE;
                }
            };

            let request_id = Uuid::new_v4();
            let mut logger = config.logger();
            logger.set_identity(Identity::literal(request_id));
            if let Err(e) = fs::create_dir_all(&config.logs_dir) {
                tracing::warn!(error = %e, dir = %config.logs_dir.display(), "cannot create log directory");
            }

            let mut page = LayoutView::new(
                config.view_config(),
                Box::new(FsTemplateSource::new()),
                Box::new(MarkupEngine::new()),
            );
            if let Some(layout) = layout {
                page.set_layout(layout);
            }
            for (name, value) in vars {
                page.set(name, value);
            }

            let mut ctx = RequestContext::new(controller, action);
            match page.render(&mut ctx, view.as_deref()) {
                Ok(()) => {
                    report(logger.debug(format!(
                        "render {}/{} ({} bytes)",
                        ctx.controller,
                        view.as_deref().unwrap_or(ctx.action.as_str()),
                        ctx.output.len()
                    )));
                    print!("{}", ctx.output);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    report(logger.warn(format!("render {}/{} failed: {}", ctx.controller, ctx.action, e)));
                    println!("{}", serde_json::json!({ "success": false, "error": e.to_string() }));
                    ExitCode::from(2)
                }
            }
        }

        Commands::Log { level, uid, json, message } => {
            let payload = if json {
                match serde_json::from_str::<serde_json::Value>(&message) {
                    Ok(value) => Payload::from(value),
                    Err(e) => {
                        println!("{}", serde_json::json!({ "error": format!("Invalid JSON message: {}", e) }));
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                Payload::Text(message)
            };

            let mut logger = config.logger();
            if let Some(uid) = uid {
                logger.set_identity(Identity::Literal(uid));
            }

            let result = fs::create_dir_all(&config.logs_dir)
                .map_err(|source| LogError::Append { path: config.logs_dir.clone(), source })
                .and_then(|_| logger.log(level.into(), payload));
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    println!("{}", serde_json::json!({ "error": e.to_string() }));
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn report(result: Result<(), LogError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "log write failed");
    }
}
