mod config;
mod openai;
mod terminal;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use redline_core::{
    Effect, EngineEvent, HighlightOverlay, HostSurface, ProofreadEngine, Proofreader, TextRope,
    apply_effects,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{CliConfig, default_config_path};
use crate::openai::OpenAiModel;
use crate::terminal::TerminalHost;

#[derive(Parser)]
#[command(
    version,
    about = "Redline - inline proofreading with an OpenAI-compatible model",
    long_about = None
)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (defaults to <config dir>/redline/config.kdl)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the model API
    #[arg(long, global = true, env = "REDLINE_ENDPOINT")]
    endpoint: Option<String>,

    /// Model name
    #[arg(long, global = true, env = "REDLINE_MODEL")]
    model: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Proofread a file (or stdin) and print the corrections
    Check {
        /// File to proofread; reads stdin when omitted
        path: Option<PathBuf>,

        /// Accept every correction and print the corrected text
        #[arg(long)]
        apply: bool,
    },
    /// Proofread interactively: move the caret, accept or dismiss corrections
    Interactive {
        /// Initial text; starts empty when omitted
        path: Option<PathBuf>,
    },
    /// Report whether the model can be used
    Availability,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette()?;

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.log);

    let model = OpenAiModel::new(
        &config.endpoint,
        &config.model,
        config.api_key(),
        Duration::from_secs(config.timeout_secs),
    )?;
    tracing::debug!(endpoint = %config.endpoint, model = %model.model_name(), "using model");
    let proofreader = Proofreader::new(model, config.proofread.clone());

    match cli.command {
        Commands::Check { path, apply } => {
            let text = read_input(path.as_deref())?;
            check(&proofreader, &config, &text, apply).await?;
        }
        Commands::Interactive { path } => {
            let text = match path {
                Some(path) => read_input(Some(path.as_path()))?,
                None => String::new(),
            };
            interactive(&proofreader, &config, &text).await?;
        }
        Commands::Availability => {
            let availability = proofreader.availability().await?;
            println!("{}: {availability}", config.model);
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<CliConfig> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => match default_config_path() {
            Some(path) if path.exists() => CliConfig::load(&path)?,
            _ => CliConfig::default(),
        },
    };

    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(log) = &cli.log {
        config.log = log.clone();
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("could not read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .into_diagnostic()
                .wrap_err("could not read stdin")?;
            Ok(text)
        }
    }
}

fn new_engine(config: &CliConfig, text: &str) -> ProofreadEngine<TextRope> {
    ProofreadEngine::from_text(text).with_overlay(HighlightOverlay::with_legend(&config.legend))
}

async fn check(
    proofreader: &Proofreader<OpenAiModel>,
    config: &CliConfig,
    text: &str,
    apply: bool,
) -> Result<()> {
    let mut engine = new_engine(config, text);
    let mut host = TerminalHost::new(std::io::stdout(), text, &config.legend);

    let effects = engine.proofread_with(proofreader).await;
    apply_effects(&mut host, engine.overlay(), &effects).into_diagnostic()?;
    if let Some(corrected) = engine.corrected_input() {
        host.corrected_input(corrected).into_diagnostic()?;
    }

    if engine.corrections().is_empty() {
        return Ok(());
    }

    host.render().into_diagnostic()?;
    println!();
    host.list(engine.corrections()).into_diagnostic()?;

    if apply {
        // Always take the first: accepting shifts everything after it.
        while let Some(first) = engine.corrections().as_slice().first().cloned() {
            engine.handle(EngineEvent::CaretMoved {
                offset: first.span.start,
                rect: None,
            });
            engine.handle(EngineEvent::Accept);
        }
        println!();
        println!("{}", engine.text());
    }

    Ok(())
}

const HELP: &str = "\
commands:
  :proofread        send the text to the model
  :caret N          move the caret to char offset N
  :accept           accept the correction under the caret
  :dismiss          close the correction popover
  :edit TEXT        replace the text
  :show             draw the text and highlights
  :list             list the corrections
  :quit             exit";

async fn interactive(
    proofreader: &Proofreader<OpenAiModel>,
    config: &CliConfig,
    text: &str,
) -> Result<()> {
    let mut engine = new_engine(config, text);
    let mut host = TerminalHost::new(std::io::stdout(), text, &config.legend);
    // Legend labels before the first request.
    host.paint_all(engine.overlay()).into_diagnostic()?;

    println!("{HELP}");
    host.render().into_diagnostic()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.into_diagnostic()? {
        let line = line.trim();
        let (command, arg) = line.split_once(' ').unwrap_or((line, ""));

        let effects: Vec<Effect> = match command {
            ":proofread" | ":p" => engine.proofread_with(proofreader).await,
            ":caret" | ":c" => match arg.trim().parse::<usize>() {
                Ok(offset) => engine.handle(EngineEvent::CaretMoved { offset, rect: None }),
                Err(_) => {
                    println!("usage: :caret N");
                    continue;
                }
            },
            ":accept" | ":a" => engine.handle(EngineEvent::Accept),
            ":dismiss" | ":d" => engine.handle(EngineEvent::Dismiss),
            ":edit" | ":e" => {
                let effects = engine.handle(EngineEvent::BufferEdited {
                    text: arg.to_string(),
                });
                host.set_text(arg).into_diagnostic()?;
                effects
            }
            ":show" | ":s" => {
                host.render().into_diagnostic()?;
                continue;
            }
            ":list" | ":l" => {
                host.list(engine.corrections()).into_diagnostic()?;
                continue;
            }
            ":quit" | ":q" => break,
            "" => continue,
            _ => {
                println!("{HELP}");
                continue;
            }
        };

        let redraw = effects
            .iter()
            .any(|e| matches!(e, Effect::TextReplaced { .. } | Effect::HighlightsChanged(_)));
        apply_effects(&mut host, engine.overlay(), &effects).into_diagnostic()?;
        if redraw {
            host.render().into_diagnostic()?;
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()
    .wrap_err("couldn't set the miette hook")?;
    miette::set_panic_hook();
    Ok(())
}
