//! Lectern command line

use crate::host;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lectern_code::{
    hide_annotations, is_auto_execute, parse, EngineConfig, ExecutionEngine, ExecutionResult,
    LanguageRegistry, ParseError, EXIT_INTERNAL_ERROR, IMAGE_LANGUAGE, QR_LANGUAGE,
};
use lectern_terminal::{resolve_protocol, EnvIdentifiers, TerminalProtocol};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Lectern - run the code on your slides")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Inline graphics protocol, skipping detection
    #[arg(long, value_enum, global = true)]
    protocol: Option<TerminalProtocol>,

    /// Log level
    #[arg(long, value_enum, default_value = "warn", global = true)]
    log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute the code blocks of a markdown file
    Run {
        file: PathBuf,

        /// Only render the blocks shown when a slide appears (img, qr)
        #[arg(long)]
        auto: bool,

        /// TOML file with extra or replacement languages
        #[arg(long)]
        languages: Option<PathBuf>,
    },

    /// Print a markdown file the way the audience sees it
    Show { file: PathBuf },

    /// Query the terminal's device attributes
    Probe,

    /// List the languages that can be executed
    Languages {
        /// TOML file with extra or replacement languages
        #[arg(long)]
        languages: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level {
        LogLevel::Trace => tracing::Level::TRACE,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Error => tracing::Level::ERROR,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .init();

    match args.command {
        Command::Run {
            file,
            auto,
            languages,
        } => run_file(&file, auto, languages.as_deref(), args.protocol),
        Command::Show { file } => show_file(&file),
        Command::Probe => probe(args.protocol),
        Command::Languages { languages } => list_languages(languages.as_deref()),
    }
}

fn read_slides(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_registry(overrides: Option<&Path>) -> Result<LanguageRegistry> {
    let mut registry = LanguageRegistry::builtin();
    if let Some(path) = overrides {
        let count = registry
            .load_overrides(path)
            .with_context(|| format!("Failed to load languages from {}", path.display()))?;
        info!("Loaded {} languages from {}", count, path.display());
    }
    Ok(registry)
}

fn run_file(
    path: &Path,
    auto: bool,
    overrides: Option<&Path>,
    protocol: Option<TerminalProtocol>,
) -> Result<()> {
    let text = read_slides(path)?;
    let registry = load_registry(overrides)?;

    let blocks = match parse(&text) {
        Ok(blocks) => blocks,
        Err(ParseError::NoCodeBlock) => {
            info!("No code blocks in {}", path.display());
            return Ok(());
        }
        Err(e) => {
            warn!("Could not parse {}: {}", path.display(), e);
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "\n{e}")?;
            stdout.flush()?;
            return Ok(());
        }
    };

    let ctx = host::render_context(host::detect_protocol(protocol), host::terminal_size());
    debug!("Render context: {:?}", ctx);
    let engine = ExecutionEngine::new(registry, EngineConfig::default());

    let mut stdout = io::stdout().lock();
    for block in blocks.iter().filter(|b| !auto || is_auto_execute(&b.language)) {
        let result = engine.execute(block, &ctx).unwrap_or_else(|e| {
            warn!("Failed to render {} block: {}", block.language, e);
            ExecutionResult {
                output: format!("Error: {e}"),
                exit_code: EXIT_INTERNAL_ERROR,
                duration: Duration::ZERO,
            }
        });

        stdout.write_all(result.output.as_bytes())?;
        if !result.output.is_empty() && !result.output.ends_with('\n') {
            writeln!(stdout)?;
        }
        writeln!(stdout, "{}", host::footer(&result))?;
    }
    stdout.flush()?;
    Ok(())
}

fn show_file(path: &Path) -> Result<()> {
    let text = read_slides(path)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(hide_annotations(&text).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn probe(protocol: Option<TerminalProtocol>) -> Result<()> {
    let env = EnvIdentifiers::from_env();
    let result = host::probe_terminal();

    let mut stdout = io::stdout().lock();
    match &result {
        Ok(reply) => {
            writeln!(stdout, "attributes: {:?}", reply.attribute_codes)?;
            writeln!(stdout, "sixel: {}", reply.supports_sixel())?;
        }
        Err(e) => writeln!(stdout, "probe failed: {e}")?,
    }
    if env.is_tmux_or_screen() {
        writeln!(stdout, "multiplexer: yes")?;
    }

    let resolved = host::forced_protocol(protocol)
        .unwrap_or_else(|| resolve_protocol(None, &env, &result));
    writeln!(stdout, "inline images: {}", resolved.supports_images())?;
    writeln!(stdout, "protocol: {resolved}")?;
    Ok(())
}

fn list_languages(overrides: Option<&Path>) -> Result<()> {
    let registry = load_registry(overrides)?;

    let mut stdout = io::stdout().lock();
    for token in registry.tokens() {
        let Some(spec) = registry.get(token) else {
            continue;
        };
        let steps: Vec<String> = spec.commands.iter().map(|step| step.join(" ")).collect();
        writeln!(stdout, "{token:<12} .{:<6} {}", spec.extension, steps.join(" && "))?;
    }
    for builtin in [IMAGE_LANGUAGE, QR_LANGUAGE] {
        writeln!(stdout, "{builtin:<12} (built-in)")?;
    }
    Ok(())
}
