//! Code block execution
//!
//! Each block is written to its own scratch file and run through the
//! language's command steps. Failures caused by the block's content never
//! escape as errors; they come back as output text with an exit code so the
//! presentation can show them inline.

use crate::builtin::{self, IMAGE_LANGUAGE, QR_LANGUAGE};
use crate::extract::{parse, CodeBlock};
use crate::language::{LanguageRegistry, LanguageSpec};
use crate::CodeError;
use lectern_terminal::TerminalProtocol;
use regex::{Captures, Regex};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tempfile::TempPath;
use tracing::{debug, warn};

/// Exit code for failures inside the engine, before any process ran
pub const EXIT_INTERNAL_ERROR: i32 = -1;

/// Exit code for a step that could not report its own
const EXIT_UNKNOWN_FAILURE: i32 = 1;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(file|name|path)>").expect("valid placeholder pattern"));

/// Output of one executed block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: String,
    pub exit_code: i32,
    /// Wall-clock time spent in the command steps
    pub duration: Duration,
}

impl ExecutionResult {
    pub(crate) fn completed(output: String) -> Self {
        Self {
            output,
            exit_code: 0,
            duration: Duration::ZERO,
        }
    }

    fn internal_error(message: impl Into<String>) -> Self {
        Self {
            output: message.into(),
            exit_code: EXIT_INTERNAL_ERROR,
            duration: Duration::ZERO,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn is_internal_error(&self) -> bool {
        self.exit_code == EXIT_INTERNAL_ERROR
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding scratch source files; also each step's working directory
    pub scratch_dir: PathBuf,
    /// Prefix of scratch file names
    pub file_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
            file_prefix: "lectern-".to_string(),
        }
    }
}

/// Terminal facts needed by the image and QR built-ins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    pub protocol: TerminalProtocol,
    /// Character rows an image may occupy
    pub available_rows: u32,
    /// Character columns an image may occupy
    pub max_cols: u32,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self {
            protocol: TerminalProtocol::Other,
            available_rows: 24,
            max_cols: 80,
        }
    }
}

/// Values substituted into command templates
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placeholders {
    file: String,
    name: String,
    path: String,
}

impl Placeholders {
    fn for_file(file: &Path) -> Self {
        Self {
            file: file.to_string_lossy().into_owned(),
            name: file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: file
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Single pass, so substituted values are never substituted again
    fn substitute(&self, token: &str) -> String {
        PLACEHOLDER
            .replace_all(token, |caps: &Captures<'_>| match &caps[1] {
                "file" => self.file.clone(),
                "name" => self.name.clone(),
                _ => self.path.clone(),
            })
            .into_owned()
    }

    fn command(&self, template: &[String]) -> Vec<String> {
        template.iter().map(|token| self.substitute(token)).collect()
    }
}

/// Why a command step did not succeed
struct StepFailure {
    message: String,
    exit_code: i32,
}

/// Run one command step in `dir` and capture its stdout.
///
/// A failing step reports its stderr, or the exit status text (`exit
/// status: N`) when stderr is empty, so the audience sees the compiler or
/// interpreter diagnostic rather than only the status.
fn run_step(argv: &[String], dir: &Path) -> Result<Vec<u8>, StepFailure> {
    let (program, args) = argv.split_first().ok_or_else(|| StepFailure {
        message: "empty command".to_string(),
        exit_code: EXIT_UNKNOWN_FAILURE,
    })?;

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| StepFailure {
            message: format!("{program}: {e}"),
            exit_code: EXIT_UNKNOWN_FAILURE,
        })?;

    if output.status.success() {
        return Ok(output.stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(StepFailure {
        message: if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            stderr.into_owned()
        },
        exit_code: output.status.code().unwrap_or(EXIT_UNKNOWN_FAILURE),
    })
}

/// Runs code blocks through the language registry
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    registry: LanguageRegistry,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(registry: LanguageRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    /// Engine over the built-in languages with default configuration
    pub fn builtin() -> Self {
        Self::new(LanguageRegistry::builtin(), EngineConfig::default())
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one block.
    ///
    /// Only an image that cannot be opened or decoded is an error; every
    /// other failure is reported through the result.
    pub fn execute(&self, block: &CodeBlock, ctx: &RenderContext) -> Result<ExecutionResult, CodeError> {
        match block.language.as_str() {
            IMAGE_LANGUAGE => builtin::render_image_block(block, ctx),
            QR_LANGUAGE => Ok(builtin::render_qr_block(block)),
            _ => Ok(self.run_commands(block)),
        }
    }

    /// Run a block through its registered command steps.
    pub fn run_commands(&self, block: &CodeBlock) -> ExecutionResult {
        let Some(spec) = self.registry.get(&block.language) else {
            warn!("Unsupported language: {}", block.language);
            return ExecutionResult::internal_error("Error: unsupported language");
        };

        let source = match self.write_source(block, spec) {
            Ok(path) => path,
            Err(failure) => return failure,
        };

        let placeholders = Placeholders::for_file(&source);
        let commands: Vec<Vec<String>> = spec
            .commands
            .iter()
            .map(|template| placeholders.command(template))
            .collect();

        let mut output = String::new();
        let mut exit_code = 0;
        let mut failed_steps = Vec::new();

        // Nothing but the steps themselves between these two instants.
        let start = Instant::now();
        for (step, argv) in commands.iter().enumerate() {
            match run_step(argv, &self.config.scratch_dir) {
                Ok(stdout) => output.push_str(&String::from_utf8_lossy(&stdout)),
                Err(failure) => {
                    output.push_str(&failure.message);
                    exit_code = failure.exit_code;
                    failed_steps.push(step);
                }
            }
        }
        let duration = start.elapsed();

        for step in failed_steps {
            warn!("Step {:?} of {} block failed", commands[step], block.language);
        }
        debug!(
            "Executed {} block in {:?} ({} steps, exit code {})",
            block.language,
            duration,
            commands.len(),
            exit_code
        );

        if let Err(e) = source.close() {
            warn!("Failed to remove scratch file: {}", e);
        }

        ExecutionResult {
            output,
            exit_code,
            duration,
        }
    }

    /// Write the block to a fresh scratch file, removed when the path drops.
    fn write_source(&self, block: &CodeBlock, spec: &LanguageSpec) -> Result<TempPath, ExecutionResult> {
        let suffix = if spec.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", spec.extension)
        };

        let mut file = tempfile::Builder::new()
            .prefix(&self.config.file_prefix)
            .suffix(&suffix)
            .tempfile_in(&self.config.scratch_dir)
            .map_err(|e| {
                warn!("Failed to create scratch file in {:?}: {}", self.config.scratch_dir, e);
                ExecutionResult::internal_error(format!("Error: could not create file: {e}"))
            })?;

        file.write_all(block.code.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| {
                warn!("Failed to write scratch file: {}", e);
                ExecutionResult::internal_error(format!("Error: could not write to file: {e}"))
            })?;

        debug!("Wrote {} block to {:?}", block.language, file.path());
        Ok(file.into_temp_path())
    }

    /// Execute every block of a slide in order and join their outputs.
    ///
    /// A slide without runnable code yields the parse error as inline text.
    pub fn execute_slide(&self, text: &str, ctx: &RenderContext) -> Result<String, CodeError> {
        let blocks = match parse(text) {
            Ok(blocks) => blocks,
            Err(e) => return Ok(format!("\n{e}")),
        };

        let mut outputs = Vec::with_capacity(blocks.len());
        for block in &blocks {
            outputs.push(self.execute(block, ctx)?.output);
        }
        Ok(outputs.join("\n").trim().to_string())
    }

    /// Execute only the blocks shown automatically when a slide appears.
    pub fn auto_execute(&self, text: &str, ctx: &RenderContext) -> Result<String, CodeError> {
        let Ok(blocks) = parse(text) else {
            return Ok(String::new());
        };

        let mut outputs = Vec::new();
        for block in blocks.iter().filter(|b| builtin::is_auto_execute(&b.language)) {
            outputs.push(self.execute(block, ctx)?.output);
        }
        Ok(outputs.join("\n").trim().to_string())
    }
}
