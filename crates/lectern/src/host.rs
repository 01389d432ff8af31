//! Terminal facts gathered once per invocation

use crossterm::style::{style, Stylize};
use lectern_code::{ExecutionResult, RenderContext};
use lectern_terminal::{
    request_attributes, resolve_protocol, EnvIdentifiers, ProbeConfig, ProbeError, ProbeResult,
    TerminalProtocol, PROTOCOL_ENV_VAR,
};
use std::io::{self, IsTerminal};
use tracing::{debug, warn};

/// Used when the terminal size cannot be queried
const FALLBACK_SIZE: (u16, u16) = (80, 24);

/// Rows kept free below an image for the result footer
const FOOTER_ROWS: u16 = 2;

/// Pick the forced protocol, if any. The flag wins over the variable.
pub fn protocol_override(
    flag: Option<TerminalProtocol>,
    env_value: Option<&str>,
) -> Option<TerminalProtocol> {
    if flag.is_some() {
        return flag;
    }

    let value = env_value?.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse() {
        Ok(protocol) => Some(protocol),
        Err(e) => {
            warn!("Ignoring {}: {}", PROTOCOL_ENV_VAR, e);
            None
        }
    }
}

/// The forced protocol from the flag or the environment
pub fn forced_protocol(flag: Option<TerminalProtocol>) -> Option<TerminalProtocol> {
    let env_value = std::env::var(PROTOCOL_ENV_VAR).ok();
    protocol_override(flag, env_value.as_deref())
}

/// Query device attributes, only when both ends of stdio are a terminal
pub fn probe_terminal() -> Result<ProbeResult, ProbeError> {
    if !io::stdout().is_terminal() {
        return Err(ProbeError::NonInteractive);
    }
    request_attributes(&ProbeConfig::default())
}

/// Decide the protocol for this invocation; probes only when nothing is forced.
pub fn detect_protocol(flag: Option<TerminalProtocol>) -> TerminalProtocol {
    if let Some(protocol) = forced_protocol(flag) {
        debug!("Using forced terminal protocol {}", protocol);
        return protocol;
    }
    resolve_protocol(None, &EnvIdentifiers::from_env(), &probe_terminal())
}

/// Current terminal size as (columns, rows)
pub fn terminal_size() -> (u16, u16) {
    crossterm::terminal::size().unwrap_or_else(|e| {
        debug!("Could not query terminal size ({}), assuming 80x24", e);
        FALLBACK_SIZE
    })
}

pub fn render_context(protocol: TerminalProtocol, (cols, rows): (u16, u16)) -> RenderContext {
    RenderContext {
        protocol,
        available_rows: u32::from(rows.saturating_sub(FOOTER_ROWS)),
        max_cols: u32::from(cols),
    }
}

/// Dim one-line summary printed after each block
pub fn footer(result: &ExecutionResult) -> String {
    let summary = format!(
        "exit {} · {}ms",
        result.exit_code,
        result.duration.as_millis()
    );
    style(summary).dim().to_string()
}
