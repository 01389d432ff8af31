//! Inline graphics protocol selection
//!
//! The protocol is resolved once at startup and passed by value to every
//! renderer afterwards; nothing in this crate re-probes per render.

use crate::probe::ProbeResult;
use crate::ProbeError;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Environment variable that forces a protocol, bypassing probing
pub const PROTOCOL_ENV_VAR: &str = "LECTERN_PROTOCOL";

/// Environment variables consulted by the heuristics
const IDENTIFIER_KEYS: [&str; 5] = [
    "TERM",
    "TERM_PROGRAM",
    "LC_TERMINAL",
    "VIM_TERMINAL",
    "KITTY_WINDOW_ID",
];

/// Inline image protocol understood by the hosting terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum TerminalProtocol {
    /// Kitty graphics protocol
    Kitty,
    /// iTerm2 inline images (OSC 1337)
    Iterm,
    /// No inline graphics support
    #[default]
    Other,
}

impl TerminalProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalProtocol::Kitty => "kitty",
            TerminalProtocol::Iterm => "iterm",
            TerminalProtocol::Other => "other",
        }
    }

    /// Whether any image renderer exists for this protocol
    pub fn supports_images(&self) -> bool {
        !matches!(self, TerminalProtocol::Other)
    }
}

impl fmt::Display for TerminalProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kitty" => Ok(TerminalProtocol::Kitty),
            "iterm" | "iterm2" => Ok(TerminalProtocol::Iterm),
            "other" | "none" => Ok(TerminalProtocol::Other),
            unknown => Err(format!("unknown terminal protocol: {unknown}")),
        }
    }
}

/// Lower-cased, trimmed snapshot of the terminal-identifying environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvIdentifiers {
    pub term: String,
    pub term_program: String,
    pub lc_terminal: String,
    pub vim_terminal: String,
    pub kitty_window_id: String,
}

impl EnvIdentifiers {
    /// Capture the identifiers from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut values = IDENTIFIER_KEYS
            .iter()
            .map(|key| lookup(key).map(|v| v.trim().to_lowercase()).unwrap_or_default());

        Self {
            term: values.next().unwrap_or_default(),
            term_program: values.next().unwrap_or_default(),
            lc_terminal: values.next().unwrap_or_default(),
            vim_terminal: values.next().unwrap_or_default(),
            kitty_window_id: values.next().unwrap_or_default(),
        }
    }

    /// Running under screen or tmux, where graphics passthrough is unreliable
    pub fn is_tmux_or_screen(&self) -> bool {
        self.term.starts_with("screen") || self.term.starts_with("tmux")
    }

    pub fn is_kitty_capable(&self) -> bool {
        self.term.contains("kitty")
            || !self.kitty_window_id.is_empty()
            || matches!(self.term_program.as_str(), "ghostty" | "wezterm")
    }

    pub fn is_iterm_capable(&self) -> bool {
        self.term_program == "iterm.app" || self.lc_terminal == "iterm2"
    }

    /// Pick a protocol from the environment alone
    pub fn heuristic_protocol(&self) -> TerminalProtocol {
        if self.is_tmux_or_screen() {
            TerminalProtocol::Other
        } else if self.is_kitty_capable() {
            TerminalProtocol::Kitty
        } else if self.is_iterm_capable() {
            TerminalProtocol::Iterm
        } else {
            TerminalProtocol::Other
        }
    }
}

/// Decide the protocol for this run.
///
/// An explicit override wins. Otherwise the terminal must have answered the
/// attribute probe; any probe failure degrades to [`TerminalProtocol::Other`].
/// A live terminal is then classified by the environment heuristics.
pub fn resolve_protocol(
    override_protocol: Option<TerminalProtocol>,
    env: &EnvIdentifiers,
    probe: &Result<ProbeResult, ProbeError>,
) -> TerminalProtocol {
    if let Some(protocol) = override_protocol {
        debug!("Terminal protocol forced to {}", protocol);
        return protocol;
    }

    match probe {
        Ok(result) => {
            if result.supports_sixel() {
                debug!("Terminal reports sixel graphics, no sixel renderer available");
            }
            let protocol = env.heuristic_protocol();
            debug!(
                "Resolved terminal protocol {} from attributes {:?}",
                protocol, result.attribute_codes
            );
            protocol
        }
        Err(e) => {
            warn!("Terminal probe failed ({}), falling back to plain output", e);
            TerminalProtocol::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvIdentifiers {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvIdentifiers::from_lookup(|key| map.get(key).cloned())
    }

    fn answered() -> Result<ProbeResult, ProbeError> {
        Ok(ProbeResult {
            attribute_codes: vec![62, 22],
        })
    }

    #[test]
    fn test_identifiers_are_normalized() {
        let ids = env(&[("TERM_PROGRAM", "  iTerm.app "), ("TERM", "XTERM-Kitty")]);
        assert_eq!(ids.term_program, "iterm.app");
        assert_eq!(ids.term, "xterm-kitty");
        assert!(ids.vim_terminal.is_empty());
    }

    #[test]
    fn test_kitty_by_window_id() {
        let ids = env(&[("TERM", "xterm-256color"), ("KITTY_WINDOW_ID", "3")]);
        assert_eq!(ids.heuristic_protocol(), TerminalProtocol::Kitty);
    }

    #[test]
    fn test_iterm_by_lc_terminal() {
        let ids = env(&[("LC_TERMINAL", "iTerm2")]);
        assert_eq!(ids.heuristic_protocol(), TerminalProtocol::Iterm);
    }

    #[test]
    fn test_multiplexer_is_other() {
        let ids = env(&[("TERM", "screen-256color"), ("KITTY_WINDOW_ID", "1")]);
        assert!(ids.is_tmux_or_screen());
        assert_eq!(ids.heuristic_protocol(), TerminalProtocol::Other);
    }

    #[test]
    fn test_failed_probe_falls_back() {
        let ids = env(&[("TERM", "xterm-kitty")]);
        let probe = Err(ProbeError::TimedOut);
        assert_eq!(resolve_protocol(None, &ids, &probe), TerminalProtocol::Other);

        let probe = Err(ProbeError::NonInteractive);
        assert_eq!(resolve_protocol(None, &ids, &probe), TerminalProtocol::Other);
    }

    #[test]
    fn test_answered_probe_uses_heuristics() {
        let ids = env(&[("TERM", "xterm-kitty")]);
        assert_eq!(
            resolve_protocol(None, &ids, &answered()),
            TerminalProtocol::Kitty
        );
    }

    #[test]
    fn test_override_wins() {
        let ids = env(&[("TERM", "xterm-kitty")]);
        let probe = Err(ProbeError::NonInteractive);
        assert_eq!(
            resolve_protocol(Some(TerminalProtocol::Iterm), &ids, &probe),
            TerminalProtocol::Iterm
        );
    }

    #[test]
    fn test_parse_protocol_names() {
        assert_eq!("Kitty".parse::<TerminalProtocol>(), Ok(TerminalProtocol::Kitty));
        assert_eq!("iterm2".parse::<TerminalProtocol>(), Ok(TerminalProtocol::Iterm));
        assert_eq!("none".parse::<TerminalProtocol>(), Ok(TerminalProtocol::Other));
        assert!("sixel".parse::<TerminalProtocol>().is_err());
    }
}
