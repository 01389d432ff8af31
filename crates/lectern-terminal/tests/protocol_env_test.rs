//! Environment-driven protocol detection

use lectern_terminal::{EnvIdentifiers, TerminalProtocol};
use serial_test::serial;
use std::env;

const KEYS: [&str; 5] = [
    "TERM",
    "TERM_PROGRAM",
    "LC_TERMINAL",
    "VIM_TERMINAL",
    "KITTY_WINDOW_ID",
];

fn with_env<F: FnOnce()>(pairs: &[(&str, &str)], f: F) {
    let saved: Vec<(&str, Option<String>)> = KEYS.iter().map(|k| (*k, env::var(k).ok())).collect();
    for key in KEYS {
        env::remove_var(key);
    }
    for (key, value) in pairs {
        env::set_var(key, value);
    }

    f();

    for (key, value) in saved {
        match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }
}

#[test]
#[serial]
fn test_from_env_reads_kitty() {
    with_env(&[("TERM", "xterm-kitty")], || {
        let ids = EnvIdentifiers::from_env();
        assert_eq!(ids.term, "xterm-kitty");
        assert_eq!(ids.heuristic_protocol(), TerminalProtocol::Kitty);
    });
}

#[test]
#[serial]
fn test_from_env_reads_iterm() {
    with_env(&[("TERM_PROGRAM", "iTerm.app"), ("TERM", "xterm-256color")], || {
        assert_eq!(
            EnvIdentifiers::from_env().heuristic_protocol(),
            TerminalProtocol::Iterm
        );
    });
}

#[test]
#[serial]
fn test_from_env_empty_is_other() {
    with_env(&[], || {
        let ids = EnvIdentifiers::from_env();
        assert_eq!(ids, EnvIdentifiers::default());
        assert_eq!(ids.heuristic_protocol(), TerminalProtocol::Other);
    });
}

#[test]
#[serial]
fn test_tmux_hides_kitty() {
    with_env(&[("TERM", "tmux-256color"), ("TERM_PROGRAM", "ghostty")], || {
        assert_eq!(
            EnvIdentifiers::from_env().heuristic_protocol(),
            TerminalProtocol::Other
        );
    });
}
