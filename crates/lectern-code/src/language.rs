//! Language registry
//!
//! Maps a fence's language token to the file extension its source is saved
//! with and the commands that run it. Command templates are argument lists;
//! `<file>`, `<name>` and `<path>` are substituted before each run.

use crate::CodeError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

type CommandTemplate = &'static [&'static str];

/// Languages available out of the box
const BUILTIN_LANGUAGES: &[(&str, &str, &[CommandTemplate])] = &[
    ("bash", "sh", &[&["bash", "<file>"]]),
    ("sh", "sh", &[&["sh", "<file>"]]),
    ("zsh", "zsh", &[&["zsh", "<file>"]]),
    ("fish", "fish", &[&["fish", "<file>"]]),
    ("nu", "nu", &[&["nu", "<file>"]]),
    ("elixir", "exs", &[&["elixir", "<file>"]]),
    ("go", "go", &[&["go", "run", "<file>"]]),
    ("javascript", "js", &[&["node", "<file>"]]),
    ("typescript", "ts", &[&["deno", "run", "<file>"]]),
    ("lua", "lua", &[&["lua", "<file>"]]),
    ("ocaml", "ml", &[&["ocaml", "<file>"]]),
    ("perl", "pl", &[&["perl", "<file>"]]),
    ("php", "php", &[&["php", "<file>"]]),
    ("python", "py", &[&["python3", "<file>"]]),
    ("r", "R", &[&["Rscript", "<file>"]]),
    ("ruby", "rb", &[&["ruby", "<file>"]]),
    ("julia", "jl", &[&["julia", "<file>"]]),
    ("haskell", "hs", &[&["runghc", "<file>"]]),
    ("java", "java", &[&["java", "<file>"]]),
    ("swift", "swift", &[&["swift", "<file>"]]),
    ("dart", "dart", &[&["dart", "<file>"]]),
    ("v", "v", &[&["v", "run", "<file>"]]),
    // TODO: remove the `<name>.run` artifacts compiled languages leave in the scratch directory
    (
        "rust",
        "rs",
        &[
            &["rustc", "<file>", "-o", "<path>/<name>.run"],
            &["<path>/<name>.run"],
        ],
    ),
    (
        "cpp",
        "cpp",
        &[
            &["g++", "-std=c++17", "<file>", "-o", "<path>/<name>.run"],
            &["<path>/<name>.run"],
        ],
    ),
];

/// How to run one language
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageSpec {
    /// Extension of the scratch source file, without the dot
    pub extension: String,
    /// Command templates, run in order
    pub commands: Vec<Vec<String>>,
}

impl LanguageSpec {
    pub fn new<E, C, A>(extension: E, commands: C) -> Self
    where
        E: Into<String>,
        C: IntoIterator<Item = A>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            extension: extension.into(),
            commands: commands
                .into_iter()
                .map(|step| step.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

/// On-disk override format
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryFile {
    #[serde(default)]
    languages: HashMap<String, LanguageSpec>,
}

/// Language token to [`LanguageSpec`] table
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: HashMap<String, LanguageSpec>,
}

impl LanguageRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in language table
    pub fn builtin() -> Self {
        let languages = BUILTIN_LANGUAGES
            .iter()
            .map(|(token, extension, commands)| {
                (
                    (*token).to_owned(),
                    LanguageSpec::new(*extension, commands.iter().map(|c| c.iter().copied())),
                )
            })
            .collect();
        Self { languages }
    }

    /// Look up a language token; tokens are case-sensitive
    pub fn get(&self, language: &str) -> Option<&LanguageSpec> {
        self.languages.get(language)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Add or replace a language
    pub fn insert(&mut self, language: impl Into<String>, spec: LanguageSpec) -> Option<LanguageSpec> {
        self.languages.insert(language.into(), spec)
    }

    /// Registered tokens in sorted order
    pub fn tokens(&self) -> Vec<&str> {
        let mut tokens: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        tokens.sort_unstable();
        tokens
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Merge languages from a TOML document over the current table.
    ///
    /// Returns the number of languages added or replaced.
    pub fn merge_toml(&mut self, source: &str) -> Result<usize, CodeError> {
        let file: RegistryFile =
            toml::from_str(source).map_err(|e| CodeError::Config(e.to_string()))?;

        for (token, spec) in &file.languages {
            if spec.commands.is_empty() || spec.commands.iter().any(Vec::is_empty) {
                return Err(CodeError::Config(format!(
                    "language `{token}` needs at least one non-empty command"
                )));
            }
        }

        let count = file.languages.len();
        for (token, spec) in file.languages {
            debug!("Registering language {} (.{})", token, spec.extension);
            self.languages.insert(token, spec);
        }
        Ok(count)
    }

    /// Merge languages from a TOML file
    pub fn load_overrides(&mut self, path: &Path) -> Result<usize, CodeError> {
        let source = std::fs::read_to_string(path)?;
        self.merge_toml(&source)
    }
}
