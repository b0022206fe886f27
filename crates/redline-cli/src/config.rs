//! KDL configuration file for the `redline` binary.
//!
//! ```kdl
//! endpoint "http://localhost:11434/v1"
//! model "llama3.1"
//! api-key-env "OPENAI_API_KEY"
//! timeout-secs 60
//! log "warn"
//! legend "Spelling Punctuation Capitalization Preposition Missing-words Grammar"
//! languages "en"
//! format "snippet"
//! prompt-template "Please proofread the following text and provide corrections: \"{text}\""
//! ```
//!
//! Every node is optional. `format "indexed"` asks the model for char
//! offsets instead of snippets and switches to the matching system prompt,
//! unless `system-prompt` is also set.

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlNode};
use miette::Diagnostic;
use redline_core::{CorrectionFormat, ProofreadConfig};
use smol_str::SmolStr;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_LEGEND: &str =
    "Spelling Punctuation Capitalization Preposition Missing-words Grammar";

#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("could not read config file {}", path.display())]
    #[diagnostic(code(redline::config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file is not valid KDL")]
    #[diagnostic(code(redline::config::parse))]
    Parse(#[from] kdl::KdlError),

    #[error("`{node}` expects {expected}")]
    #[diagnostic(
        code(redline::config::value),
        help("each setting is a single node with one value, e.g. `timeout-secs 30`")
    )]
    BadValue {
        node: &'static str,
        expected: &'static str,
    },
}

/// Settings for the binary, after reading the file.
#[derive(Clone, Debug, PartialEq)]
pub struct CliConfig {
    /// Base URL of an OpenAI-compatible API.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key, if the endpoint needs one.
    pub api_key_env: Option<String>,
    pub timeout_secs: u64,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log: String,
    /// Legend line; one word per error category.
    pub legend: String,
    pub proofread: ProofreadConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            timeout_secs: 60,
            log: "warn".to_string(),
            legend: DEFAULT_LEGEND.to_string(),
            proofread: ProofreadConfig::default(),
        }
    }
}

impl CliConfig {
    /// Parse a KDL document, filling unset nodes with defaults.
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let doc: KdlDocument = source.parse()?;
        let mut config = Self::default();

        if let Some(endpoint) = string_node(&doc, "endpoint")? {
            config.endpoint = endpoint.to_string();
        }
        if let Some(model) = string_node(&doc, "model")? {
            config.model = model.to_string();
        }
        if let Some(env) = string_node(&doc, "api-key-env")? {
            config.api_key_env = (!env.is_empty()).then(|| env.to_string());
        }
        if let Some(node) = doc.get("timeout-secs") {
            config.timeout_secs = first_value(node)
                .and_then(|v| v.as_i64())
                .and_then(|secs| u64::try_from(secs).ok())
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::BadValue {
                    node: "timeout-secs",
                    expected: "a positive integer",
                })?;
        }
        if let Some(log) = string_node(&doc, "log")? {
            config.log = log.to_string();
        }
        if let Some(legend) = string_node(&doc, "legend")? {
            config.legend = legend.to_string();
        }
        if let Some(format) = string_node(&doc, "format")? {
            let format = CorrectionFormat::from_name(format).ok_or(ConfigError::BadValue {
                node: "format",
                expected: "\"snippet\" or \"indexed\"",
            })?;
            config.proofread = config.proofread.with_format(format);
        }
        if let Some(template) = string_node(&doc, "prompt-template")? {
            config.proofread.prompt_template = template.to_string();
        }
        if let Some(prompt) = string_node(&doc, "system-prompt")? {
            config.proofread.system_prompt = prompt.to_string();
        }
        if let Some(node) = doc.get("languages") {
            let languages = node
                .entries()
                .iter()
                .map(|entry| entry.value().as_string().map(SmolStr::new))
                .collect::<Option<Vec<_>>>()
                .filter(|langs| !langs.is_empty())
                .ok_or(ConfigError::BadValue {
                    node: "languages",
                    expected: "one or more strings",
                })?;
            config.proofread.languages = languages;
        }

        Ok(config)
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::parse(&source)
    }

    /// The API key, read from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        let var = self.api_key_env.as_deref()?;
        std::env::var(var).ok().filter(|key| !key.is_empty())
    }
}

/// `<config dir>/redline/config.kdl`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("redline").join("config.kdl"))
}

fn first_value(node: &KdlNode) -> Option<&kdl::KdlValue> {
    node.entries().first().map(|entry| entry.value())
}

fn string_node<'a>(
    doc: &'a KdlDocument,
    name: &'static str,
) -> Result<Option<&'a str>, ConfigError> {
    let Some(node) = doc.get(name) else {
        return Ok(None);
    };
    first_value(node)
        .and_then(|v| v.as_string())
        .map(Some)
        .ok_or(ConfigError::BadValue {
            node: name,
            expected: "a string",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = CliConfig::parse("").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_parse_all_nodes() {
        let config = CliConfig::parse(
            r#"
            endpoint "https://api.example.com/v1"
            model "gpt-4o-mini"
            api-key-env "EXAMPLE_KEY"
            timeout-secs 15
            log "redline=debug"
            legend "S P C Pr M G"
            languages "en" "de"
            prompt-template "Fix: {text}"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "https://api.example.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.api_key_env.as_deref(), Some("EXAMPLE_KEY"));
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.log, "redline=debug");
        assert_eq!(config.legend, "S P C Pr M G");
        assert_eq!(
            config.proofread.languages,
            vec![SmolStr::new("en"), SmolStr::new("de")]
        );
        assert_eq!(config.proofread.user_prompt("teh"), "Fix: teh");
    }

    #[test]
    fn test_format_node() {
        let config = CliConfig::parse(r#"format "indexed""#).unwrap();
        assert_eq!(config.proofread.format, CorrectionFormat::Indexed);
        assert_eq!(
            config.proofread.system_prompt,
            CorrectionFormat::Indexed.system_prompt()
        );

        // An explicit system prompt wins over the format's default.
        let config = CliConfig::parse(
            r#"
            system-prompt "Report offsets."
            format "indexed"
            "#,
        )
        .unwrap();
        assert_eq!(config.proofread.format, CorrectionFormat::Indexed);
        assert_eq!(config.proofread.system_prompt, "Report offsets.");

        assert!(matches!(
            CliConfig::parse(r#"format "offsets""#),
            Err(ConfigError::BadValue { node: "format", .. })
        ));
    }

    #[test]
    fn test_empty_api_key_env_disables_key() {
        let config = CliConfig::parse(r#"api-key-env """#).unwrap();
        assert!(config.api_key_env.is_none());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_bad_values_are_reported() {
        assert!(matches!(
            CliConfig::parse("timeout-secs 0"),
            Err(ConfigError::BadValue {
                node: "timeout-secs",
                ..
            })
        ));
        assert!(matches!(
            CliConfig::parse("timeout-secs \"soon\""),
            Err(ConfigError::BadValue { .. })
        ));
        assert!(matches!(
            CliConfig::parse("model 4"),
            Err(ConfigError::BadValue { node: "model", .. })
        ));
        assert!(matches!(
            CliConfig::parse("languages"),
            Err(ConfigError::BadValue {
                node: "languages",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_kdl() {
        assert!(matches!(
            CliConfig::parse("endpoint \"unterminated"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = CliConfig::load(Path::new("/nonexistent/redline/config.kdl")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
