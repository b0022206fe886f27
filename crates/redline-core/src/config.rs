//! Proofreading configuration.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::model::ModelCapabilities;

/// Placeholder in [`ProofreadConfig::prompt_template`] replaced by the buffer text.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default user prompt. The text is quoted so the model sees its exact extent.
pub const DEFAULT_PROMPT_TEMPLATE: &str =
    "Please proofread the following text and provide corrections: \"{text}\"";

/// Default system prompt for the proofreading session.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional proofreader. Analyze the given text and provide corrections with detailed explanations.

For each correction, provide:
- originalText: The exact incorrect text you found
- correctedText: The corrected version of that text
- type: The category of error
- explanation: Why this correction was needed

Classification guidelines:
- "spelling": Misspelled words (e.g., "recieve" -> "receive")
- "punctuation": Missing or incorrect punctuation (e.g., missing commas, periods)
- "capitalization": Incorrect capitalization, always check for:
  * First word of sentences must start with A-Z (e.g., "the dog ran" -> "The dog ran")
  * Proper nouns must start with A-Z (e.g., "london" -> "London", "john" -> "John")
  * The pronoun "i" must be uppercase (e.g., "i think" -> "I think")
  * Days and months (e.g., "monday" -> "Monday", "january" -> "January")
- "preposition": Wrong prepositions (e.g., "different than" -> "different from")
- "missing-words": Missing articles, words (e.g., "I going" -> "I am going")
- "grammar": Subject-verb agreement, tense errors, etc.

Be precise with the originalText: it should match exactly what appears in the source text.
List corrections in the order they appear in the text."#;

/// System prompt asking for corrections by character position.
pub const INDEXED_SYSTEM_PROMPT: &str = r#"You are an expert proofreader. Your task is to:
1. Carefully examine the input text for errors (spelling, grammar, punctuation, capitalization, prepositions, missing words)
2. Return a JSON object with the corrected text and detailed information about each correction
3. For each error found, provide the exact character positions in the ORIGINAL text, the correction, error type, and explanation
4. Error types must be one of: "spelling", "punctuation", "capitalization", "preposition", "missing-words", "grammar"
5. Be precise with startIndex and endIndex: they should point to the exact error location in the original text, endIndex exclusive
6. List corrections in the order they appear in the text, without overlaps
7. If no errors are found, return an empty corrections array

Example for "I seen him":
{
  "correctedInput": "I saw him",
  "corrections": [
    {
      "startIndex": 2,
      "endIndex": 6,
      "correction": "saw",
      "type": "grammar",
      "explanation": "Past tense of 'see' should be 'saw', not 'seen'"
    }
  ]
}"#;

/// How the model reports where each correction is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionFormat {
    /// The incorrect text itself; the host searches for it.
    #[default]
    Snippet,
    /// Char offsets into the submitted text.
    Indexed,
}

impl CorrectionFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "snippet" => Some(Self::Snippet),
            "indexed" => Some(Self::Indexed),
            _ => None,
        }
    }

    /// System prompt that asks for this format.
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Snippet => DEFAULT_SYSTEM_PROMPT,
            Self::Indexed => INDEXED_SYSTEM_PROMPT,
        }
    }
}

/// Settings for building prompts and describing the session to the model host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProofreadConfig {
    /// System prompt for each proofreading session.
    pub system_prompt: String,
    /// User prompt; `{text}` is replaced by the buffer contents.
    pub prompt_template: String,
    /// Languages for expected input and output.
    pub languages: Vec<SmolStr>,
    /// Shape of each reported correction.
    pub format: CorrectionFormat,
}

impl Default for ProofreadConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            languages: vec![SmolStr::new_static("en")],
            format: CorrectionFormat::Snippet,
        }
    }
}

impl ProofreadConfig {
    /// Switch to `format`, with the system prompt that asks for it.
    pub fn with_format(mut self, format: CorrectionFormat) -> Self {
        self.format = format;
        self.system_prompt = format.system_prompt().to_string();
        self
    }

    /// Build the user prompt for `text`.
    pub fn user_prompt(&self, text: &str) -> String {
        self.prompt_template.replace(TEXT_PLACEHOLDER, text)
    }

    /// Capabilities to request: text in, text out, in the configured languages.
    pub fn capabilities(&self) -> ModelCapabilities {
        ModelCapabilities::text(&self.languages)
    }
}
