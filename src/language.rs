use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Translation targets the tutor knows how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "id")]
    Indonesian,
    /// Hindi written in Latin script, mixed with English
    #[serde(rename = "hi-Latn")]
    Hinglish,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::English,
        Language::Hindi,
        Language::Arabic,
        Language::Indonesian,
        Language::Hinglish,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Arabic => "ar",
            Language::Indonesian => "id",
            Language::Hinglish => "hi-Latn",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Arabic => "Arabic",
            Language::Indonesian => "Indonesian",
            Language::Hinglish => "Hinglish",
        }
    }

    /// Phrase appended to generation prompts to pick the output language.
    pub fn instruction(self) -> &'static str {
        match self {
            Language::English => "in English",
            Language::Hindi => "in Hindi using Devanagari script",
            Language::Hinglish => "in Hinglish (mix of Hindi in Roman script and English)",
            Language::Arabic => "in Arabic",
            Language::Indonesian => "in Indonesian",
        }
    }

    /// Unknown codes fall back to English.
    pub fn from_code_lenient(code: &str) -> Self {
        code.parse().unwrap_or_default()
    }

    pub fn is_english(self) -> bool {
        self == Language::English
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
