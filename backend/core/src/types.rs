use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ExplicaError;

/// Raw image bytes plus MIME type, captured once per upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Bytes,
    mime_type: String,
}

impl ImagePayload {
    /// Accepts only non-empty `image/*` payloads.
    pub fn new(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Result<Self, ExplicaError> {
        let bytes = bytes.into();
        let mime_type = mime_type.into();
        if bytes.is_empty() {
            return Err(ExplicaError::MissingInput("Nenhuma imagem fornecida".into()));
        }
        if !mime_type.starts_with("image/") {
            return Err(ExplicaError::MissingInput(format!(
                "Arquivo não é uma imagem ({mime_type})"
            )));
        }
        Ok(Self { bytes, mime_type })
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// Expected verbosity of each section of the analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Short,
    #[default]
    Standard,
    Detailed,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [Self::Short, Self::Standard, Self::Detailed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Standard => "standard",
            Self::Detailed => "detailed",
        }
    }

    /// Label shown next to the selector.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Short => "Curto",
            Self::Standard => "Padrão",
            Self::Detailed => "Detalhado",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "standard" => Ok(Self::Standard),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!("unknown detail level: {other}")),
        }
    }
}

/// A translation target offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub label: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "pt", label: "Português" },
    Language { code: "en", label: "English" },
    Language { code: "es", label: "Español" },
    Language { code: "fr", label: "Français" },
    Language { code: "de", label: "Deutsch" },
];

/// Display name for a language code, if it is one of the known targets.
pub fn language_label(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| lang.code.eq_ignore_ascii_case(code))
        .map(|lang| lang.label)
}

/// One request/response exchange that produced or updated the analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTurn {
    pub request_context: Option<String>,
    pub previous_analysis: Option<String>,
    pub result_text: String,
    /// Empty when the response carried no parsable Context section.
    pub quick_summary: String,
    pub detail_level: DetailLevel,
    pub completed_at: DateTime<Utc>,
}

impl AnalysisTurn {
    pub fn has_summary(&self) -> bool {
        !self.quick_summary.is_empty()
    }

    pub fn is_follow_up(&self) -> bool {
        self.previous_analysis.is_some()
    }
}

/// Translated copy of one turn's text and summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub translated_result: String,
    /// `None` when there was no summary or its translation failed.
    pub translated_summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_image_payloads() {
        assert!(matches!(
            ImagePayload::new(Vec::new(), "image/png"),
            Err(ExplicaError::MissingInput(_))
        ));
        assert!(matches!(
            ImagePayload::new(vec![1, 2, 3], "application/pdf"),
            Err(ExplicaError::MissingInput(_))
        ));
    }

    #[test]
    fn encodes_payload_as_base64() {
        let image = ImagePayload::new(b"abc".to_vec(), "image/png").unwrap();
        assert_eq!(image.to_base64(), "YWJj");
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn detail_level_defaults_to_standard() {
        assert_eq!(DetailLevel::default(), DetailLevel::Standard);
        assert_eq!("Detailed".parse::<DetailLevel>(), Ok(DetailLevel::Detailed));
        assert!("verbose".parse::<DetailLevel>().is_err());
        assert_eq!(serde_json::to_string(&DetailLevel::Short).unwrap(), "\"short\"");
    }

    #[test]
    fn knows_language_labels() {
        assert_eq!(language_label("fr"), Some("Français"));
        assert_eq!(language_label("it"), None);
    }
}
