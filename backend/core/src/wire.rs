//! JSON bodies exchanged with the `analyze-image` and `translate` functions.
//!
//! Required fields default to empty so that a missing field is reported as
//! `MissingInput` (400) by the function instead of a deserialization failure.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::DetailLevel;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[serde(default)]
    pub image_base64: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_context: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_detail_level"
    )]
    pub detail_level: Option<DetailLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_analysis: Option<String>,
}

impl AnalysisRequest {
    /// Detail level to apply, falling back to `standard`.
    pub fn effective_detail_level(&self) -> DetailLevel {
        self.detail_level.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub analysis: String,
    #[serde(default)]
    pub quick_summary: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub target_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResponse {
    pub translated_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Unknown or malformed levels degrade to `standard` rather than failing the request.
fn lenient_detail_level<'de, D>(deserializer: D) -> Result<Option<DetailLevel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|value| value.parse().unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn follow_up_request_uses_camel_case_fields() {
        let req = AnalysisRequest {
            image_base64: "AAAA".into(),
            mime_type: "image/png".into(),
            user_context: Some("Quer que eu resuma?".into()),
            detail_level: Some(DetailLevel::Standard),
            previous_analysis: Some("📌 Contexto da imagem\nUma foto.".into()),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["imageBase64"], "AAAA");
        assert_eq!(value["detailLevel"], "standard");
        assert_eq!(value["previousAnalysis"], "📌 Contexto da imagem\nUma foto.");
    }

    #[test]
    fn omits_absent_optional_fields() {
        let req = AnalysisRequest {
            image_base64: "AAAA".into(),
            mime_type: "image/jpeg".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&req).unwrap();
        assert!(value.get("userContext").is_none());
        assert!(value.get("previousAnalysis").is_none());
    }

    #[test]
    fn unknown_detail_level_falls_back_to_standard() {
        let req: AnalysisRequest =
            serde_json::from_value(json!({ "imageBase64": "x", "detailLevel": "verbose" })).unwrap();
        assert_eq!(req.detail_level, Some(DetailLevel::Standard));

        let req: AnalysisRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.image_base64.is_empty());
        assert_eq!(req.effective_detail_level(), DetailLevel::Standard);
    }

    #[test]
    fn missing_quick_summary_defaults_to_empty() {
        let resp: AnalysisResponse = serde_json::from_value(json!({ "analysis": "texto" })).unwrap();
        assert_eq!(resp.quick_summary, "");
    }
}
