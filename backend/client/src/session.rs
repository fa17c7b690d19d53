//! Conversational session state.
//!
//! `Session` is the single aggregate behind the orchestrator: user name,
//! captured image, original and current turns, and the translation overlay.
//! Network calls happen outside of it; every request is opened with a
//! `begin_*` method that hands out a sequence number and closed with the
//! matching `complete_*` method, which drops any response whose number is no
//! longer current.

use chrono::Utc;
use tracing::{debug, info, warn};

use explica_core::{
    extract_summary, AnalysisRequest, AnalysisResponse, AnalysisTurn, DetailLevel, ExplicaError,
    ImagePayload, TranslationRequest,
};

use crate::overlay::{Selection, TranslationOverlay};

/// Network-level state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoImage,
    AnalysisPending,
    AnalysisReady,
    FollowUpPending,
}

/// Screen the user should be looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Name,
    Upload,
    Result,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Upload => "upload",
            Self::Result => "result",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Initial,
    FollowUp,
}

/// An analysis or follow-up request ready to be sent.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    pub seq: u64,
    pub kind: TurnKind,
    pub request: AnalysisRequest,
}

/// A translation ready to be sent: one request for the result and, when a
/// summary exists, one for the summary. Both carry current-turn text.
#[derive(Debug, Clone)]
pub struct TranslationTicket {
    pub seq: u64,
    pub result: TranslationRequest,
    pub summary: Option<TranslationRequest>,
}

/// How a session operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The response was committed to the session.
    Applied,
    /// Nothing to do (same language already selected).
    Unchanged,
    /// A newer request or a reset superseded this one; its response was dropped.
    Discarded,
}

/// Result of selecting a translation language.
#[derive(Debug, Clone)]
pub enum TranslationStart {
    /// The language is already selected.
    Unchanged,
    /// A cached translation of the current turn was re-activated.
    Cached,
    Request(TranslationTicket),
}

/// Text to render (and copy) for the current turn, with any active
/// translation applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayView {
    pub result: String,
    pub summary: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    user_name: Option<String>,
    detail_level: DetailLevel,
    image: Option<ImagePayload>,
    original: Option<AnalysisTurn>,
    current: Option<AnalysisTurn>,
    phase: Phase,
    translations: TranslationOverlay,
    last_seq: u64,
    pending_turn: Option<u64>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Session {
    pub fn new(user_name: Option<String>) -> Self {
        Self {
            user_name: user_name.filter(|n| !n.trim().is_empty()),
            detail_level: DetailLevel::default(),
            image: None,
            original: None,
            current: None,
            phase: Phase::NoImage,
            translations: TranslationOverlay::new(),
            last_seq: 0,
            pending_turn: None,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.last_seq += 1;
        self.last_seq
    }

    // ---------------------------------------------------------------------
    // Read side
    // ---------------------------------------------------------------------

    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    pub fn detail_level(&self) -> DetailLevel {
        self.detail_level
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn step(&self) -> Step {
        if self.user_name.is_none() {
            Step::Name
        } else if self.current.is_some() {
            Step::Result
        } else {
            Step::Upload
        }
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        self.image.as_ref()
    }

    pub fn current_turn(&self) -> Option<&AnalysisTurn> {
        self.current.as_ref()
    }

    /// Result text of the first turn since the last reset.
    pub fn original_analysis(&self) -> Option<&str> {
        self.original.as_ref().map(|t| t.result_text.as_str())
    }

    pub fn translations(&self) -> &TranslationOverlay {
        &self.translations
    }

    pub fn active_language(&self) -> Option<&str> {
        self.translations.active_language()
    }

    pub fn is_busy(&self) -> bool {
        self.pending_turn.is_some()
    }

    pub fn is_translating(&self) -> bool {
        self.translations.pending().is_some()
    }

    pub fn display(&self) -> Option<DisplayView> {
        let turn = self.current.as_ref()?;
        let entry = self.translations.active_entry();
        let result = entry
            .map(|e| e.translated_result.as_str())
            .unwrap_or(&turn.result_text);
        let summary = entry
            .and_then(|e| e.translated_summary.as_deref())
            .unwrap_or(&turn.quick_summary);
        Some(DisplayView {
            result: result.to_string(),
            summary: (!summary.is_empty()).then(|| summary.to_string()),
            language: entry
                .and(self.translations.active_language())
                .map(str::to_string),
        })
    }

    // ---------------------------------------------------------------------
    // Name and preferences
    // ---------------------------------------------------------------------

    /// Record the display name; returns the trimmed value.
    pub fn set_user_name(&mut self, name: &str) -> Result<String, ExplicaError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ExplicaError::MissingInput("Informe seu nome para continuar".into()));
        }
        self.user_name = Some(name.to_string());
        Ok(name.to_string())
    }

    pub fn set_detail_level(&mut self, level: DetailLevel) {
        self.detail_level = level;
    }

    // ---------------------------------------------------------------------
    // Turns
    // ---------------------------------------------------------------------

    /// Start the first analysis of a new image.
    pub fn begin_analysis(
        &mut self,
        image: ImagePayload,
        context: Option<&str>,
        level: Option<DetailLevel>,
    ) -> Result<TurnTicket, ExplicaError> {
        if self.pending_turn.is_some() {
            return Err(ExplicaError::Busy);
        }
        if self.current.is_some() {
            return Err(ExplicaError::SessionPrecondition(
                "Inicie uma nova análise antes de enviar outra imagem".into(),
            ));
        }
        if let Some(level) = level {
            self.detail_level = level;
        }
        let request = AnalysisRequest {
            image_base64: image.to_base64(),
            mime_type: image.mime_type().to_string(),
            user_context: normalize(context),
            detail_level: Some(self.detail_level),
            previous_analysis: None,
        };
        self.image = Some(image);
        Ok(self.open_turn(TurnKind::Initial, request))
    }

    /// Re-run the first analysis with the image retained after a failure.
    pub fn begin_retry(&mut self, context: Option<&str>) -> Result<TurnTicket, ExplicaError> {
        let image = self.image.clone().ok_or_else(|| {
            ExplicaError::SessionPrecondition("Nenhuma imagem para analisar novamente".into())
        })?;
        self.begin_analysis(image, context, None)
    }

    /// Ask a follow-up question about the current image and analysis.
    pub fn begin_follow_up(&mut self, question: &str) -> Result<TurnTicket, ExplicaError> {
        if self.pending_turn.is_some() {
            return Err(ExplicaError::Busy);
        }
        let question = normalize(Some(question))
            .ok_or_else(|| ExplicaError::MissingInput("Digite uma pergunta".into()))?;
        let image = self.image.as_ref().ok_or_else(|| {
            ExplicaError::SessionPrecondition("Imagem não disponível para análise adicional".into())
        })?;
        let current = self.current.as_ref().ok_or_else(|| {
            ExplicaError::SessionPrecondition("Nenhuma análise disponível para continuar".into())
        })?;
        let request = AnalysisRequest {
            image_base64: image.to_base64(),
            mime_type: image.mime_type().to_string(),
            user_context: Some(question),
            detail_level: Some(self.detail_level),
            previous_analysis: Some(current.result_text.clone()),
        };
        Ok(self.open_turn(TurnKind::FollowUp, request))
    }

    fn open_turn(&mut self, kind: TurnKind, request: AnalysisRequest) -> TurnTicket {
        let seq = self.next_seq();
        self.pending_turn = Some(seq);
        self.phase = match kind {
            TurnKind::Initial => Phase::AnalysisPending,
            TurnKind::FollowUp => Phase::FollowUpPending,
        };
        debug!(seq, kind = ?kind, "Opened analysis turn");
        TurnTicket { seq, kind, request }
    }

    /// Apply the response for `ticket`. Failures leave the previous turn in place.
    pub fn complete_turn(
        &mut self,
        ticket: &TurnTicket,
        response: Result<AnalysisResponse, ExplicaError>,
    ) -> Result<Outcome, ExplicaError> {
        if self.pending_turn != Some(ticket.seq) {
            debug!(seq = ticket.seq, "Discarding stale analysis response");
            return Ok(Outcome::Discarded);
        }
        self.pending_turn = None;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.phase = if self.current.is_some() {
                    Phase::AnalysisReady
                } else {
                    Phase::NoImage
                };
                warn!(seq = ticket.seq, error = %e, "Analysis turn failed");
                return Err(e);
            }
        };

        let quick_summary = if response.quick_summary.is_empty() {
            extract_summary(&response.analysis)
        } else {
            response.quick_summary
        };
        let turn = AnalysisTurn {
            request_context: ticket.request.user_context.clone(),
            previous_analysis: ticket.request.previous_analysis.clone(),
            result_text: response.analysis,
            quick_summary,
            detail_level: ticket.request.effective_detail_level(),
            completed_at: Utc::now(),
        };
        if ticket.kind == TurnKind::Initial {
            self.original = Some(turn.clone());
        }
        self.current = Some(turn);
        self.translations.clear();
        self.phase = Phase::AnalysisReady;
        info!(seq = ticket.seq, kind = ?ticket.kind, "Analysis turn committed");
        Ok(Outcome::Applied)
    }

    // ---------------------------------------------------------------------
    // Translation
    // ---------------------------------------------------------------------

    /// Select a translation language, always sourcing from the current turn.
    pub fn begin_translation(&mut self, language: &str) -> Result<TranslationStart, ExplicaError> {
        let language = language.trim();
        if language.is_empty() {
            return Err(ExplicaError::MissingInput("Escolha um idioma".into()));
        }
        let (result_text, summary) = match &self.current {
            Some(turn) => (
                turn.result_text.clone(),
                turn.has_summary().then(|| turn.quick_summary.clone()),
            ),
            None => {
                return Err(ExplicaError::SessionPrecondition(
                    "Nenhuma análise disponível para traduzir".into(),
                ))
            }
        };

        let last_seq = &mut self.last_seq;
        let selection = self.translations.begin(language, || {
            *last_seq += 1;
            *last_seq
        });
        match selection {
            Selection::Unchanged => Ok(TranslationStart::Unchanged),
            Selection::Cached => Ok(TranslationStart::Cached),
            Selection::Request(seq) => Ok(TranslationStart::Request(TranslationTicket {
                seq,
                result: TranslationRequest {
                    text: result_text,
                    target_language: language.to_string(),
                },
                summary: summary.map(|text| TranslationRequest {
                    text,
                    target_language: language.to_string(),
                }),
            })),
        }
    }

    pub fn complete_translation(
        &mut self,
        ticket: &TranslationTicket,
        result: Result<String, ExplicaError>,
        summary: Option<Result<String, ExplicaError>>,
    ) -> Result<Outcome, ExplicaError> {
        match self.translations.commit(ticket.seq, result, summary)? {
            true => Ok(Outcome::Applied),
            false => Ok(Outcome::Discarded),
        }
    }

    pub fn show_original(&mut self) {
        self.translations.show_original();
    }

    /// Back to the upload screen. The name and detail level survive; any
    /// in-flight response is dropped when it arrives.
    pub fn reset(&mut self) {
        self.image = None;
        self.original = None;
        self.current = None;
        self.translations.clear();
        self.pending_turn = None;
        self.phase = Phase::NoImage;
        info!("Session reset");
    }
}

fn normalize(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
