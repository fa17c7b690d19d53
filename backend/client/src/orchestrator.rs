//! Drives a `Session` against the backend functions.
//!
//! The session lock is only held to open or close a request, never across a
//! network call. Completion goes through the session's sequence check, so a
//! response that arrives after a newer request or a reset is dropped.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use explica_core::{AnalysisTurn, DetailLevel, ExplicaError, ImagePayload};

use crate::backend::FunctionsBackend;
use crate::session::{
    DisplayView, Outcome, Phase, Session, Step, TranslationStart, TranslationTicket, TurnTicket,
};
use crate::store::{KeyValueStore, USERNAME_KEY};

/// Follow-up prompts offered under a result.
pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "Quer que eu resuma?",
    "Quer entender o impacto disso?",
    "Quer saber o que fazer agora?",
];

pub struct Orchestrator {
    backend: Arc<dyn FunctionsBackend>,
    store: Arc<dyn KeyValueStore>,
    session: Mutex<Session>,
}

impl Orchestrator {
    /// Start a session, restoring the saved display name if there is one.
    pub async fn open(backend: Arc<dyn FunctionsBackend>, store: Arc<dyn KeyValueStore>) -> Self {
        let user_name = match store.get(USERNAME_KEY).await {
            Ok(name) => name,
            Err(e) => {
                warn!(error = %e, "Failed to load saved name");
                None
            }
        };
        let session = Session::new(user_name);
        info!(step = session.step().as_str(), "Session opened");
        Self {
            backend,
            store,
            session: Mutex::new(session),
        }
    }

    pub async fn submit_name(&self, name: &str) -> Result<Step, ExplicaError> {
        let (name, step) = {
            let mut session = self.session.lock().await;
            let name = session.set_user_name(name)?;
            (name, session.step())
        };
        // The name stays usable for this session even if it cannot be saved.
        if let Err(e) = self.store.set(USERNAME_KEY, &name).await {
            warn!(error = %e, "Failed to save name");
        }
        Ok(step)
    }

    pub async fn set_detail_level(&self, level: DetailLevel) {
        self.session.lock().await.set_detail_level(level);
    }

    #[instrument(skip(self, image, context), fields(mime_type = %image.mime_type(), bytes = image.len()))]
    pub async fn analyze(
        &self,
        image: ImagePayload,
        context: Option<&str>,
        level: Option<DetailLevel>,
    ) -> Result<Outcome, ExplicaError> {
        let ticket = self.session.lock().await.begin_analysis(image, context, level)?;
        self.run_turn(ticket).await
    }

    /// Analyse the retained image again after a failed first analysis.
    pub async fn retry(&self, context: Option<&str>) -> Result<Outcome, ExplicaError> {
        let ticket = self.session.lock().await.begin_retry(context)?;
        self.run_turn(ticket).await
    }

    #[instrument(skip(self))]
    pub async fn follow_up(&self, question: &str) -> Result<Outcome, ExplicaError> {
        let ticket = self.session.lock().await.begin_follow_up(question)?;
        self.run_turn(ticket).await
    }

    async fn run_turn(&self, ticket: TurnTicket) -> Result<Outcome, ExplicaError> {
        let response = self.backend.analyze(ticket.request.clone()).await;
        self.session.lock().await.complete_turn(&ticket, response)
    }

    #[instrument(skip(self))]
    pub async fn translate(&self, language: &str) -> Result<Outcome, ExplicaError> {
        let start = self.session.lock().await.begin_translation(language)?;
        let ticket = match start {
            TranslationStart::Unchanged => return Ok(Outcome::Unchanged),
            TranslationStart::Cached => return Ok(Outcome::Applied),
            TranslationStart::Request(ticket) => ticket,
        };
        let (result, summary) = self.request_translation(&ticket).await;
        self.session
            .lock()
            .await
            .complete_translation(&ticket, result, summary)
    }

    /// Result and summary are requested together; the summary is best-effort.
    async fn request_translation(
        &self,
        ticket: &TranslationTicket,
    ) -> (
        Result<String, ExplicaError>,
        Option<Result<String, ExplicaError>>,
    ) {
        let (result, summary) = match &ticket.summary {
            Some(summary) => {
                let (result, summary) = tokio::join!(
                    self.backend.translate(ticket.result.clone()),
                    self.backend.translate(summary.clone())
                );
                (result, Some(summary))
            }
            None => (self.backend.translate(ticket.result.clone()).await, None),
        };
        (
            result.map(|r| r.translated_text),
            summary.map(|s| s.map(|r| r.translated_text)),
        )
    }

    pub async fn show_original(&self) {
        self.session.lock().await.show_original();
    }

    pub async fn reset(&self) {
        self.session.lock().await.reset();
    }

    // ---------------------------------------------------------------------
    // Read side
    // ---------------------------------------------------------------------

    pub async fn step(&self) -> Step {
        self.session.lock().await.step()
    }

    pub async fn phase(&self) -> Phase {
        self.session.lock().await.phase()
    }

    pub async fn user_name(&self) -> Option<String> {
        self.session.lock().await.user_name().map(str::to_string)
    }

    pub async fn detail_level(&self) -> DetailLevel {
        self.session.lock().await.detail_level()
    }

    pub async fn display(&self) -> Option<DisplayView> {
        self.session.lock().await.display()
    }

    pub async fn current_turn(&self) -> Option<AnalysisTurn> {
        self.session.lock().await.current_turn().cloned()
    }

    pub async fn original_analysis(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .original_analysis()
            .map(str::to_string)
    }

    pub async fn active_language(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .active_language()
            .map(str::to_string)
    }

    pub async fn is_busy(&self) -> bool {
        self.session.lock().await.is_busy()
    }

    pub async fn is_translating(&self) -> bool {
        self.session.lock().await.is_translating()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::ScriptedBackend;

    const ANALYSIS: &str = "📌 Contexto da imagem
Fatura de energia elétrica. O valor total é R$ 230,00. O vencimento é dia 10.

📝 Texto identificado na imagem (OCR)
\"Total a pagar: R$ 230,00\"

📖 Explicação e interpretação
A conta mostra o consumo do mês e o valor a pagar.

💡 Possíveis usos ou aplicações
Não aplicável para esta imagem.

⚠️ Observações relevantes
Nenhuma observação adicional.

🔎 Fontes ou referências
Explicação baseada em conhecimento conceitual.";

    const FOLLOW_UP: &str = "📌 Contexto da imagem
Resumo da fatura. Pagar R$ 230,00 até dia 10.

📝 Texto identificado na imagem (OCR)
Nenhum texto identificado na imagem.";

    const NO_CONTEXT: &str = "A imagem mostra uma fatura sem seções.";

    fn image() -> ImagePayload {
        ImagePayload::new(b"\x89PNG fake".to_vec(), "image/png").unwrap()
    }

    async fn orchestrator(backend: &Arc<ScriptedBackend>) -> Arc<Orchestrator> {
        let store = Arc::new(MemoryStore::new());
        store.set(USERNAME_KEY, "Ana").await.unwrap();
        Arc::new(Orchestrator::open(backend.clone(), store).await)
    }

    async fn with_result(backend: &Arc<ScriptedBackend>, analysis: &str) -> Arc<Orchestrator> {
        let orch = orchestrator(backend).await;
        backend.push_analysis(analysis);
        orch.analyze(image(), None, None).await.unwrap();
        orch
    }

    #[tokio::test]
    async fn open_without_saved_name_starts_at_name_step() {
        let store = Arc::new(MemoryStore::new());
        let orch = Orchestrator::open(ScriptedBackend::new(), store.clone()).await;
        assert_eq!(orch.step().await, Step::Name);

        assert!(orch.submit_name("  ").await.is_err());
        assert_eq!(orch.submit_name(" Ana ").await.unwrap(), Step::Upload);
        assert_eq!(store.get(USERNAME_KEY).await.unwrap().as_deref(), Some("Ana"));

        let reopened = Orchestrator::open(ScriptedBackend::new(), store).await;
        assert_eq!(reopened.step().await, Step::Upload);
        assert_eq!(reopened.user_name().await.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn scenario_a_first_analysis_reaches_result() {
        let backend = ScriptedBackend::new();
        let orch = orchestrator(&backend).await;
        assert_eq!(orch.step().await, Step::Upload);

        backend.push_analysis(ANALYSIS);
        let outcome = orch.analyze(image(), None, Some(DetailLevel::Standard)).await;
        assert_eq!(outcome.unwrap(), Outcome::Applied);

        let sent = &backend.analysis_requests()[0];
        assert_eq!(sent.mime_type, "image/png");
        assert_eq!(sent.user_context, None);
        assert_eq!(sent.previous_analysis, None);
        assert_eq!(sent.detail_level, Some(DetailLevel::Standard));

        let turn = orch.current_turn().await.unwrap();
        assert_eq!(turn.quick_summary, "Fatura de energia elétrica. O valor total é R$ 230,00.");
        assert_eq!(orch.step().await, Step::Result);
        assert_eq!(orch.phase().await, Phase::AnalysisReady);
        assert_eq!(orch.original_analysis().await.as_deref(), Some(ANALYSIS));
    }

    #[tokio::test]
    async fn scenario_b_follow_up_carries_previous_analysis_and_clears_translations() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;
        orch.translate("en").await.unwrap();
        assert_eq!(orch.active_language().await.as_deref(), Some("en"));

        backend.push_analysis(FOLLOW_UP);
        let outcome = orch.follow_up(SUGGESTED_QUESTIONS[0]).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);

        let sent = &backend.analysis_requests()[1];
        assert_eq!(sent.previous_analysis.as_deref(), Some(ANALYSIS));
        assert_eq!(sent.user_context.as_deref(), Some("Quer que eu resuma?"));

        let view = orch.display().await.unwrap();
        assert_eq!(view.result, FOLLOW_UP);
        assert_eq!(view.summary.as_deref(), Some("Resumo da fatura. Pagar R$ 230,00 até dia 10."));
        assert_eq!(view.language, None);
        assert_eq!(orch.active_language().await, None);
        assert_eq!(orch.original_analysis().await.as_deref(), Some(ANALYSIS));
    }

    #[tokio::test]
    async fn scenario_c_empty_summary_sends_one_translation() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, NO_CONTEXT).await;
        assert_eq!(orch.current_turn().await.unwrap().quick_summary, "");

        assert_eq!(orch.translate("es").await.unwrap(), Outcome::Applied);
        assert_eq!(backend.translation_requests().len(), 1);

        let view = orch.display().await.unwrap();
        assert_eq!(view.result, format!("[es] {NO_CONTEXT}"));
        assert_eq!(view.summary, None);
        assert_eq!(view.language.as_deref(), Some("es"));
    }

    #[tokio::test]
    async fn scenario_d_rate_limited_translation_rolls_back() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;
        backend.fail_translations("de", ExplicaError::RateLimited);

        let err = orch.translate("de").await.unwrap_err();
        assert_eq!(err, ExplicaError::RateLimited);
        assert_eq!(orch.active_language().await, None);
        assert!(!orch.is_translating().await);

        let view = orch.display().await.unwrap();
        assert_eq!(view.result, ANALYSIS);
        assert_eq!(orch.current_turn().await.unwrap().result_text, ANALYSIS);
    }

    #[tokio::test]
    async fn translation_always_sources_current_turn_text() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;

        orch.translate("en").await.unwrap();
        orch.translate("fr").await.unwrap();
        orch.show_original().await;
        orch.translate("de").await.unwrap();

        let requests = backend.translation_requests();
        assert_eq!(requests.len(), 6);
        let summary = "Fatura de energia elétrica. O valor total é R$ 230,00.";
        for request in &requests {
            assert!(request.text == ANALYSIS || request.text == summary, "{}", request.text);
        }
        assert_eq!(requests.iter().filter(|r| r.text == ANALYSIS).count(), 3);
    }

    #[tokio::test]
    async fn cached_language_is_reactivated_without_request() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;

        orch.translate("en").await.unwrap();
        orch.translate("fr").await.unwrap();
        assert_eq!(orch.translate("en").await.unwrap(), Outcome::Applied);

        assert_eq!(backend.translations_for("en"), 2);
        assert_eq!(orch.active_language().await.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn same_language_is_a_no_op() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;
        orch.translate("en").await.unwrap();
        let before = orch.display().await;

        assert_eq!(orch.translate("en").await.unwrap(), Outcome::Unchanged);
        assert_eq!(backend.translation_requests().len(), 2);
        assert_eq!(orch.display().await, before);
    }

    #[tokio::test]
    async fn stale_translation_is_discarded() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;
        backend.hold("en");

        let pending = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.translate("en").await })
        };
        while backend.translations_for("en") < 2 {
            tokio::task::yield_now().await;
        }
        assert!(orch.is_translating().await);

        assert_eq!(orch.translate("fr").await.unwrap(), Outcome::Applied);
        backend.release("en");

        assert_eq!(pending.await.unwrap().unwrap(), Outcome::Discarded);
        assert_eq!(orch.active_language().await.as_deref(), Some("fr"));
        assert!(orch.display().await.unwrap().result.starts_with("[fr] "));
    }

    #[tokio::test]
    async fn follow_up_supersedes_in_flight_translation() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;
        backend.hold("en");
        let pending = {
            let orch = orch.clone();
            tokio::spawn(async move { orch.translate("en").await })
        };
        while backend.translations_for("en") < 2 {
            tokio::task::yield_now().await;
        }

        backend.push_analysis(FOLLOW_UP);
        assert_eq!(orch.follow_up("E agora?").await.unwrap(), Outcome::Applied);
        assert!(!orch.is_translating().await);

        backend.release("en");
        assert_eq!(pending.await.unwrap().unwrap(), Outcome::Discarded);
        assert_eq!(orch.active_language().await, None);
        assert_eq!(orch.display().await.unwrap().result, FOLLOW_UP);
    }

    #[tokio::test]
    async fn failed_first_analysis_can_be_retried() {
        let backend = ScriptedBackend::new();
        let orch = orchestrator(&backend).await;
        backend.push_analysis_error(ExplicaError::QuotaExhausted);

        let err = orch.analyze(image(), Some("o que é isso?"), None).await.unwrap_err();
        assert_eq!(err, ExplicaError::QuotaExhausted);
        assert_eq!(orch.phase().await, Phase::NoImage);
        assert_eq!(orch.step().await, Step::Upload);
        assert!(!orch.is_busy().await);

        backend.push_analysis(ANALYSIS);
        assert_eq!(orch.retry(Some("o que é isso?")).await.unwrap(), Outcome::Applied);
        let requests = backend.analysis_requests();
        assert_eq!(requests[0].image_base64, requests[1].image_base64);
        assert_eq!(orch.step().await, Step::Result);
    }

    #[tokio::test]
    async fn follow_up_without_image_sends_nothing() {
        let backend = ScriptedBackend::new();
        let orch = orchestrator(&backend).await;
        let err = orch.follow_up("Quer saber o que fazer agora?").await.unwrap_err();
        assert!(matches!(err, ExplicaError::SessionPrecondition(_)));
        assert!(backend.analysis_requests().is_empty());
    }

    #[tokio::test]
    async fn reset_returns_to_upload_and_keeps_preferences() {
        let backend = ScriptedBackend::new();
        let orch = with_result(&backend, ANALYSIS).await;
        orch.set_detail_level(DetailLevel::Detailed).await;
        orch.translate("en").await.unwrap();

        orch.reset().await;
        assert_eq!(orch.step().await, Step::Upload);
        assert_eq!(orch.phase().await, Phase::NoImage);
        assert_eq!(orch.display().await, None);
        assert_eq!(orch.active_language().await, None);
        assert_eq!(orch.detail_level().await, DetailLevel::Detailed);
        assert_eq!(orch.user_name().await.as_deref(), Some("Ana"));

        let err = orch.translate("en").await.unwrap_err();
        assert!(matches!(err, ExplicaError::SessionPrecondition(_)));
    }
}
