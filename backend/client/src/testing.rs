//! Scripted backend for orchestrator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use explica_core::{
    AnalysisRequest, AnalysisResponse, ExplicaError, TranslationRequest, TranslationResponse,
};

use crate::backend::FunctionsBackend;

/// Answers analyses from a queue and translations as `[lang] text`.
///
/// A language can be gated: its translations block until `release` is called,
/// which lets a test hold one response while another completes.
#[derive(Default)]
pub struct ScriptedBackend {
    analyses: Mutex<VecDeque<Result<AnalysisResponse, ExplicaError>>>,
    translation_failures: Mutex<HashMap<String, ExplicaError>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    analysis_requests: Mutex<Vec<AnalysisRequest>>,
    translation_requests: Mutex<Vec<TranslationRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_analysis(&self, analysis: &str) {
        self.analyses.lock().unwrap().push_back(Ok(AnalysisResponse {
            analysis: analysis.to_string(),
            quick_summary: String::new(),
        }));
    }

    pub fn push_analysis_error(&self, error: ExplicaError) {
        self.analyses.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_translations(&self, language: &str, error: ExplicaError) {
        self.translation_failures
            .lock()
            .unwrap()
            .insert(language.to_string(), error);
    }

    pub fn hold(&self, language: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(language.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, language: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(language) {
            gate.add_permits(1);
        }
    }

    pub fn analysis_requests(&self) -> Vec<AnalysisRequest> {
        self.analysis_requests.lock().unwrap().clone()
    }

    pub fn translation_requests(&self) -> Vec<TranslationRequest> {
        self.translation_requests.lock().unwrap().clone()
    }

    pub fn translations_for(&self, language: &str) -> usize {
        self.translation_requests()
            .iter()
            .filter(|r| r.target_language == language)
            .count()
    }
}

#[async_trait]
impl FunctionsBackend for ScriptedBackend {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResponse, ExplicaError> {
        self.analysis_requests.lock().unwrap().push(request);
        self.analyses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ExplicaError::UpstreamFailure("no scripted analysis".into())))
    }

    async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, ExplicaError> {
        self.translation_requests.lock().unwrap().push(request.clone());

        let gate = self
            .gates
            .lock()
            .unwrap()
            .get(&request.target_language)
            .cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        if let Some(error) = self
            .translation_failures
            .lock()
            .unwrap()
            .get(&request.target_language)
        {
            return Err(error.clone());
        }
        Ok(TranslationResponse {
            translated_text: format!("[{}] {}", request.target_language, request.text),
        })
    }
}
