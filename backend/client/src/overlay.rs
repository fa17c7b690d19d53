//! Translation overlay: language-keyed translated copies of the current turn.
//!
//! Entries are only valid for the turn they were derived from; the session
//! clears the overlay whenever a new turn is committed. At most one
//! translation is in flight; starting another supersedes it, and a response
//! whose sequence number is not the pending one is dropped.

use std::collections::HashMap;

use tracing::{debug, warn};

use explica_core::{ExplicaError, TranslationEntry};

/// A translation request that has been issued but not yet committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTranslation {
    pub seq: u64,
    pub language: String,
}

/// What `begin` decided to do for a language selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Already selected (active or in flight); nothing changes.
    Unchanged,
    /// Served from the cache without a request.
    Cached,
    /// A request must be issued under this sequence number.
    Request(u64),
}

#[derive(Debug, Default)]
pub struct TranslationOverlay {
    entries: HashMap<String, TranslationEntry>,
    active: Option<String>,
    pending: Option<PendingTranslation>,
}

impl TranslationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Language whose translation is currently displayed.
    pub fn active_language(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_entry(&self) -> Option<&TranslationEntry> {
        self.active.as_ref().and_then(|lang| self.entries.get(lang))
    }

    pub fn pending(&self) -> Option<&PendingTranslation> {
        self.pending.as_ref()
    }

    /// The language the user last chose, whether committed or still in flight.
    pub fn selected_language(&self) -> Option<&str> {
        self.pending
            .as_ref()
            .map(|p| p.language.as_str())
            .or(self.active.as_deref())
    }

    pub fn cached(&self, language: &str) -> Option<&TranslationEntry> {
        self.entries.get(language)
    }

    /// Select `language`; `next_seq` is only called when a request is needed.
    pub fn begin(&mut self, language: &str, next_seq: impl FnOnce() -> u64) -> Selection {
        if self.selected_language() == Some(language) {
            return Selection::Unchanged;
        }
        if self.entries.contains_key(language) {
            self.pending = None;
            self.active = Some(language.to_string());
            return Selection::Cached;
        }
        let seq = next_seq();
        // Original-language text is shown while the new translation is in flight.
        self.active = None;
        self.pending = Some(PendingTranslation {
            seq,
            language: language.to_string(),
        });
        Selection::Request(seq)
    }

    /// Apply the outcome of the request issued under `seq`.
    ///
    /// Returns `Ok(false)` when the response is stale and was dropped. A
    /// failed primary request rolls the selection back to the original
    /// language; a failed summary request only leaves the summary untranslated.
    pub fn commit(
        &mut self,
        seq: u64,
        result: Result<String, ExplicaError>,
        summary: Option<Result<String, ExplicaError>>,
    ) -> Result<bool, ExplicaError> {
        let pending = match self.pending.take() {
            Some(p) if p.seq == seq => p,
            other => {
                debug!(seq, "Discarding stale translation response");
                self.pending = other;
                return Ok(false);
            }
        };

        let translated_result = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(language = %pending.language, error = %e, "Translation failed; showing original");
                self.active = None;
                return Err(e);
            }
        };
        let translated_summary = match summary {
            Some(Ok(text)) => Some(text),
            Some(Err(e)) => {
                warn!(language = %pending.language, error = %e, "Summary translation failed");
                None
            }
            None => None,
        };

        self.entries.insert(
            pending.language.clone(),
            TranslationEntry {
                translated_result,
                translated_summary,
            },
        );
        self.active = Some(pending.language);
        Ok(true)
    }

    /// Show the original-language text, abandoning any in-flight translation.
    pub fn show_original(&mut self) {
        self.pending = None;
        self.active = None;
    }

    /// Drop every entry and any in-flight request; used when the source text changes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.show_original();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.pending.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(start: u64) -> impl FnMut() -> u64 {
        let mut n = start;
        move || {
            n += 1;
            n
        }
    }

    #[test]
    fn commit_activates_language() {
        let mut overlay = TranslationOverlay::new();
        let mut next = counter(0);
        let Selection::Request(seq) = overlay.begin("en", &mut next) else {
            panic!("expected a request");
        };
        assert_eq!(overlay.selected_language(), Some("en"));
        assert_eq!(overlay.active_language(), None);

        assert!(overlay.commit(seq, Ok("Hello".into()), None).unwrap());
        assert_eq!(overlay.active_language(), Some("en"));
        assert_eq!(overlay.active_entry().unwrap().translated_result, "Hello");
        assert_eq!(overlay.active_entry().unwrap().translated_summary, None);
    }

    #[test]
    fn newer_selection_supersedes_in_flight_one() {
        let mut overlay = TranslationOverlay::new();
        let mut next = counter(0);
        let Selection::Request(en) = overlay.begin("en", &mut next) else { panic!() };
        let Selection::Request(fr) = overlay.begin("fr", &mut next) else { panic!() };

        assert!(overlay.commit(fr, Ok("Bonjour".into()), None).unwrap());
        assert!(!overlay.commit(en, Ok("Hello".into()), None).unwrap());
        assert_eq!(overlay.active_language(), Some("fr"));
        assert!(overlay.cached("en").is_none());
    }

    #[test]
    fn primary_failure_rolls_back_to_original() {
        let mut overlay = TranslationOverlay::new();
        let mut next = counter(0);
        let Selection::Request(seq) = overlay.begin("de", &mut next) else { panic!() };
        let err = overlay.commit(seq, Err(ExplicaError::RateLimited), None).unwrap_err();
        assert_eq!(err, ExplicaError::RateLimited);
        assert_eq!(overlay.selected_language(), None);
        assert!(overlay.is_empty());
    }

    #[test]
    fn summary_failure_is_not_fatal() {
        let mut overlay = TranslationOverlay::new();
        let mut next = counter(0);
        let Selection::Request(seq) = overlay.begin("es", &mut next) else { panic!() };
        overlay
            .commit(seq, Ok("Hola".into()), Some(Err(ExplicaError::RateLimited)))
            .unwrap();
        let entry = overlay.active_entry().unwrap();
        assert_eq!(entry.translated_result, "Hola");
        assert_eq!(entry.translated_summary, None);
    }

    #[test]
    fn cached_language_needs_no_request() {
        let mut overlay = TranslationOverlay::new();
        let mut next = counter(0);
        let Selection::Request(seq) = overlay.begin("en", &mut next) else { panic!() };
        overlay.commit(seq, Ok("Hello".into()), None).unwrap();
        overlay.show_original();

        assert_eq!(overlay.begin("en", || panic!("no request expected")), Selection::Cached);
        assert_eq!(overlay.active_language(), Some("en"));
        assert_eq!(overlay.begin("en", || panic!("no request expected")), Selection::Unchanged);
    }

    #[test]
    fn clear_discards_in_flight_response() {
        let mut overlay = TranslationOverlay::new();
        let mut next = counter(0);
        let Selection::Request(seq) = overlay.begin("en", &mut next) else { panic!() };
        overlay.clear();
        assert!(!overlay.commit(seq, Ok("Hello".into()), None).unwrap());
        assert!(overlay.is_empty());
    }
}
