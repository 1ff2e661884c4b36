//! Model fallback policy
//!
//! Candidate ordering and the sequential "first stream that opens wins"
//! retry loop, kept free of any network code.

use std::future::Future;
use tracing::{info, warn};

/// Ordered candidate list: requested (or default) model first, then the
/// fallback list without duplicates
pub fn candidate_models(requested: Option<&str>, default_model: &str, fallback: &[String]) -> Vec<String> {
    let first = requested.filter(|m| !m.is_empty()).unwrap_or(default_model);

    let mut candidates = vec![first.to_string()];
    for model in fallback {
        if !candidates.iter().any(|c| c == model) {
            candidates.push(model.clone());
        }
    }

    candidates
}

/// One failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt<E> {
    pub model: String,
    pub error: E,
}

/// Every candidate failed
///
/// The most recent failure decides how the caller reports it; earlier
/// failures are carried along for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exhausted<E> {
    pub attempts: Vec<FailedAttempt<E>>,
}

impl<E> Exhausted<E> {
    /// Last failure seen, `None` only when there were no candidates
    pub fn last(&self) -> Option<&FailedAttempt<E>> {
        self.attempts.last()
    }
}

/// Result of a successful attempt
#[derive(Debug)]
pub struct Opened<T> {
    pub model: String,
    pub value: T,
    /// Candidates that failed before this one
    pub skipped: usize,
}

/// Try each candidate in order, returning the first that opens
///
/// Attempts are strictly sequential: attempt N+1 starts only after attempt N
/// has failed. Remaining candidates are never tried after a success.
pub async fn first_available<T, E, F, Fut>(candidates: &[String], mut attempt: F) -> Result<Opened<T>, Exhausted<E>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempts = Vec::new();

    for model in candidates {
        info!("Attempting to use model: {}", model);
        match attempt(model.clone()).await {
            Ok(value) => {
                return Ok(Opened {
                    model: model.clone(),
                    value,
                    skipped: attempts.len(),
                });
            }
            Err(error) => {
                warn!("Model {} failed: {}", model, error);
                attempts.push(FailedAttempt {
                    model: model.clone(),
                    error,
                });
            }
        }
    }

    Err(Exhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> Vec<String> {
        vec![
            "google/gemini-3-flash".to_string(),
            "google/gemini-3-pro".to_string(),
            "google/gemini-2.5-flash".to_string(),
        ]
    }

    #[test]
    fn test_requested_model_goes_first() {
        for requested in fallback() {
            let candidates = candidate_models(Some(&requested), "google/gemini-3-flash", &fallback());

            assert_eq!(candidates[0], requested);
            assert_eq!(candidates.len(), 3);
            let mut deduped = candidates.clone();
            deduped.sort();
            deduped.dedup();
            assert_eq!(deduped.len(), candidates.len());
        }
    }

    #[test]
    fn test_preserves_fallback_order() {
        let candidates = candidate_models(Some("google/gemini-3-pro"), "google/gemini-3-flash", &fallback());
        assert_eq!(candidates, vec![
            "google/gemini-3-pro",
            "google/gemini-3-flash",
            "google/gemini-2.5-flash",
        ]);
    }

    #[test]
    fn test_unknown_model_is_prepended() {
        let candidates = candidate_models(Some("openai/gpt-4o"), "google/gemini-3-flash", &fallback());
        assert_eq!(candidates.len(), 4);
        assert_eq!(candidates[0], "openai/gpt-4o");
        assert_eq!(&candidates[1..], fallback().as_slice());
    }

    #[test]
    fn test_absent_or_empty_uses_default() {
        let absent = candidate_models(None, "google/gemini-2.5-flash", &fallback());
        let empty = candidate_models(Some(""), "google/gemini-2.5-flash", &fallback());

        assert_eq!(absent[0], "google/gemini-2.5-flash");
        assert_eq!(absent, empty);
        assert_eq!(absent, vec![
            "google/gemini-2.5-flash",
            "google/gemini-3-flash",
            "google/gemini-3-pro",
        ]);
    }

    #[test]
    fn test_duplicates_in_fallback_suppressed() {
        let list = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(candidate_models(Some("b"), "a", &list), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let candidates = vec!["m1".to_string(), "m2".to_string(), "m3".to_string()];
        let mut tried = Vec::new();

        let opened = first_available(&candidates, |model| {
            tried.push(model.clone());
            async move {
                if model == "m3" {
                    Ok("stream-m3")
                } else {
                    Err(format!("{} unavailable", model))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(opened.model, "m3");
        assert_eq!(opened.value, "stream-m3");
        assert_eq!(opened.skipped, 2);
        assert_eq!(tried, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn test_stops_after_success() {
        let candidates = vec!["m1".to_string(), "m2".to_string()];
        let mut calls = 0;

        let opened = first_available(&candidates, |_model| {
            calls += 1;
            async { Ok::<_, String>(()) }
        })
        .await
        .unwrap();

        assert_eq!(opened.model, "m1");
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_exhausted_keeps_last_failure() {
        let candidates = vec!["m1".to_string(), "m2".to_string()];

        let exhausted = first_available(&candidates, |model| async move {
            Err::<(), _>(format!("{} down", model))
        })
        .await
        .unwrap_err();

        assert_eq!(exhausted.attempts.len(), 2);
        let last = exhausted.last().unwrap();
        assert_eq!(last.model, "m2");
        assert_eq!(last.error, "m2 down");
    }
}
