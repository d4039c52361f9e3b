//! Stale-request suppression
//!
//! Rapid period or range switching can leave an older aggregation in flight
//! when a newer one starts. Results are keyed by a monotonically increasing
//! token; a completion whose token is no longer the latest issued must be
//! discarded so it cannot overwrite fresher state.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic request tokens for one screen's aggregation requests.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next token, superseding all previously issued ones
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a result carrying this token may still be applied
    pub fn is_latest(&self, token: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == token
    }

    /// Apply a result only if its token is still the latest
    pub fn accept<T>(&self, token: u64, result: T) -> Option<T> {
        if self.is_latest(token) {
            Some(result)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase_monotonically() {
        let tokens = RequestTokens::new();
        let a = tokens.issue();
        let b = tokens.issue();
        assert!(b > a);
    }

    #[test]
    fn test_only_latest_token_is_accepted() {
        let tokens = RequestTokens::new();
        let a = tokens.issue();
        let b = tokens.issue();

        assert!(!tokens.is_latest(a));
        assert!(tokens.is_latest(b));
        assert_eq!(tokens.accept(a, "stale"), None);
        assert_eq!(tokens.accept(b, "fresh"), Some("fresh"));
    }

    #[tokio::test]
    async fn test_late_completion_of_earlier_request_is_discarded() {
        use std::sync::Arc;
        use tokio::sync::oneshot;

        let tokens = Arc::new(RequestTokens::new());

        // Request A starts first but finishes last
        let token_a = tokens.issue();
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let tokens_a = tokens.clone();
        let task_a = tokio::spawn(async move {
            gate_rx.await.unwrap();
            tokens_a.accept(token_a, "result A")
        });

        // Request B supersedes A and completes immediately
        let token_b = tokens.issue();
        let applied_b = tokens.accept(token_b, "result B");
        assert_eq!(applied_b, Some("result B"));

        // A now resolves; its result must not be applied
        gate_tx.send(()).unwrap();
        let applied_a = task_a.await.unwrap();
        assert_eq!(applied_a, None);
    }
}
