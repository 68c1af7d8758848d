// Motivational quote retrieval.
//
// A fetch walks a small state machine: Idle, Fetching, RetryScheduled,
// then Succeeded or Failed. Rate limits and generic network failures
// are retried with backoff inside a fixed budget; timeouts and
// malformed payloads go straight to the fallback path. Terminal states
// always carry a displayable quote, real or bundled.
use crate::config::Config;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::{Mutex, watch};

/// Fixed per-request budget; a request past this is aborted, not retried.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Retries allowed after the initial attempt (three requests total).
pub const MAX_RETRIES: u32 = 2;

/// One displayable quote. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

impl Quote {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            author: String::new(),
        }
    }
}

/// Bundled quotes used whenever the remote endpoint cannot be reached.
pub const FALLBACK_QUOTES: [(&str, &str); 10] = [
    (
        "Discipline is choosing between what you want now and what you want most.",
        "Abraham Lincoln",
    ),
    ("Motivation gets you started. Habit keeps you going.", "Jim Rohn"),
    ("Don’t watch the clock; do what it does. Keep going.", "Sam Levenson"),
    (
        "Small daily improvements are the key to staggering long-term results.",
        "James Clear",
    ),
    ("It always seems impossible until it’s done.", "Nelson Mandela"),
    ("The journey of a thousand miles begins with one step.", "Lao Tzu"),
    ("Excellence is not an act, but a habit.", "Aristotle"),
    (
        "Do something today that your future self will thank you for.",
        "Sean Patrick Flanery",
    ),
    (
        "Success doesn’t come from what you do occasionally, it comes from what you do consistently.",
        "Marie Forleo",
    ),
    (
        "We are what we repeatedly do. Greatness, then, is not an act but a habit.",
        "Will Durant",
    ),
];

/// Picks a uniformly random bundled quote.
pub fn fallback_quote() -> Quote {
    let (text, author) = FALLBACK_QUOTES[fastrand::usize(..FALLBACK_QUOTES.len())];
    Quote {
        text: text.to_string(),
        author: author.to_string(),
    }
}

/// Failure classification for one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// The request exceeded the fixed timeout.
    Timeout,
    /// HTTP 429, with the parsed `Retry-After` seconds when the header
    /// was present and numeric.
    RateLimited { retry_after: Option<u64> },
    /// Any other non-success HTTP status.
    Http(u16),
    /// Transport failure, or a response body that was not valid JSON.
    Network(String),
    /// The body decoded but carried no usable quote content.
    Malformed,
}

impl QuoteError {
    /// Whether the retry budget may be spent on this failure. Timeouts
    /// and malformed payloads are terminal on first sight.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            QuoteError::RateLimited { .. } | QuoteError::Http(_) | QuoteError::Network(_)
        )
    }

    /// Backoff before retry number `attempt + 1`. Rate limits honor the
    /// server's `Retry-After` seconds when given and otherwise double the
    /// generic delay; everything else backs off 1s then 2s.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        match self {
            QuoteError::RateLimited {
                retry_after: Some(secs),
            } => Duration::from_millis(secs.saturating_mul(1000)),
            QuoteError::RateLimited { retry_after: None } => {
                Duration::from_millis(2u64.pow(attempt) * 2000)
            }
            _ => Duration::from_millis(2u64.pow(attempt) * 1000),
        }
    }
}

impl fmt::Display for QuoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteError::Timeout => write!(f, "request timed out"),
            QuoteError::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "rate limited, retry after {}s", secs),
            QuoteError::RateLimited { retry_after: None } => write!(f, "rate limited"),
            QuoteError::Http(status) => write!(f, "HTTP error: status {}", status),
            QuoteError::Network(e) => write!(f, "network error: {}", e),
            QuoteError::Malformed => write!(f, "invalid response format"),
        }
    }
}

impl std::error::Error for QuoteError {}

/// Fetch lifecycle for the quote surface.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Fetching { attempt: u32 },
    RetryScheduled { next_attempt: u32, delay: Duration },
    Succeeded(Quote),
    Failed(Quote),
}

impl FetchState {
    /// The quote to display; empty until a terminal state is reached.
    pub fn quote(&self) -> Quote {
        match self {
            FetchState::Succeeded(q) | FetchState::Failed(q) => q.clone(),
            _ => Quote::empty(),
        }
    }

    /// True only while a request is actually on the wire, not while a
    /// retry timer counts down.
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Fetching { .. })
    }

    /// True when the displayed quote came from the bundled fallback set.
    pub fn is_offline(&self) -> bool {
        matches!(self, FetchState::Failed(_))
    }
}

/// Observable quote state shared between the fetch task and its owner.
///
/// `revision` increments on every committed transition, letting
/// observers diff cheaply and letting tests assert that nothing was
/// written after teardown.
#[derive(Debug)]
pub struct QuoteSlot {
    pub state: FetchState,
    pub revision: u64,
}

impl QuoteSlot {
    pub fn new() -> Self {
        Self {
            state: FetchState::Idle,
            revision: 0,
        }
    }
}

impl Default for QuoteSlot {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedQuoteSlot = Arc<Mutex<QuoteSlot>>;

/// Teardown signal for an in-flight fetch.
///
/// A clone travels with the fetch task; every timer wait races it and
/// every state commit re-checks it under the slot lock, so a cancelled
/// fetch can never write again.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        // send_replace stores the value even when no receiver is alive.
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called, immediately if it already
    /// was.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `state` into the slot unless the token fired. The check runs
/// under the slot lock, so cancellation and commits cannot interleave.
async fn commit(slot: &SharedQuoteSlot, token: &CancelToken, state: FetchState) -> bool {
    let mut guard = slot.lock().await;
    if token.is_cancelled() {
        return false;
    }
    guard.state = state;
    guard.revision += 1;
    true
}

/// HTTP client for the quote endpoint.
#[derive(Debug, Clone)]
pub struct QuoteService {
    client: reqwest::Client,
    url: String,
    request_timeout: Duration,
}

impl QuoteService {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.quote_api_url.clone())
    }

    /// Overrides the fixed request timeout (tests shrink it).
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Issues exactly one request and classifies the outcome.
    pub async fn fetch_once(&self) -> Result<Quote, QuoteError> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteError::Timeout
                } else {
                    QuoteError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(QuoteError::RateLimited { retry_after });
        }
        if !status.is_success() {
            return Err(QuoteError::Http(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                QuoteError::Timeout
            } else {
                QuoteError::Network(e.to_string())
            }
        })?;

        // Bytes that fail to decode as JSON count as a transport-level
        // failure and stay retriable. A decoded document without usable
        // content is malformed and terminal.
        let payload: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| QuoteError::Network(e.to_string()))?;

        let text = payload
            .get("content")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(QuoteError::Malformed)?;
        let author = payload
            .get("author")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown");

        Ok(Quote {
            text: text.to_string(),
            author: author.to_string(),
        })
    }

    /// Mount path. Runs the full retry policy, committing every
    /// transition into `slot`, until a terminal state or cancellation.
    pub async fn fetch_with_retry(&self, slot: SharedQuoteSlot, token: CancelToken) {
        let mut attempt: u32 = 0;
        loop {
            if !commit(&slot, &token, FetchState::Fetching { attempt }).await {
                return;
            }
            match self.fetch_once().await {
                Ok(quote) => {
                    commit(&slot, &token, FetchState::Succeeded(quote)).await;
                    return;
                }
                Err(err) if err.is_retriable() && attempt < MAX_RETRIES => {
                    let delay = err.retry_delay(attempt);
                    log::warn!("Quote fetch failed ({}), retrying in {:?}", err, delay);
                    let next = FetchState::RetryScheduled {
                        next_attempt: attempt + 1,
                        delay,
                    };
                    if !commit(&slot, &token, next).await {
                        return;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = token.cancelled() => return,
                    }
                    attempt += 1;
                }
                Err(err) => {
                    log::warn!("Using fallback quote after fetch failure: {}", err);
                    commit(&slot, &token, FetchState::Failed(fallback_quote())).await;
                    return;
                }
            }
        }
    }

    /// Manual refresh path: a single attempt with immediate fallback on
    /// any failure, no timers.
    pub async fn refresh(&self, slot: SharedQuoteSlot, token: CancelToken) {
        if !commit(&slot, &token, FetchState::Fetching { attempt: 0 }).await {
            return;
        }
        let state = match self.fetch_once().await {
            Ok(quote) => FetchState::Succeeded(quote),
            Err(err) => {
                log::warn!("Quote refresh failed: {}", err);
                FetchState::Failed(fallback_quote())
            }
        };
        commit(&slot, &token, state).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_quote_comes_from_the_bundled_set() {
        for _ in 0..20 {
            let quote = fallback_quote();
            assert!(
                FALLBACK_QUOTES
                    .iter()
                    .any(|(text, author)| *text == quote.text && *author == quote.author)
            );
        }
    }

    #[test]
    fn test_retriability_matrix() {
        assert!(!QuoteError::Timeout.is_retriable());
        assert!(!QuoteError::Malformed.is_retriable());
        assert!(QuoteError::RateLimited { retry_after: None }.is_retriable());
        assert!(QuoteError::Http(500).is_retriable());
        assert!(QuoteError::Network("connection refused".into()).is_retriable());
    }

    #[test]
    fn test_generic_backoff_is_one_then_two_seconds() {
        let err = QuoteError::Http(500);
        assert_eq!(err.retry_delay(0), Duration::from_secs(1));
        assert_eq!(err.retry_delay(1), Duration::from_secs(2));
    }

    #[test]
    fn test_rate_limit_backoff_honors_retry_after() {
        let with_header = QuoteError::RateLimited {
            retry_after: Some(7),
        };
        assert_eq!(with_header.retry_delay(0), Duration::from_secs(7));

        let without = QuoteError::RateLimited { retry_after: None };
        assert_eq!(without.retry_delay(0), Duration::from_secs(2));
        assert_eq!(without.retry_delay(1), Duration::from_secs(4));
    }

    #[test]
    fn test_fetch_state_accessors() {
        assert!(FetchState::Fetching { attempt: 0 }.is_loading());
        assert!(
            !FetchState::RetryScheduled {
                next_attempt: 1,
                delay: Duration::from_secs(1)
            }
            .is_loading()
        );

        let quote = Quote {
            text: "x".into(),
            author: "y".into(),
        };
        assert!(!FetchState::Succeeded(quote.clone()).is_offline());
        assert!(FetchState::Failed(quote.clone()).is_offline());
        assert_eq!(FetchState::Succeeded(quote.clone()).quote(), quote);
        assert_eq!(FetchState::Idle.quote(), Quote::empty());
    }

    #[tokio::test]
    async fn test_cancel_token_signals_waiters() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });

        token.cancel();
        assert!(token.is_cancelled());
        handle.await.unwrap();

        // Awaiting after the fact resolves immediately.
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_commit_refuses_after_cancellation() {
        let slot: SharedQuoteSlot = Arc::new(Mutex::new(QuoteSlot::new()));
        let token = CancelToken::new();

        assert!(commit(&slot, &token, FetchState::Fetching { attempt: 0 }).await);
        assert_eq!(slot.lock().await.revision, 1);

        token.cancel();
        assert!(!commit(&slot, &token, FetchState::Failed(fallback_quote())).await);

        let guard = slot.lock().await;
        assert_eq!(guard.revision, 1);
        assert_eq!(guard.state, FetchState::Fetching { attempt: 0 });
    }
}
