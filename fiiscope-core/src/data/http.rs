//! Document retrieval over HTTP.
//!
//! Adapters depend on the [`DocumentFetcher`] capability, not on `reqwest`, so
//! tests can hand them canned pages. [`HttpFetcher`] is the production
//! implementation: blocking client, exponential backoff on transient failures,
//! and a per-host circuit breaker.
//!
//! Upstream sites have no API contract and change markup without notice; a
//! failed fetch is routine and is reported as a `FetchError`, never a panic.

use std::time::Duration;

use super::circuit_breaker::BreakerRegistry;
use super::provider::FetchError;
use crate::config::HttpConfig;

/// Ceiling for a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Capability: fetch a document as text.
pub trait DocumentFetcher: Send + Sync {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    breakers: BreakerRegistry,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            breakers: BreakerRegistry::new(
                Duration::from_secs(config.breaker_cooldown_secs),
                config.breaker_failure_threshold,
            ),
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        })
    }

    fn host_of(url: &str) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| FetchError::Other(format!("invalid URL {url}: {e}")))?;
        Ok(parsed.host_str().unwrap_or_default().to_string())
    }
}

/// Delay before retry number `attempt` (1-based): doubles from `base`, capped at
/// [`MAX_BACKOFF`].
fn backoff(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.checked_mul(factor).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF)
}

impl DocumentFetcher for HttpFetcher {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError> {
        let breaker = self.breakers.for_host(&Self::host_of(url)?);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(backoff(self.base_delay, attempt));
            }

            if !breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            let request = headers
                .iter()
                .fold(self.client.get(url), |req, (name, value)| req.header(*name, *value));

            match request.send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        breaker.trip();
                        return Err(FetchError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        breaker.record_failure();
                        let retry_after_secs = resp
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        tracing::debug!(url, attempt, retry_after_secs, "rate limited");
                        last_error = Some(FetchError::RateLimited { retry_after_secs });
                        continue;
                    }

                    if status.is_server_error() {
                        breaker.record_failure();
                        tracing::debug!(url, attempt, status = status.as_u16(), "server error");
                        last_error = Some(FetchError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                        continue;
                    }

                    if !status.is_success() {
                        return Err(FetchError::HttpStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }

                    let body = resp.text().map_err(|e| {
                        FetchError::MalformedPayload(format!("unreadable body from {url}: {e}"))
                    })?;
                    breaker.record_success();
                    return Ok(body);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    breaker.record_failure();
                    tracing::debug!(url, attempt, error = %e, "transient network error");
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_extracted_from_url() {
        assert_eq!(
            HttpFetcher::host_of("https://investidor10.com.br/fiis/mxrf11").unwrap(),
            "investidor10.com.br"
        );
        assert!(HttpFetcher::host_of("not a url").is_err());
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff(base, 1), Duration::from_millis(500));
        assert_eq!(backoff(base, 2), Duration::from_secs(1));
        assert_eq!(backoff(base, 3), Duration::from_secs(2));
        assert_eq!(backoff(base, 8), MAX_BACKOFF);
        // past 2^31 the factor saturates instead of overflowing
        assert_eq!(backoff(base, 40), MAX_BACKOFF);
        assert_eq!(backoff(base, u32::MAX), MAX_BACKOFF);
        assert_eq!(backoff(Duration::from_secs(u64::MAX), 2), MAX_BACKOFF);
    }

    #[test]
    fn open_breaker_refuses_without_network() {
        let fetcher = HttpFetcher::new(&HttpConfig::default()).unwrap();
        fetcher.breakers.for_host("example.invalid").trip();
        let err = fetcher.get("https://example.invalid/x", &[]).unwrap_err();
        assert!(matches!(err, FetchError::CircuitBreakerTripped));
    }
}
