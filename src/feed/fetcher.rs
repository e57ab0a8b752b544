use std::time::Duration;
use thiserror::Error;

/// Number of fetch attempts before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 3;
/// Per-attempt timeout. Exceeding it aborts that attempt, not the invocation.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a single fetch attempt failed.
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Attempt exceeded the 10-second timeout
    #[error("request timed out")]
    Timeout,
}

/// All attempts exhausted; carries the last attempt's cause.
#[derive(Debug, Error)]
#[error("failed to fetch {url} after {attempts} attempts: {last}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    #[source]
    pub last: FetchFailure,
}

/// Fetches the feed document with bounded retries and exponential backoff.
///
/// Each attempt has an independent 10-second timeout. Timeouts, transport
/// errors, and non-2xx statuses are all retryable; the backoff before the
/// n-th retry is `2^n` seconds (2s, 4s). After [`DEFAULT_ATTEMPTS`] failures
/// the whole fetch fails with a [`FetchError`] carrying the last cause; no
/// partial document is ever returned.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
) -> Result<Vec<u8>, FetchError> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match fetch_once(client, url).await {
            Ok(bytes) => {
                tracing::debug!(url = %url, attempt = attempt, bytes = bytes.len(), "Fetched feed");
                return Ok(bytes);
            }
            Err(failure) => {
                if attempt >= DEFAULT_ATTEMPTS {
                    return Err(FetchError {
                        url: url.to_string(),
                        attempts: attempt,
                        last: failure,
                    });
                }

                let delay_secs = 2u64.pow(attempt); // 2s, 4s
                tracing::warn!(
                    url = %url,
                    attempt = attempt,
                    error = %failure,
                    delay_secs = delay_secs,
                    "Fetch attempt failed, backing off"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            }
        }
    }
}

/// One attempt under a single 10-second budget covering both the request
/// and the body read.
async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FetchFailure> {
    let attempt = async {
        let response = client.get(url).send().await.map_err(FetchFailure::Network)?;

        if !response.status().is_success() {
            return Err(FetchFailure::HttpStatus(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(FetchFailure::Network)?;
        Ok(bytes.to_vec())
    };

    tokio::time::timeout(ATTEMPT_TIMEOUT, attempt)
        .await
        .map_err(|_| FetchFailure::Timeout)?
}
