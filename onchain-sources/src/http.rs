//! Shared GET-with-retry helper used by every adapter. Grounded on
//! `examples/Blockstream-lwk/lwk_wollet/src/clients/asyncr/esplora.rs`'s
//! `get_with_retry` (429/503 backoff loop), generalized to also honor a
//! `Retry-After` header per spec.md §4.1 ("HTTP 429 is handled internally:
//! adapter sleeps `Retry-After`... capped at 5 min").

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{AdapterError, AdapterErrorKind};
use crate::ratelimit::TokenBucket;

const MAX_RETRY_AFTER: Duration = Duration::from_secs(5 * 60);
const MAX_ATTEMPTS: u32 = 6;

pub async fn get_with_retry(
    client: &Client,
    source: &'static str,
    limiter: &TokenBucket,
    url: &str,
) -> Result<Response, AdapterError> {
    let mut attempt = 0;
    loop {
        limiter.acquire().await;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| AdapterError::from_reqwest(source, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 429 && attempt < MAX_ATTEMPTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(1 << attempt.min(8)));

            log::info!("{source}: {url} rate limited, retrying after {retry_after:?}");
            tokio::time::sleep(retry_after.min(MAX_RETRY_AFTER)).await;
            attempt += 1;
            continue;
        }

        if status.as_u16() == 503 && attempt < MAX_ATTEMPTS {
            let backoff = Duration::from_secs(1 << attempt.min(8));
            log::info!("{source}: {url} unavailable, retrying after {backoff:?}");
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        return Err(AdapterError::new(
            source,
            AdapterErrorKind::Http {
                status: status.as_u16(),
            },
            format!("{url} returned {status}"),
        ));
    }
}
