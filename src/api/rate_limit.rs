use std::time::Duration;

use reqwest::StatusCode;

const BACKOFF_SECONDS: &[u64] = &[1, 2, 4];

/// Check if a response status means the server is throttling us.
pub fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
}

/// Delay before retry number `attempt` (0-based). Caps at the last step.
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = BACKOFF_SECONDS
        .get(attempt as usize)
        .or(BACKOFF_SECONDS.last())
        .copied()
        .unwrap_or(1);
    Duration::from_secs(secs)
}

/// Sleep for the backoff duration of `attempt`.
pub async fn backoff_sleep(attempt: u32, max_retries: u32) {
    let wait = backoff_delay(attempt);
    log::warn!(
        "Rate limited (429). Waiting {}s before retry {}/{}",
        wait.as_secs(),
        attempt + 1,
        max_retries
    );
    tokio::time::sleep(wait).await;
}
