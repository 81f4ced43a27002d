// prober.rs - HTTP Existence Probe
// Purpose: Issue one HEAD request per candidate URL and report the outcome

use reqwest::Client;
use std::time::Duration;

/// Outcome of probing one candidate URL.
///
/// `status` 0 is reserved for transport failures (DNS, connect, TLS,
/// timeout) and never collides with a real HTTP status code.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: u16,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn is_transport_failure(&self) -> bool {
        self.status == 0
    }
}

/// Submit a HEAD request to `url` with the given timeout. A single attempt;
/// transport failures are an expected outcome, not an error.
pub async fn probe(client: &Client, url: &str, timeout: Duration) -> ProbeOutcome {
    match client.head(url).timeout(timeout).send().await {
        Ok(response) => ProbeOutcome {
            url: url.to_string(),
            status: response.status().as_u16(),
            error: None,
        },
        Err(e) => ProbeOutcome {
            url: url.to_string(),
            status: 0,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_yields_status_zero() {
        let client = Client::new();
        // Port 9 (discard) is not listening in any sane test environment.
        let outcome = probe(&client, "http://127.0.0.1:9/", Duration::from_secs(2)).await;
        assert!(outcome.is_transport_failure());
        assert_eq!(outcome.status, 0);
        assert!(outcome.error.is_some());
    }
}
