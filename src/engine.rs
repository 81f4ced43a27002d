// engine.rs - Scan Engine
// Purpose: Drive one (target, cloud template) scan: build the candidate URL
//          set, dispatch rate-limited probes, classify every outcome, and
//          stream valid findings to the result sink

use colored::*;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};

use crate::prober::{self, ProbeOutcome};
use crate::rate_limit::WindowedLimiter;
use crate::reporter::{Reporter, ResultSink};
use crate::templates::CloudTemplate;

/// One unit of work: a single target scanned against a single template.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub target: String,
    pub template: CloudTemplate,
}

/// A probe outcome that passed the validity rule.
#[derive(Debug, Clone)]
pub struct Finding {
    pub url: String,
    pub status: u16,
}

/// Per-job summary, produced once when the job completes and never mutated
/// afterwards.
#[derive(Debug)]
pub struct ScanReport {
    pub job: ScanJob,
    pub candidates: usize,
    pub findings: Vec<Finding>,
}

/// Knobs shared by every job in a run.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub verbose: bool,
    pub status_code_filter: Option<u16>,
}

/// Candidate URLs for a combined name list under a template domain.
pub fn candidate_urls(names: &[String], domain: &str) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("https://{}.{}", name, domain))
        .collect()
}

/// Validity rule: transport failures and excluded status codes are never
/// findings; an optional global filter narrows findings to one exact status.
pub fn is_valid(outcome: &ProbeOutcome, excluded: &HashSet<u16>, filter: Option<u16>) -> bool {
    if outcome.is_transport_failure() || excluded.contains(&outcome.status) {
        return false;
    }
    match filter {
        Some(code) => outcome.status == code,
        None => true,
    }
}

/// Run one scan job to completion. Returns only after every candidate has
/// been probed and every outcome classified; there is no early termination
/// and no cancellation.
pub async fn run_scan(
    job: ScanJob,
    names: &[String],
    client: Client,
    sink: ResultSink,
    reporter: Arc<dyn Reporter>,
    opts: ScanOptions,
) -> ScanReport {
    reporter.report(
        &format!(
            "\n[*] Starting scan for target: '{}' on cloud: '{}'",
            job.target, job.template.name
        )
        .yellow()
        .to_string(),
        false,
    );
    reporter.report(
        &format!(
            "[*] Brute-forcing {} with a rate limit of {} RPS...",
            job.template.name, job.template.rate_limit_rps
        )
        .yellow()
        .to_string(),
        false,
    );

    let urls = candidate_urls(names, &job.template.domain);
    let candidates = urls.len();
    let timeout = Duration::from_secs(job.template.timeout);
    let excluded = job.template.excluded_status_codes.clone();

    // The collector classifies outcomes as they arrive, so findings stream
    // to the sink while later probes are still in flight.
    let (tx, mut rx) = mpsc::unbounded_channel::<ProbeOutcome>();
    let collector = {
        let sink = sink.clone();
        let reporter = Arc::clone(&reporter);
        tokio::spawn(async move {
            let mut findings = Vec::new();
            while let Some(outcome) = rx.recv().await {
                if opts.verbose {
                    // The color only reflects reachability, not the filter.
                    let hit = !outcome.is_transport_failure() && !excluded.contains(&outcome.status);
                    let line =
                        format!("[-] Checking: {} (Status: {})", outcome.url, outcome.status);
                    let line = if hit { line.green() } else { line.red() };
                    reporter.report(&line.to_string(), false);
                }
                if is_valid(&outcome, &excluded, opts.status_code_filter) {
                    let finding = Finding {
                        url: outcome.url,
                        status: outcome.status,
                    };
                    sink.append(&finding);
                    findings.push(finding);
                }
            }
            findings
        })
    };

    // At most `rate_limit_rps` probes in flight at once; the windowed
    // limiter paces how fast new ones are dispatched.
    let semaphore = Arc::new(Semaphore::new(job.template.rate_limit_rps.max(1)));
    let mut limiter = WindowedLimiter::new(job.template.rate_limit_rps);
    let mut handles = Vec::with_capacity(candidates);

    for url in urls {
        let permit = Arc::clone(&semaphore).acquire_owned().await.unwrap();
        let client = client.clone();
        let tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let outcome = prober::probe(&client, &url, timeout).await;
            drop(permit);
            let _ = tx.send(outcome);
        }));
        limiter.throttle().await;
    }
    drop(tx);

    for handle in handles {
        let _ = handle.await;
    }
    let findings = collector.await.unwrap_or_default();

    if findings.is_empty() {
        reporter.report(
            &format!(
                "[*] No valid buckets found for {} for target '{}'.",
                job.template.name, job.target
            )
            .yellow()
            .to_string(),
            false,
        );
    } else {
        reporter.report(
            &format!(
                "[+] Scan completed for '{}' on '{}'. Found {} valid buckets.",
                job.target,
                job.template.name,
                findings.len()
            )
            .green()
            .to_string(),
            false,
        );
    }

    ScanReport {
        job,
        candidates,
        findings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordlist;

    #[test]
    fn candidate_set_leads_with_bare_target_and_skips_empty_words() {
        let words = vec!["".to_string(), "dev".to_string(), "prod".to_string()];
        let names = wordlist::combine("acme", &words);
        let urls = candidate_urls(&names, "s3.example.com");
        assert_eq!(
            urls,
            vec![
                "https://acme.s3.example.com",
                "https://acme-dev.s3.example.com",
                "https://acme-prod.s3.example.com",
            ]
        );
    }

    fn outcome(status: u16) -> ProbeOutcome {
        ProbeOutcome {
            url: "https://acme.s3.example.com".to_string(),
            status,
            error: None,
        }
    }

    #[test]
    fn transport_failures_are_never_findings() {
        assert!(!is_valid(&outcome(0), &HashSet::new(), None));
        assert!(!is_valid(&outcome(0), &HashSet::new(), Some(0)));
    }

    #[test]
    fn excluded_status_codes_are_never_findings() {
        let excluded = HashSet::from([404, 403]);
        assert!(!is_valid(&outcome(404), &excluded, None));
        assert!(!is_valid(&outcome(403), &excluded, None));
        assert!(is_valid(&outcome(200), &excluded, None));
    }

    #[test]
    fn status_filter_narrows_findings_to_one_code() {
        let excluded = HashSet::from([404]);
        assert!(is_valid(&outcome(200), &excluded, Some(200)));
        assert!(!is_valid(&outcome(301), &excluded, Some(200)));
    }
}
