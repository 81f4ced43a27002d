// orchestrator.rs - Scan Orchestrator
// Purpose: Run the target x template cross-product with bounded parallelism
//          and aggregate the per-job reports

use colored::*;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::engine::{self, ScanJob, ScanOptions};
use crate::reporter::{Reporter, ResultSink};
use crate::templates::CloudTemplate;
use crate::wordlist;

/// Aggregate counts for a whole run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub targets: usize,
    pub targets_skipped: usize,
    pub jobs: usize,
    pub urls_probed: usize,
    pub findings: usize,
}

/// Run-wide knobs the CLI hands to the orchestrator.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum jobs executing concurrently per target.
    pub parallelism: usize,
    pub wordlist_path: PathBuf,
    pub scan: ScanOptions,
}

/// Process every target in input order. Per target: regenerate the combined
/// wordlist, run one job per template with at most `parallelism` executing
/// concurrently, and join them all before moving to the next target. One
/// job's failure never aborts its siblings or the run.
pub async fn run_all(
    targets: &[String],
    templates: &[CloudTemplate],
    opts: &RunOptions,
    client: &Client,
    sink: &ResultSink,
    reporter: &Arc<dyn Reporter>,
) -> RunSummary {
    let mut summary = RunSummary {
        targets: targets.len(),
        ..Default::default()
    };

    for target in targets {
        reporter.report(
            &"\n===================================================="
                .yellow()
                .to_string(),
            false,
        );
        reporter.report(
            &format!("[*] Starting all jobs for target: '{}'", target)
                .yellow()
                .to_string(),
            false,
        );
        reporter.report(
            &"===================================================="
                .yellow()
                .to_string(),
            false,
        );

        // A missing or unreadable wordlist source skips this target only.
        let names = match prepare_names(target, &opts.wordlist_path) {
            Ok(names) => Arc::new(names),
            Err(e) => {
                reporter.report(
                    &format!(
                        "[!] Word combination failed for target '{}': {:#}. Skipping.",
                        target, e
                    )
                    .red()
                    .to_string(),
                    false,
                );
                summary.targets_skipped += 1;
                continue;
            }
        };

        reporter.report(
            &format!(
                "[*] Starting parallel scan for '{}' with {} parallel jobs for {} templates...",
                target,
                opts.parallelism,
                templates.len()
            )
            .yellow()
            .to_string(),
            false,
        );

        let semaphore = Arc::new(Semaphore::new(opts.parallelism.max(1)));
        let mut handles = Vec::with_capacity(templates.len());

        for template in templates {
            let job = ScanJob {
                target: target.clone(),
                template: template.clone(),
            };
            let semaphore = Arc::clone(&semaphore);
            let names = Arc::clone(&names);
            let client = client.clone();
            let sink = sink.clone();
            let reporter = Arc::clone(reporter);
            let scan_opts = opts.scan.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                engine::run_scan(job, &names, client, sink, reporter, scan_opts).await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(report) => {
                    summary.jobs += 1;
                    summary.urls_probed += report.candidates;
                    summary.findings += report.findings.len();
                }
                Err(e) => {
                    reporter.report(
                        &format!("[!] A scan job for '{}' failed: {}", target, e)
                            .red()
                            .to_string(),
                        false,
                    );
                }
            }
        }

        reporter.report(
            &format!("[*] All jobs for '{}' completed.", target)
                .green()
                .to_string(),
            false,
        );
    }

    summary
}

/// Regenerate the combined wordlist for one target and read it back from
/// the conventional temporary path.
fn prepare_names(target: &str, wordlist_path: &Path) -> anyhow::Result<Vec<String>> {
    let combined = Path::new(wordlist::COMBINED_PATH);
    wordlist::combine_to_file(target, wordlist_path, combined)?;
    wordlist::read_lines(combined)
}
