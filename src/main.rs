// main.rs - Skybrute - Cloud Bucket Brute-Forcer
// Purpose: Discover publicly accessible cloud storage buckets by probing
//          target-derived hostnames against per-provider domain templates

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use reqwest::{Client, redirect};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod engine;
mod orchestrator;
mod prober;
mod rate_limit;
mod reporter;
mod templates;
mod wordlist;

use engine::ScanOptions;
use orchestrator::RunOptions;
use reporter::{ConsoleReporter, Reporter, ResultSink};

/// Skybrute - Cloud Bucket Brute-Forcer
#[derive(Parser, Debug)]
#[command(
    name = "Skybrute",
    version,
    about = "Discover publicly accessible cloud storage buckets",
    long_about = "Skybrute combines a target name with a wordlist, forms candidate \
hostnames under each configured cloud template, and probes them with \
rate-limited concurrent HEAD requests. Valid buckets are reported to the \
console and optionally appended to a results log."
)]
struct Args {
    /// Target name to combine with the wordlist
    #[arg(short, long, value_name = "NAME", help_heading = "Target Options")]
    target: Option<String>,

    /// File containing a list of targets (one per line)
    #[arg(short = 'l', long, value_name = "FILE", help_heading = "Target Options")]
    target_list: Option<PathBuf>,

    /// Static wordlist combined with each target
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "words.txt",
        help_heading = "Target Options"
    )]
    wordlist: PathBuf,

    /// Directory containing cloud template YAML files
    #[arg(
        long,
        value_name = "DIR",
        default_value = "templates",
        help_heading = "Template Options"
    )]
    templates_dir: PathBuf,

    /// Exclude cloud templates by name; supports wildcards, e.g. 'ibm*' or 'aws,ibm*'
    #[arg(
        long,
        value_name = "PATTERN",
        value_delimiter = ',',
        help_heading = "Template Options"
    )]
    exclude_template: Vec<String>,

    /// Select only the named cloud templates; supports wildcards
    #[arg(
        long,
        value_name = "PATTERN",
        value_delimiter = ',',
        help_heading = "Template Options"
    )]
    select_template: Vec<String>,

    /// File to save valid buckets to
    #[arg(short, long, value_name = "FILE", help_heading = "Output Options")]
    output: Option<PathBuf>,

    /// Show every checked URL and its status code
    #[arg(short, long, help_heading = "Output Options")]
    verbose: bool,

    /// Only report buckets with this exact status code
    #[arg(long, value_name = "CODE", help_heading = "Output Options")]
    status_code: Option<u16>,

    /// Number of cloud scans to run in parallel per target
    #[arg(
        long,
        value_name = "NUM",
        default_value = "5",
        help_heading = "Performance"
    )]
    parallel: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    print_banner();

    // Exactly one of -t / -l must be given.
    if args.target.is_none() && args.target_list.is_none() {
        eprintln!(
            "{}",
            "[!] You must provide either a single target (-t) or a target list (-l).".red()
        );
        std::process::exit(1);
    }
    if args.target.is_some() && args.target_list.is_some() {
        eprintln!(
            "{}",
            "[!] You cannot use both a single target (-t) and a target list (-l).".red()
        );
        std::process::exit(1);
    }

    let sink = match &args.output {
        Some(path) => {
            let sink = ResultSink::create(path)?;
            println!(
                "{}",
                format!("[*] Saving output to '{}'", path.display()).green()
            );
            sink
        }
        None => ResultSink::disabled(),
    };
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(sink.clone()));

    let targets = match (&args.target, &args.target_list) {
        (Some(target), None) => vec![target.clone()],
        (None, Some(path)) => match read_target_list(path) {
            Ok(targets) => targets,
            Err(e) => {
                eprintln!("{}", format!("[!] Error: {:#}. Exiting.", e).red());
                std::process::exit(1);
            }
        },
        _ => unreachable!("target flags validated above"),
    };

    reporter.report(
        &format!(
            "[*] Loading cloud configurations from '{}'",
            args.templates_dir.display()
        )
        .yellow()
        .to_string(),
        false,
    );
    let loaded = templates::load_templates(&args.templates_dir, reporter.as_ref());
    if loaded.is_empty() {
        eprintln!("{}", "[!] No cloud templates found. Exiting.".red());
        std::process::exit(1);
    }

    if !args.exclude_template.is_empty() {
        reporter.report(
            &format!(
                "[*] Excluding templates matching: {}",
                args.exclude_template.join(", ")
            )
            .yellow()
            .to_string(),
            false,
        );
    }
    if !args.select_template.is_empty() {
        reporter.report(
            &format!(
                "[*] Selecting only templates matching: {}",
                args.select_template.join(", ")
            )
            .yellow()
            .to_string(),
            false,
        );
    }
    let selected =
        templates::filter_templates(loaded, &args.select_template, &args.exclude_template)?;
    if selected.is_empty() {
        eprintln!(
            "{}",
            "[!] No cloud templates left after filtering. Exiting.".red()
        );
        std::process::exit(1);
    }

    // One shared client; probes classify the first response, so redirects
    // are not followed.
    let client = Client::builder()
        .redirect(redirect::Policy::none())
        .danger_accept_invalid_certs(true)
        .build()
        .context("Failed to build HTTP client")?;

    let opts = RunOptions {
        parallelism: args.parallel,
        wordlist_path: args.wordlist.clone(),
        scan: ScanOptions {
            verbose: args.verbose,
            status_code_filter: args.status_code,
        },
    };

    let summary = orchestrator::run_all(&targets, &selected, &opts, &client, &sink, &reporter).await;

    reporter.report(&"\n[*] All scans completed.".green().to_string(), false);
    reporter.report(
        &format!(
            "[*] Targets: {} scanned, {} skipped | Jobs: {} | URLs probed: {} | Valid buckets: {}",
            summary.targets - summary.targets_skipped,
            summary.targets_skipped,
            summary.jobs,
            summary.urls_probed,
            summary.findings
        )
        .cyan()
        .to_string(),
        false,
    );

    Ok(())
}

fn read_target_list(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).context(format!("target list file '{}' not found", path.display()))?;
    let reader = BufReader::new(file);
    Ok(reader
        .lines()
        .map_while(std::io::Result::ok)
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

fn print_banner() {
    println!(
        "{}",
        "═══════════════════════════════════════════════════════"
            .cyan()
            .bold()
    );
    println!("{}", "  SKYBRUTE - Cloud Bucket Brute-Forcer".white().bold());
    println!(
        "{}",
        "  Rate-limited bucket discovery across cloud providers".white()
    );
    println!(
        "{}",
        "═══════════════════════════════════════════════════════\n"
            .cyan()
            .bold()
    );
}
