// wordlist.rs - Target Wordlist Combination
// Purpose: Combine a target name with wordlist entries into the candidate
//          bucket names consumed by the scan engine

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Conventional temporary path for the combined per-target list.
pub const COMBINED_PATH: &str = "tmp/words.tmp";

/// Combine a target with wordlist entries: the bare target first, then
/// `target-word` for every non-empty entry, preserving wordlist order.
pub fn combine(target: &str, words: &[String]) -> Vec<String> {
    let mut names = Vec::with_capacity(words.len() + 1);
    names.push(target.to_string());
    for word in words {
        let word = word.trim();
        if word.is_empty() {
            continue;
        }
        names.push(format!("{}-{}", target, word));
    }
    names
}

/// Read the wordlist at `wordlist_path`, combine it with `target`, and write
/// the combined names to `out_path`, one per line. Returns how many names
/// were written.
pub fn combine_to_file(target: &str, wordlist_path: &Path, out_path: &Path) -> Result<usize> {
    let words = read_lines(wordlist_path)?;
    let names = combine(target, &words);

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create '{}'", parent.display()))?;
        }
    }

    let mut out = File::create(out_path)
        .context(format!("Failed to create '{}'", out_path.display()))?;
    for name in &names {
        writeln!(out, "{}", name)?;
    }

    Ok(names.len())
}

/// Ordered, trimmed, non-empty lines of a file.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).context(format!("Failed to open '{}'", path.display()))?;
    let reader = BufReader::new(file);
    Ok(reader
        .lines()
        .map_while(Result::ok)
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}
