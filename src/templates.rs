// templates.rs - Cloud Template Configuration
// Purpose: Load per-provider scan templates from YAML files and filter them
//          by name patterns

use anyhow::{Context, Result};
use colored::*;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::reporter::Reporter;

fn default_rate_limit() -> usize {
    10
}

fn default_timeout() -> u64 {
    5
}

fn default_excluded() -> HashSet<u16> {
    HashSet::from([404])
}

/// One cloud provider's bucket-naming convention and scan parameters.
/// Immutable once loaded; identified by `name`.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudTemplate {
    pub name: String,
    pub domain: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_rps: usize,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_excluded")]
    pub excluded_status_codes: HashSet<u16>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    clouds: Vec<CloudTemplate>,
}

/// Load every template declared by the `*.yaml` / `*.yml` files in `dir`.
///
/// Unreadable or malformed files are reported and skipped; a missing
/// directory yields an empty list, which the caller treats as fatal.
pub fn load_templates(dir: &Path, reporter: &dyn Reporter) -> Vec<CloudTemplate> {
    let mut templates = Vec::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            reporter.report(
                &format!("[!] Error: '{}' directory not found.", dir.display())
                    .red()
                    .to_string(),
                false,
            );
            return templates;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        if !is_yaml {
            continue;
        }

        match load_template_file(&path) {
            Ok(mut clouds) => {
                reporter.report(
                    &format!("[*] Loaded cloud config from '{}'", path.display())
                        .green()
                        .to_string(),
                    false,
                );
                templates.append(&mut clouds);
            }
            Err(e) => {
                reporter.report(
                    &format!("[!] Error loading '{}': {:#}", path.display(), e)
                        .red()
                        .to_string(),
                    false,
                );
            }
        }
    }

    templates
}

fn load_template_file(path: &Path) -> Result<Vec<CloudTemplate>> {
    let raw = fs::read_to_string(path).context("Failed to read template file")?;
    let parsed: TemplateFile =
        serde_yaml::from_str(&raw).context("Failed to parse template file")?;
    Ok(parsed.clouds)
}

/// Apply exclusion then selection glob patterns to the loaded templates.
/// Patterns match template names; comma-separated CLI values have already
/// been split by the argument layer.
pub fn filter_templates(
    templates: Vec<CloudTemplate>,
    select: &[String],
    exclude: &[String],
) -> Result<Vec<CloudTemplate>> {
    let mut filtered = templates;

    if !exclude.is_empty() {
        let patterns = build_globset(exclude)?;
        filtered.retain(|t| !patterns.is_match(&t.name));
    }

    if !select.is_empty() {
        let patterns = build_globset(select)?;
        filtered.retain(|t| patterns.is_match(&t.name));
    }

    Ok(filtered)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).context(format!("Invalid template pattern: '{}'", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build template pattern set")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Reporter for Silent {
        fn report(&self, _message: &str, _persist: bool) {}
    }

    fn template(name: &str) -> CloudTemplate {
        CloudTemplate {
            name: name.to_string(),
            domain: format!("{}.example.com", name),
            rate_limit_rps: 10,
            timeout: 5,
            excluded_status_codes: HashSet::from([404]),
        }
    }

    #[test]
    fn yaml_defaults_are_applied() {
        let raw = "clouds:\n  - name: aws\n    domain: s3.amazonaws.com\n";
        let parsed: TemplateFile = serde_yaml::from_str(raw).unwrap();
        let t = &parsed.clouds[0];
        assert_eq!(t.rate_limit_rps, 10);
        assert_eq!(t.timeout, 5);
        assert_eq!(t.excluded_status_codes, HashSet::from([404]));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let raw = "clouds:\n  - name: ibm\n    domain: s3.us.cloud-object-storage.appdomain.cloud\n    rate_limit_rps: 3\n    timeout: 10\n    excluded_status_codes: [404, 403]\n";
        let parsed: TemplateFile = serde_yaml::from_str(raw).unwrap();
        let t = &parsed.clouds[0];
        assert_eq!(t.rate_limit_rps, 3);
        assert_eq!(t.timeout, 10);
        assert_eq!(t.excluded_status_codes, HashSet::from([404, 403]));
    }

    #[test]
    fn exclusion_patterns_remove_matching_names() {
        let all = vec![template("aws"), template("ibm-eu"), template("ibm-us")];
        let kept = filter_templates(all, &[], &["ibm*".to_string()]).unwrap();
        let names: Vec<&str> = kept.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["aws"]);
    }

    #[test]
    fn selection_keeps_only_matching_names() {
        let all = vec![template("aws"), template("gcp"), template("ibm-eu")];
        let kept = filter_templates(all, &["ibm*".to_string()], &[]).unwrap();
        let names: Vec<&str> = kept.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["ibm-eu"]);
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(filter_templates(vec![template("aws")], &["[".to_string()], &[]).is_err());
    }

    #[test]
    fn load_skips_malformed_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("good.yaml"),
            "clouds:\n  - name: aws\n    domain: s3.amazonaws.com\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("bad.yaml"), "clouds: [just a string]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_templates(dir.path(), &Silent);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "aws");
    }

    #[test]
    fn missing_directory_yields_no_templates() {
        let loaded = load_templates(Path::new("definitely/not/a/dir"), &Silent);
        assert!(loaded.is_empty());
    }
}
