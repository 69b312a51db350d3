//! Batch pipeline.
//!
//! The external caller supplies a directory and a variant keyword and
//! gets a report string back. Everything else (pair discovery, data-dir
//! resolution, sequencing, fault containment) lives here. Processing is
//! sequential: records are independent, and the report must follow
//! file-then-record encounter order so runs diff cleanly.

use crate::application::report::ReportBuilder;
use crate::application::variants::Variant;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONTENT_SUFFIX: &str = "_content.txt";
const MANIFEST_SUFFIX: &str = ".xml";
const SETTINGS_FILE: &str = "lead-audit.json";

/// Tunable per-batch settings, serde-loadable for non-default batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckSettings {
    /// Expected line count of a civitek content file (1000 records plus
    /// the header row).
    pub expected_line_count: usize,
    /// Results page size used for pagination completeness.
    pub results_page_size: usize,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            expected_line_count: 1001,
            results_page_size: 10,
        }
    }
}

impl CheckSettings {
    /// Overrides from a `lead-audit.json` file in the data directory,
    /// when one is present; defaults otherwise.
    pub fn load_from_dir(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(settings) => {
                info!(path = %path.display(), "loaded batch settings");
                settings
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid settings file");
                Self::default()
            }
        }
    }
}

/// One manifest/content pair discovered in the data directory.
#[derive(Debug, Clone)]
pub struct FilePair {
    pub base_name: String,
    pub manifest_path: PathBuf,
    pub content_path: PathBuf,
}

/// Run a batch check, picking up settings overrides from the data
/// directory when present.
pub fn run_check(variant: Variant, directory: &Path) -> String {
    let data_dir = resolve_data_dir(directory);
    let settings = CheckSettings::load_from_dir(&data_dir);
    run_check_with_settings(variant, &data_dir, &settings)
}

/// Run a batch check. Never fails: every failure mode becomes a line in
/// the returned report.
pub fn run_check_with_settings(
    variant: Variant,
    directory: &Path,
    settings: &CheckSettings,
) -> String {
    let data_dir = resolve_data_dir(directory);
    info!(variant = %variant, dir = %data_dir.display(), "starting batch check");

    let mut report = ReportBuilder::new();
    let pairs = discover_pairs(&data_dir, &mut report);
    if pairs.is_empty() {
        return "No manifest/content file pairs found to process.".to_string();
    }
    report.intro(pairs.len());

    let rules = variant.rules();
    for pair in &pairs {
        rules.check_pair(pair, settings, &mut report);
    }

    let rendered = report.finish();
    info!(pairs = pairs.len(), "batch check finished");
    rendered
}

/// Locate the directory actually holding the data files: the base
/// directory itself, a `Test` child, a sole subdirectory (or its `Test`
/// child), or the first directory found by walking that contains data.
pub fn resolve_data_dir(base: &Path) -> PathBuf {
    if has_data_files(base) {
        return base.to_path_buf();
    }
    let test_dir = base.join("Test");
    if has_data_files(&test_dir) {
        return test_dir;
    }
    if let Some(child) = sole_subdirectory(base) {
        if has_data_files(&child) {
            return child;
        }
        let nested_test = child.join("Test");
        if has_data_files(&nested_test) {
            return nested_test;
        }
    }
    if let Some(found) = walk_for_data(base) {
        return found;
    }
    base.to_path_buf()
}

fn has_data_files(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        name.ends_with(MANIFEST_SUFFIX) || name.ends_with(CONTENT_SUFFIX)
    })
}

fn sole_subdirectory(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let subdirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    match subdirs.as_slice() {
        [only] => Some(only.clone()),
        _ => None,
    }
}

fn walk_for_data(dir: &Path) -> Option<PathBuf> {
    if has_data_files(dir) {
        return Some(dir.to_path_buf());
    }
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    subdirs.iter().find_map(|sub| walk_for_data(sub))
}

/// Pair `<base>.xml` with `<base>_content.txt`. Unmatched files are
/// warned about and excluded; pairs come back sorted by base name so
/// report order is reproducible.
fn discover_pairs(dir: &Path, report: &mut ReportBuilder) -> Vec<FilePair> {
    let mut manifests: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut contents: BTreeMap<String, PathBuf> = BTreeMap::new();

    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!(dir = %dir.display(), "could not read data directory");
        return Vec::new();
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(base) = name.strip_suffix(CONTENT_SUFFIX) {
            contents.insert(base.to_string(), path.clone());
        } else if let Some(base) = name.strip_suffix(MANIFEST_SUFFIX) {
            manifests.insert(base.to_string(), path.clone());
        }
    }

    let mut pairs = Vec::new();
    for (base, content_path) in &contents {
        match manifests.get(base) {
            Some(manifest_path) => pairs.push(FilePair {
                base_name: base.clone(),
                manifest_path: manifest_path.clone(),
                content_path: content_path.clone(),
            }),
            None => report.warning(&format!(
                "Found {base}{CONTENT_SUFFIX} but no matching {base}{MANIFEST_SUFFIX}"
            )),
        }
    }
    for base in manifests.keys() {
        if !contents.contains_key(base) {
            report.warning(&format!(
                "Found {base}{MANIFEST_SUFFIX} but no matching {base}{CONTENT_SUFFIX}"
            ));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_base_then_test_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let test_dir = dir.path().join("Test");
        std::fs::create_dir(&test_dir).unwrap();
        std::fs::write(test_dir.join("batch.xml"), "<LeadList/>").unwrap();
        assert_eq!(resolve_data_dir(dir.path()), test_dir);

        std::fs::write(dir.path().join("direct.xml"), "<LeadList/>").unwrap();
        assert_eq!(resolve_data_dir(dir.path()), dir.path());
    }

    #[test]
    fn resolve_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let deep = dir.path().join("a").join("b");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("batch_content.txt"), "").unwrap();
        // "a" is the sole subdirectory but holds no data itself; the
        // recursive walk finds "a/b".
        assert_eq!(resolve_data_dir(dir.path()), deep);
    }

    #[test]
    fn unmatched_files_warn_and_are_excluded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lonely.xml"), "<LeadList/>").unwrap();
        std::fs::write(dir.path().join("orphan_content.txt"), "").unwrap();
        std::fs::write(dir.path().join("ok.xml"), "<LeadList/>").unwrap();
        std::fs::write(dir.path().join("ok_content.txt"), "").unwrap();

        let mut report = ReportBuilder::new();
        let pairs = discover_pairs(dir.path(), &mut report);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].base_name, "ok");
        let text = report.render();
        assert!(text.contains("orphan_content.txt but no matching orphan.xml"));
        assert!(text.contains("lonely.xml but no matching lonely_content.txt"));
    }

    #[test]
    fn empty_directory_reports_no_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_check(Variant::Flager, dir.path());
        assert_eq!(out, "No manifest/content file pairs found to process.");
    }

    #[test]
    fn settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"expected_line_count": 3, "results_page_size": 25}"#,
        )
        .unwrap();
        let settings = CheckSettings::load_from_dir(dir.path());
        assert_eq!(settings.expected_line_count, 3);
        assert_eq!(settings.results_page_size, 25);

        // Missing or invalid files fall back to defaults.
        let other = tempfile::tempdir().unwrap();
        assert_eq!(CheckSettings::load_from_dir(other.path()).expected_line_count, 1001);
        std::fs::write(other.path().join(SETTINGS_FILE), "not json").unwrap();
        assert_eq!(CheckSettings::load_from_dir(other.path()).results_page_size, 10);
    }
}
