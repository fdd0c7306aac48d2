use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Pending,
    Done,
}

/// Per-company harvest status, persisted as JSON next to the output table.
/// A company is atomic: it is marked done only after its full result set
/// has been appended, so a crashed run simply retries it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    companies: BTreeMap<String, CompanyStatus>,
}

impl Manifest {
    /// Manifest path for a given output table, e.g.
    /// `patents.csv` -> `patents.csv.manifest.json`.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "harvest".to_string());
        name.push_str(".manifest.json");
        output.with_file_name(name)
    }

    /// Load the manifest, treating a missing or unreadable file as an
    /// empty one (nothing processed yet).
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable manifest; starting fresh");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write manifest {}", path.display()))?;
        Ok(())
    }

    pub fn is_done(&self, company: &str) -> bool {
        self.companies.get(company) == Some(&CompanyStatus::Done)
    }

    pub fn mark_done(&mut self, company: &str) {
        self.companies
            .insert(company.to_string(), CompanyStatus::Done);
    }

    pub fn done_count(&self) -> usize {
        self.companies
            .values()
            .filter(|s| **s == CompanyStatus::Done)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Seed the manifest from a set of companies already present in an
    /// output table written before the manifest existed.
    pub fn seed_done(&mut self, companies: impl IntoIterator<Item = String>) {
        for c in companies {
            self.mark_done(&c);
        }
    }
}

/// Fallback resume detection for output files that predate the manifest:
/// scan the `unified_assignee` column for canonical names. Any read
/// failure means "nothing processed yet".
pub fn processed_from_csv(path: &Path, canonical: &HashSet<String>) -> HashSet<String> {
    let mut reader = match csv::Reader::from_path(path) {
        Ok(r) => r,
        Err(_) => return HashSet::new(),
    };

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(_) => return HashSet::new(),
    };
    let Some(col) = headers.iter().position(|h| h == "unified_assignee") else {
        return HashSet::new();
    };

    let mut seen = HashSet::new();
    for record in reader.records() {
        let Ok(record) = record else {
            return HashSet::new();
        };
        if let Some(value) = record.get(col) {
            if canonical.contains(value) {
                seen.insert(value.to_string());
            }
        }
    }
    seen
}
