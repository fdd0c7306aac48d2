use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aliases::AliasTable;
use crate::client::RawPatent;

/// One (inventor, patent) pair, the atomic unit of the harvested table.
/// Field order matches the output CSV header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentRow {
    pub patent_number: String,
    pub patent_title: String,
    pub patent_date: String,
    pub app_date: String,
    pub unified_assignee: String,
    pub original_assignee_organization: String,
    pub citedby_count: u64,
    pub inventor_id: String,
    pub first_name: String,
    pub last_name: String,
}

impl PatentRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn app_date_parsed(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.app_date, "%Y-%m-%d").ok()
    }

    pub fn app_year(&self) -> Option<i32> {
        self.app_date_parsed().map(|d| d.year())
    }

    pub fn patent_year(&self) -> Option<i32> {
        NaiveDate::parse_from_str(&self.patent_date, "%Y-%m-%d")
            .ok()
            .map(|d| d.year())
    }
}

/// Flatten deduplicated patents into one row per listed inventor. The raw
/// assignee is the first assignee's organization, empty when the API
/// returned no assignee list; the canonical form falls back to the raw
/// string when no alias matches. A patent with no inventors yields no rows.
pub fn explode(patents: &[RawPatent], aliases: &AliasTable) -> Vec<PatentRow> {
    let mut rows = Vec::new();

    for p in patents {
        let raw_org = p
            .assignees
            .as_deref()
            .and_then(|a| a.first())
            .and_then(|a| a.assignee_organization.clone())
            .unwrap_or_default();
        let canonical = aliases
            .resolve(&raw_org)
            .map(|c| c.to_string())
            .unwrap_or_else(|| raw_org.clone());

        for inv in p.inventors.as_deref().unwrap_or_default() {
            rows.push(PatentRow {
                patent_number: p.patent_id.clone(),
                patent_title: p.patent_title.clone().unwrap_or_default(),
                patent_date: p.patent_date.clone().unwrap_or_default(),
                app_date: p.filing_date().unwrap_or_default().to_string(),
                unified_assignee: canonical.clone(),
                original_assignee_organization: raw_org.clone(),
                citedby_count: p.patent_num_times_cited_by_us_patents.unwrap_or(0),
                inventor_id: inv.inventor_id.clone().unwrap_or_default(),
                first_name: inv.inventor_name_first.clone().unwrap_or_default(),
                last_name: inv.inventor_name_last.clone().unwrap_or_default(),
            });
        }
    }

    rows
}

/// Read the full harvested table back into memory.
pub fn read_rows(path: &Path) -> Result<Vec<PatentRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open harvest table {}", path.display()))?;

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: PatentRow = record.context("Malformed row in harvest table")?;
        rows.push(row);
    }
    Ok(rows)
}

/// Append one company's rows to the output table, writing the header only
/// when the table holds no data yet. An empty company appends nothing, so
/// the header decision must key on file emptiness, not existence: the
/// csv writer emits the header lazily on the first row, and an earlier
/// zero-row company leaves an empty file behind.
pub fn append_rows(path: &Path, rows: &[PatentRow]) -> Result<()> {
    let write_header = path.metadata().map_or(true, |m| m.len() == 0);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for append", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().context("Failed to flush harvest table")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RawAssignee, RawInventor};

    fn raw_patent(id: &str, org: Option<&str>, inventors: &[&str]) -> RawPatent {
        RawPatent {
            patent_id: id.to_string(),
            patent_title: Some(format!("Title {id}")),
            patent_date: Some("2022-03-01".to_string()),
            assignees: org.map(|o| {
                vec![RawAssignee {
                    assignee_organization: Some(o.to_string()),
                }]
            }),
            inventors: Some(
                inventors
                    .iter()
                    .map(|i| RawInventor {
                        inventor_id: Some(i.to_string()),
                        inventor_name_first: Some("A".to_string()),
                        inventor_name_last: Some("B".to_string()),
                    })
                    .collect(),
            ),
            application: Some(vec![crate::client::RawApplication {
                filing_date: Some("2021-06-15".to_string()),
            }]),
            patent_num_times_cited_by_us_patents: Some(3),
        }
    }

    #[test]
    fn test_explode_one_row_per_inventor() {
        let aliases = AliasTable::builtin();
        let patents = vec![raw_patent("US1", Some("Google LLC"), &["i1", "i2", "i3"])];

        let rows = explode(&patents, &aliases);
        assert_eq!(rows.len(), 3);
        // Patent-level fields are shared across the exploded rows
        assert!(rows.iter().all(|r| r.patent_number == "US1"));
        assert!(rows.iter().all(|r| r.unified_assignee == "Google"));
        assert!(rows.iter().all(|r| r.original_assignee_organization == "Google LLC"));
        assert!(rows.iter().all(|r| r.app_date == "2021-06-15"));
    }

    #[test]
    fn test_explode_missing_assignee_maps_to_itself() {
        let aliases = AliasTable::builtin();
        let patents = vec![raw_patent("US2", None, &["i1"])];

        let rows = explode(&patents, &aliases);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].original_assignee_organization, "");
        assert_eq!(rows[0].unified_assignee, "");
    }

    #[test]
    fn test_explode_unknown_assignee_keeps_raw_string() {
        let aliases = AliasTable::builtin();
        let patents = vec![raw_patent("US3", Some("Googel LLC"), &["i1"])];

        let rows = explode(&patents, &aliases);
        assert_eq!(rows[0].unified_assignee, "Googel LLC");
    }

    #[test]
    fn test_explode_no_inventors_yields_no_rows() {
        let aliases = AliasTable::builtin();
        let mut p = raw_patent("US4", Some("Apple Inc."), &[]);
        p.inventors = None;

        assert!(explode(&[p], &aliases).is_empty());
    }

    #[test]
    fn test_append_then_read_round_trip() {
        let aliases = AliasTable::builtin();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patents.csv");

        let first = explode(&[raw_patent("US1", Some("Google LLC"), &["i1", "i2"])], &aliases);
        let second = explode(&[raw_patent("US2", Some("Apple Inc."), &["i3"])], &aliases);

        append_rows(&path, &first).unwrap();
        append_rows(&path, &second).unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].unified_assignee, "Google");
        assert_eq!(rows[2].unified_assignee, "Apple");

        // Header written exactly once
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("patent_number").count(), 1);
    }

    #[test]
    fn test_empty_company_append_keeps_header_contract() {
        let aliases = AliasTable::builtin();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patents.csv");

        // A company with no data appends nothing but may create the file
        append_rows(&path, &[]).unwrap();

        let rows = explode(&[raw_patent("US1", Some("Google LLC"), &["i1"])], &aliases);
        append_rows(&path, &rows).unwrap();
        append_rows(&path, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("patent_number,"));
        assert_eq!(text.matches("patent_number").count(), 1);

        // The table still parses and resume still sees the company
        let read_back = read_rows(&path).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].unified_assignee, "Google");

        let canonical = aliases.canonical_set();
        let processed = crate::checkpoint::processed_from_csv(&path, &canonical);
        assert!(processed.contains("Google"));
    }

    #[test]
    fn test_year_helpers() {
        let aliases = AliasTable::builtin();
        let rows = explode(&[raw_patent("US1", Some("Google LLC"), &["i1"])], &aliases);

        assert_eq!(rows[0].app_year(), Some(2021));
        assert_eq!(rows[0].patent_year(), Some(2022));
        assert_eq!(rows[0].full_name(), "A B");
    }
}
