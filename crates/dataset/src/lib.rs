pub mod tables;

pub use tables::{EdgesRow, InventorPatentsRow, InventorsRow, PatentsRow};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use harvest::{AliasTable, PatentRow};
use network::CollaborationGraph;

/// Application-date window the reference dataset is cut to.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            window_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            window_end: NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
        }
    }
}

/// Keep rows whose application date falls inside the window, inclusive
/// on both ends. Rows with unparsable dates are dropped.
pub fn filter_window(rows: &[PatentRow], start: NaiveDate, end: NaiveDate) -> Vec<PatentRow> {
    rows.iter()
        .filter(|r| {
            r.app_date_parsed()
                .is_some_and(|d| d >= start && d <= end)
        })
        .cloned()
        .collect()
}

fn write_table<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    info!(table = name, rows = rows.len(), "Wrote table");
    Ok(())
}

/// Emit the five independent tables into `output_dir`. No cross-table
/// foreign keys are enforced; consumers join on patent/inventor ids.
pub fn emit_all(
    filtered: &[PatentRow],
    graph: &CollaborationGraph,
    aliases: &AliasTable,
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    write_table(output_dir, "patents.csv", &tables::patents_table(filtered))?;
    write_table(output_dir, "inventors.csv", &tables::inventors_table(filtered))?;
    write_table(
        output_dir,
        "inventor_patents.csv",
        &tables::inventor_patents_table(filtered),
    )?;
    write_table(output_dir, "edges.csv", &tables::edges_table(graph, filtered))?;
    write_table(output_dir, "assignee_aliases.csv", &aliases.records())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(patent: &str, inventor: &str, app_date: &str) -> PatentRow {
        PatentRow {
            patent_number: patent.to_string(),
            patent_title: String::new(),
            patent_date: "2023-01-01".to_string(),
            app_date: app_date.to_string(),
            unified_assignee: "Google".to_string(),
            original_assignee_organization: "Google LLC".to_string(),
            citedby_count: 0,
            inventor_id: inventor.to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
        }
    }

    #[test]
    fn test_filter_window_is_inclusive() {
        let rows = vec![
            row("US1", "I1", "2019-12-31"),
            row("US2", "I1", "2020-01-01"),
            row("US3", "I1", "2025-04-30"),
            row("US4", "I1", "2025-05-01"),
        ];
        let config = DatasetConfig::default();
        let kept = filter_window(&rows, config.window_start, config.window_end);

        let ids: Vec<&str> = kept.iter().map(|r| r.patent_number.as_str()).collect();
        assert_eq!(ids, vec!["US2", "US3"]);
    }

    #[test]
    fn test_filter_window_drops_unparsable_dates() {
        let rows = vec![row("US1", "I1", ""), row("US2", "I1", "not-a-date")];
        let config = DatasetConfig::default();
        assert!(filter_window(&rows, config.window_start, config.window_end).is_empty());
    }

    #[test]
    fn test_emit_all_writes_five_tables() {
        let rows = vec![
            row("US1", "I1", "2021-02-01"),
            row("US1", "I2", "2021-02-01"),
        ];
        let graph = CollaborationGraph::build(&rows);
        let aliases = AliasTable::builtin();
        let dir = tempfile::tempdir().unwrap();

        emit_all(&rows, &graph, &aliases, dir.path()).unwrap();

        for name in [
            "patents.csv",
            "inventors.csv",
            "inventor_patents.csv",
            "edges.csv",
            "assignee_aliases.csv",
        ] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }

        let edges = std::fs::read_to_string(dir.path().join("edges.csv")).unwrap();
        let mut lines = edges.lines();
        assert_eq!(
            lines.next().unwrap(),
            "inventor1_id,inventor2_id,edge_weight,shared_patents,\
             edge_2020,edge_2021,edge_2022,edge_2023,edge_2024,edge_2025"
        );
        assert_eq!(lines.next().unwrap(), "I1,I2,1,1,0,1,0,0,0,0");
    }
}
