use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use harvest::PatentRow;
use network::CollaborationGraph;

/// One row per patent, first-seen aggregation over its inventor rows.
#[derive(Debug, Clone, Serialize)]
pub struct PatentsRow {
    pub patent_number: String,
    pub patent_title: String,
    pub patent_date: String,
    pub app_date: String,
    pub assignee_organization: String,
    pub citedby_count: u64,
    pub num_inventors: usize,
    pub patent_year: Option<i32>,
    pub app_year: Option<i32>,
}

/// One row per inventor with derived career metrics.
#[derive(Debug, Clone, Serialize)]
pub struct InventorsRow {
    pub inventor_id: String,
    pub first_name: String,
    pub last_name: String,
    pub inventor_full_name: String,
    pub career_start_date: String,
    pub career_end_date: String,
    pub total_records: usize,
    pub total_patents: usize,
    pub primary_affiliation: String,
    pub unique_organizations: usize,
    pub career_span_days: i64,
    pub avg_team_size: f64,
    pub org_transitions: usize,
    pub affiliation_history: String,
}

/// Row-level (inventor, patent) link within the dataset window.
#[derive(Debug, Clone, Serialize)]
pub struct InventorPatentsRow {
    pub inventor_id: String,
    pub patent_number: String,
    pub app_date: String,
    pub patent_date: String,
    pub affiliation_at_filing: String,
    pub app_year: Option<i32>,
    pub patent_year: Option<i32>,
}

/// One row per collaboration edge, with per-year activity counters for
/// the dataset window years.
#[derive(Debug, Clone, Serialize)]
pub struct EdgesRow {
    pub inventor1_id: String,
    pub inventor2_id: String,
    pub edge_weight: usize,
    pub shared_patents: usize,
    pub edge_2020: usize,
    pub edge_2021: usize,
    pub edge_2022: usize,
    pub edge_2023: usize,
    pub edge_2024: usize,
    pub edge_2025: usize,
}

/// Aggregate the row-level table into one row per patent.
pub fn patents_table(rows: &[PatentRow]) -> Vec<PatentsRow> {
    let mut by_patent: BTreeMap<&str, (usize, &PatentRow)> = BTreeMap::new();
    for row in rows {
        by_patent
            .entry(&row.patent_number)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, row));
    }

    by_patent
        .into_values()
        .map(|(num_inventors, first)| PatentsRow {
            patent_number: first.patent_number.clone(),
            patent_title: first.patent_title.clone(),
            patent_date: first.patent_date.clone(),
            app_date: first.app_date.clone(),
            assignee_organization: first.unified_assignee.clone(),
            citedby_count: first.citedby_count,
            num_inventors,
            patent_year: first.patent_year(),
            app_year: first.app_year(),
        })
        .collect()
}

/// Collapse consecutive duplicate affiliations in a chronological
/// sequence, preserving returns to earlier employers. Feeds the
/// transition count.
pub fn collapse_consecutive(affiliations: &[&str]) -> Vec<String> {
    let mut collapsed: Vec<String> = Vec::new();
    for &a in affiliations {
        if collapsed.last().map(|l| l.as_str()) != Some(a) {
            collapsed.push(a.to_string());
        }
    }
    collapsed
}

/// Deduplicate affiliations keeping chronological first-occurrence order.
/// Feeds the history column, so a return to an earlier employer does not
/// repeat it.
pub fn first_occurrence(affiliations: &[&str]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    affiliations
        .iter()
        .filter(|a| seen.insert(**a))
        .map(|a| a.to_string())
        .collect()
}

/// Derive one row per inventor: career bounds, distinct patents, average
/// team size across their filings, employer transitions (after collapsing
/// consecutive repeats) and the arrow-joined affiliation history.
pub fn inventors_table(rows: &[PatentRow]) -> Vec<InventorsRow> {
    // Team size per patent within the filtered window
    let mut team_sizes: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *team_sizes.entry(&row.patent_number).or_insert(0) += 1;
    }

    // Chronological per-inventor row sequence (ISO dates sort as strings)
    let mut by_inventor: BTreeMap<&str, Vec<&PatentRow>> = BTreeMap::new();
    for row in rows {
        by_inventor.entry(&row.inventor_id).or_default().push(row);
    }

    let mut out = Vec::with_capacity(by_inventor.len());
    for (inventor_id, mut inventor_rows) in by_inventor {
        inventor_rows.sort_by(|a, b| a.app_date.cmp(&b.app_date));

        let first = inventor_rows[0];
        let career_start = inventor_rows
            .iter()
            .map(|r| r.app_date.as_str())
            .min()
            .unwrap_or_default();
        let career_end = inventor_rows
            .iter()
            .map(|r| r.app_date.as_str())
            .max()
            .unwrap_or_default();
        let career_span_days = match (
            chrono::NaiveDate::parse_from_str(career_start, "%Y-%m-%d"),
            chrono::NaiveDate::parse_from_str(career_end, "%Y-%m-%d"),
        ) {
            (Ok(start), Ok(end)) => (end - start).num_days(),
            _ => 0,
        };

        let distinct_patents: std::collections::HashSet<&str> = inventor_rows
            .iter()
            .map(|r| r.patent_number.as_str())
            .collect();
        let distinct_orgs: std::collections::HashSet<&str> = inventor_rows
            .iter()
            .map(|r| r.unified_assignee.as_str())
            .collect();

        let team_total: usize = inventor_rows
            .iter()
            .map(|r| team_sizes.get(r.patent_number.as_str()).copied().unwrap_or(1))
            .sum();
        let avg_team_size =
            ((team_total as f64 / inventor_rows.len() as f64) * 100.0).round() / 100.0;

        let affiliations: Vec<&str> = inventor_rows
            .iter()
            .map(|r| r.unified_assignee.as_str())
            .collect();
        let org_transitions = collapse_consecutive(&affiliations).len().saturating_sub(1);
        let history = first_occurrence(&affiliations);

        out.push(InventorsRow {
            inventor_id: inventor_id.to_string(),
            first_name: first.first_name.clone(),
            last_name: first.last_name.clone(),
            inventor_full_name: first.full_name(),
            career_start_date: career_start.to_string(),
            career_end_date: career_end.to_string(),
            total_records: inventor_rows.len(),
            total_patents: distinct_patents.len(),
            primary_affiliation: first.unified_assignee.clone(),
            unique_organizations: distinct_orgs.len(),
            career_span_days,
            avg_team_size,
            org_transitions,
            affiliation_history: history.join(" -> "),
        });
    }
    out
}

/// Project the filtered rows into the link table.
pub fn inventor_patents_table(rows: &[PatentRow]) -> Vec<InventorPatentsRow> {
    rows.iter()
        .map(|row| InventorPatentsRow {
            inventor_id: row.inventor_id.clone(),
            patent_number: row.patent_number.clone(),
            app_date: row.app_date.clone(),
            patent_date: row.patent_date.clone(),
            affiliation_at_filing: row.unified_assignee.clone(),
            app_year: row.app_year(),
            patent_year: row.patent_year(),
        })
        .collect()
}

/// Flatten the collaboration graph into the edge table. Per-year counters
/// count the edge's shared patents by application year, 0 when a year saw
/// none. The inventor pair is emitted in sorted order.
pub fn edges_table(graph: &CollaborationGraph, rows: &[PatentRow]) -> Vec<EdgesRow> {
    let mut app_years: HashMap<&str, i32> = HashMap::new();
    for row in rows {
        if let Some(year) = row.app_year() {
            app_years.entry(&row.patent_number).or_insert(year);
        }
    }

    let mut out = Vec::with_capacity(graph.edge_count());
    for (a, b, collab) in graph.edges() {
        let (first, second) = if a.inventor_id <= b.inventor_id {
            (a, b)
        } else {
            (b, a)
        };

        let mut yearly = [0usize; 6];
        for patent in &collab.shared_patents {
            if let Some(&year) = app_years.get(patent.as_str()) {
                if (2020..=2025).contains(&year) {
                    yearly[(year - 2020) as usize] += 1;
                }
            }
        }

        out.push(EdgesRow {
            inventor1_id: first.inventor_id.clone(),
            inventor2_id: second.inventor_id.clone(),
            edge_weight: collab.weight,
            shared_patents: collab.shared_patents.len(),
            edge_2020: yearly[0],
            edge_2021: yearly[1],
            edge_2022: yearly[2],
            edge_2023: yearly[3],
            edge_2024: yearly[4],
            edge_2025: yearly[5],
        });
    }

    out.sort_by(|a, b| {
        (a.inventor1_id.as_str(), a.inventor2_id.as_str())
            .cmp(&(b.inventor1_id.as_str(), b.inventor2_id.as_str()))
    });
    out
}
