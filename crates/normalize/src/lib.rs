use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

use harvest::PatentRow;

/// Known residual spellings fixed by string equality after the windowed
/// inference pass.
pub const MANUAL_CORRECTIONS: &[(&str, &str)] =
    &[("ALIBABA INNOVATION PRIVATE LIMITED", "Alibaba")];

/// Window bounds and majority threshold for assignee inference. Both are
/// empirical choices; they are parameters rather than constants on purpose.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// Rows inspected on each side of an unresolved row.
    pub window: usize,
    /// Fraction of the window's canonical occurrences the leading firm
    /// must exceed before it is adopted.
    pub majority_threshold: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            window: 10,
            majority_threshold: 0.7,
        }
    }
}

/// Outcome summary of a normalization pass.
#[derive(Debug, Default)]
pub struct NormalizeReport {
    /// Rows whose assignee was rewritten to an inferred canonical firm.
    pub rewritten: usize,
    /// Distinct assignee strings left unresolved.
    pub unresolved: BTreeSet<String>,
}

/// Pick the canonical firm for an unresolved row given the canonical
/// occurrences in its surrounding window. Exactly one distinct firm wins
/// outright; with competition the leader must account for more than
/// `threshold` of the occurrences, otherwise no firm is adopted.
pub fn majority_firm(votes: &[&str], threshold: f64) -> Option<String> {
    if votes.is_empty() {
        return None;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in votes {
        *counts.entry(v).or_insert(0) += 1;
    }

    if counts.len() == 1 {
        return counts.keys().next().map(|f| f.to_string());
    }

    let total: usize = counts.values().sum();
    let (firm, freq) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))?;
    if freq as f64 > threshold * total as f64 {
        Some(firm.to_string())
    } else {
        None
    }
}

/// Rewrite rows whose assignee is not a recognized canonical firm, using
/// the canonical neighbors within the configured window of each row.
/// Fixes applied earlier in the pass are visible to later windows, since
/// table order groups rows by company query. Rows that cannot be resolved
/// are left as-is and reported.
pub fn normalize_rows(
    rows: &mut [PatentRow],
    canonical: &HashSet<String>,
    config: &NormalizeConfig,
) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    for idx in 0..rows.len() {
        if canonical.contains(&rows[idx].unified_assignee) {
            continue;
        }

        let lo = idx.saturating_sub(config.window);
        let hi = (idx + config.window).min(rows.len() - 1);
        let votes: Vec<&str> = rows[lo..=hi]
            .iter()
            .map(|r| r.unified_assignee.as_str())
            .filter(|a| canonical.contains(*a))
            .collect();

        if let Some(firm) = majority_firm(&votes, config.majority_threshold) {
            rows[idx].unified_assignee = firm;
            report.rewritten += 1;
        }
    }

    for row in rows.iter_mut() {
        if let Some((_, fix)) = MANUAL_CORRECTIONS
            .iter()
            .find(|(from, _)| *from == row.unified_assignee)
        {
            row.unified_assignee = fix.to_string();
            report.rewritten += 1;
        }
    }

    for row in rows.iter() {
        if !canonical.contains(&row.unified_assignee) {
            report.unresolved.insert(row.unified_assignee.clone());
        }
    }

    info!(
        rewritten = report.rewritten,
        unresolved = report.unresolved.len(),
        "Normalization pass complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(assignee: &str) -> PatentRow {
        PatentRow {
            patent_number: "US1".to_string(),
            patent_title: String::new(),
            patent_date: "2022-01-01".to_string(),
            app_date: "2021-01-01".to_string(),
            unified_assignee: assignee.to_string(),
            original_assignee_organization: assignee.to_string(),
            citedby_count: 0,
            inventor_id: "i1".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    fn canonical() -> HashSet<String> {
        ["Google", "Meta", "Apple"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_single_firm_window_resolves() {
        assert_eq!(
            majority_firm(&["Google", "Google", "Google"], 0.7),
            Some("Google".to_string())
        );
        // Even a single occurrence wins when it is the only firm seen
        assert_eq!(majority_firm(&["Meta"], 0.7), Some("Meta".to_string()));
    }

    #[test]
    fn test_dominant_firm_resolves_above_threshold() {
        // 8 of 10 canonical occurrences are Google: 80% > 70%
        let votes = [
            "Google", "Google", "Google", "Google", "Google", "Google", "Google", "Google",
            "Meta", "Meta",
        ];
        assert_eq!(majority_firm(&votes, 0.7), Some("Google".to_string()));
    }

    #[test]
    fn test_split_window_stays_unresolved() {
        // Exact 50/50 split must not resolve
        let votes = ["Google", "Google", "Meta", "Meta"];
        assert_eq!(majority_firm(&votes, 0.7), None);

        // 60/40 is below the 70% bar too
        let votes = ["Google", "Google", "Google", "Meta", "Meta"];
        assert_eq!(majority_firm(&votes, 0.7), None);
    }

    #[test]
    fn test_empty_window_stays_unresolved() {
        assert_eq!(majority_firm(&[], 0.7), None);
    }

    #[test]
    fn test_normalize_adopts_neighborhood_firm() {
        let mut rows: Vec<PatentRow> = (0..5).map(|_| row("Google")).collect();
        rows.push(row("Googel LLC"));
        rows.extend((0..5).map(|_| row("Google")));

        let report = normalize_rows(&mut rows, &canonical(), &NormalizeConfig::default());
        assert_eq!(rows[5].unified_assignee, "Google");
        assert_eq!(report.rewritten, 1);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_normalize_leaves_contested_row_and_reports_it() {
        let mut rows: Vec<PatentRow> = (0..4).map(|_| row("Google")).collect();
        rows.push(row("Mystery Corp"));
        rows.extend((0..4).map(|_| row("Meta")));

        let report = normalize_rows(&mut rows, &canonical(), &NormalizeConfig::default());
        assert_eq!(rows[4].unified_assignee, "Mystery Corp");
        assert!(report.unresolved.contains("Mystery Corp"));
    }

    #[test]
    fn test_normalize_without_canonical_neighbors_reports() {
        let mut rows = vec![row("Unknown A"), row("Unknown B")];

        let report = normalize_rows(&mut rows, &canonical(), &NormalizeConfig::default());
        assert_eq!(report.rewritten, 0);
        assert_eq!(report.unresolved.len(), 2);
    }

    #[test]
    fn test_manual_correction_applies() {
        let mut rows = vec![row("ALIBABA INNOVATION PRIVATE LIMITED")];
        let canonical: HashSet<String> = ["Alibaba".to_string()].into_iter().collect();

        normalize_rows(&mut rows, &canonical, &NormalizeConfig::default());
        assert_eq!(rows[0].unified_assignee, "Alibaba");
    }

    #[test]
    fn test_window_bounds_clamp_at_table_edges() {
        // Unresolved row at index 0 with canonical rows only ahead of it
        let mut rows = vec![row("Googel LLC")];
        rows.extend((0..3).map(|_| row("Google")));

        normalize_rows(&mut rows, &canonical(), &NormalizeConfig::default());
        assert_eq!(rows[0].unified_assignee, "Google");
    }

    #[test]
    fn test_custom_window_size_limits_votes() {
        // Neighbors beyond the 1-row window must not be consulted
        let mut rows = vec![row("Google"), row("Unknown"), row("Unknown2")];
        let config = NormalizeConfig {
            window: 1,
            majority_threshold: 0.7,
        };

        normalize_rows(&mut rows, &canonical(), &config);
        // Row 1 sees "Google" at distance 1; row 2 then sees the fix at
        // distance 1 as well
        assert_eq!(rows[1].unified_assignee, "Google");
        assert_eq!(rows[2].unified_assignee, "Google");
    }
}
