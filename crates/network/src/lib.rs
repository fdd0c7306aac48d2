use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::info;

use harvest::PatentRow;

/// Per-inventor summary attached to each graph node after edge
/// construction.
#[derive(Debug, Clone, Default)]
pub struct InventorNode {
    pub inventor_id: String,
    pub full_name: String,
    pub patent_count: usize,
    pub organizations: BTreeSet<String>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    /// last_year - first_year + 1, in years.
    pub career_span: Option<i32>,
}

/// Co-authorship between two inventors: how many patents they share and
/// which ones.
#[derive(Debug, Clone, Default)]
pub struct Collaboration {
    pub weight: usize,
    pub shared_patents: BTreeSet<String>,
}

/// Undirected inventor collaboration graph. Nodes exist only for
/// inventors who co-appear on at least one patent; at most one edge per
/// unordered pair, weight accumulating across patents.
pub struct CollaborationGraph {
    pub graph: UnGraph<InventorNode, Collaboration>,
    index: HashMap<String, NodeIndex>,
}

impl CollaborationGraph {
    /// Build the graph from the normalized inventor-patent table, then
    /// attach per-inventor attributes.
    pub fn build(rows: &[PatentRow]) -> Self {
        let mut builder = Self {
            graph: UnGraph::new_undirected(),
            index: HashMap::new(),
        };

        // Group rows by patent, keeping first-listing order and dropping
        // duplicate inventor entries so a malformed list cannot produce
        // a self-loop.
        let mut patent_inventors: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for row in rows {
            let inventors = patent_inventors.entry(&row.patent_number).or_default();
            if !inventors.contains(&row.inventor_id.as_str()) {
                inventors.push(&row.inventor_id);
            }
        }

        for (patent, inventors) in &patent_inventors {
            if inventors.len() < 2 {
                continue;
            }
            for i in 0..inventors.len() {
                for j in (i + 1)..inventors.len() {
                    builder.record_collaboration(inventors[i], inventors[j], patent);
                }
            }
        }

        builder.attach_attributes(rows);

        info!(
            nodes = builder.graph.node_count(),
            edges = builder.graph.edge_count(),
            "Collaboration network built"
        );
        builder
    }

    fn node(&mut self, inventor_id: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(inventor_id) {
            return idx;
        }
        let idx = self.graph.add_node(InventorNode {
            inventor_id: inventor_id.to_string(),
            ..Default::default()
        });
        self.index.insert(inventor_id.to_string(), idx);
        idx
    }

    fn record_collaboration(&mut self, a: &str, b: &str, patent: &str) {
        let na = self.node(a);
        let nb = self.node(b);

        if let Some(edge) = self.graph.find_edge(na, nb) {
            let attr = &mut self.graph[edge];
            attr.weight += 1;
            attr.shared_patents.insert(patent.to_string());
        } else {
            let mut shared = BTreeSet::new();
            shared.insert(patent.to_string());
            self.graph.add_edge(
                na,
                nb,
                Collaboration {
                    weight: 1,
                    shared_patents: shared,
                },
            );
        }
    }

    /// Attach display name, distinct patent count, affiliation set and
    /// first/last activity year (by grant year) to each graph node.
    fn attach_attributes(&mut self, rows: &[PatentRow]) {
        struct Acc {
            full_name: String,
            patents: HashSet<String>,
            organizations: BTreeSet<String>,
            first_year: Option<i32>,
            last_year: Option<i32>,
        }

        let mut stats: HashMap<&str, Acc> = HashMap::new();
        for row in rows {
            let acc = stats.entry(&row.inventor_id).or_insert_with(|| Acc {
                full_name: row.full_name(),
                patents: HashSet::new(),
                organizations: BTreeSet::new(),
                first_year: None,
                last_year: None,
            });
            acc.patents.insert(row.patent_number.clone());
            if !row.unified_assignee.is_empty() {
                acc.organizations.insert(row.unified_assignee.clone());
            }
            if let Some(year) = row.patent_year() {
                acc.first_year = Some(acc.first_year.map_or(year, |y| y.min(year)));
                acc.last_year = Some(acc.last_year.map_or(year, |y| y.max(year)));
            }
        }

        for (inventor_id, acc) in stats {
            let Some(&idx) = self.index.get(inventor_id) else {
                continue; // solo inventors hold no node
            };
            let node = &mut self.graph[idx];
            node.full_name = acc.full_name;
            node.patent_count = acc.patents.len();
            node.organizations = acc.organizations;
            node.first_year = acc.first_year;
            node.last_year = acc.last_year;
            node.career_span = match (acc.first_year, acc.last_year) {
                (Some(first), Some(last)) => Some(last - first + 1),
                _ => None,
            };
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn inventor(&self, inventor_id: &str) -> Option<&InventorNode> {
        self.index.get(inventor_id).map(|&idx| &self.graph[idx])
    }

    /// The collaboration between two inventors, order-independent.
    pub fn collaboration(&self, a: &str, b: &str) -> Option<&Collaboration> {
        let na = *self.index.get(a)?;
        let nb = *self.index.get(b)?;
        let edge = self.graph.find_edge(na, nb)?;
        Some(&self.graph[edge])
    }

    /// All edges as (inventor A, inventor B, collaboration) triples.
    pub fn edges(&self) -> impl Iterator<Item = (&InventorNode, &InventorNode, &Collaboration)> {
        self.graph.edge_indices().map(|e| {
            let (a, b) = self.graph.edge_endpoints(e).unwrap();
            (&self.graph[a], &self.graph[b], &self.graph[e])
        })
    }
}
