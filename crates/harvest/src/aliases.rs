use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One (observed legal name, canonical firm) pair from the alias table,
/// as exported in the reference dataset.
#[derive(Debug, Clone, Serialize)]
pub struct AliasRecord {
    pub observed_name: String,
    pub canonical_form: String,
    pub relationship_type: String,
}

/// A canonical firm identity and the exact legal-entity names it files
/// patents under.
#[derive(Debug, Clone)]
pub struct Company {
    pub canonical: String,
    pub variants: Vec<String>,
}

/// Immutable mapping between canonical firms and their known legal-name
/// variants. Built once at startup, never mutated at runtime.
#[derive(Debug, Clone)]
pub struct AliasTable {
    companies: Vec<Company>,
    to_canonical: HashMap<String, String>,
}

impl AliasTable {
    /// The fixed roster of tracked technology companies.
    pub fn builtin() -> Self {
        Self::from_mappings(BUILTIN_MAPPINGS)
    }

    fn from_mappings(mappings: &[(&str, &[&str])]) -> Self {
        let mut companies = Vec::with_capacity(mappings.len());
        let mut to_canonical = HashMap::new();

        for (canonical, variants) in mappings {
            for v in *variants {
                to_canonical.insert(v.to_string(), canonical.to_string());
            }
            companies.push(Company {
                canonical: canonical.to_string(),
                variants: variants.iter().map(|v| v.to_string()).collect(),
            });
        }

        Self {
            companies,
            to_canonical,
        }
    }

    /// Companies in roster order. Harvesting processes them in this order.
    pub fn companies(&self) -> impl Iterator<Item = &Company> {
        self.companies.iter()
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Resolve a raw assignee-organization string to its canonical firm,
    /// if the exact spelling is a known variant.
    pub fn resolve(&self, raw_org: &str) -> Option<&str> {
        self.to_canonical.get(raw_org).map(|s| s.as_str())
    }

    /// The closed set of canonical firm names.
    pub fn canonical_set(&self) -> HashSet<String> {
        self.companies
            .iter()
            .map(|c| c.canonical.clone())
            .collect()
    }

    /// Flatten the table into one record per (variant, canonical) pair.
    pub fn records(&self) -> Vec<AliasRecord> {
        self.companies
            .iter()
            .flat_map(|c| {
                c.variants.iter().map(|v| AliasRecord {
                    observed_name: v.clone(),
                    canonical_form: c.canonical.clone(),
                    relationship_type: "legal_entity".to_string(),
                })
            })
            .collect()
    }
}

/// Exact legal name variants for phrase-matching against the
/// assignee-organization field.
const BUILTIN_MAPPINGS: &[(&str, &[&str])] = &[
    (
        "Baidu",
        &[
            "Baidu, Inc.",
            "BEIJING BAIDU NETCOM SCIENCE TECHNOLOGY CO., LTD.",
            "BAIDU ONLINE NETWORK TECHNOLOGY (BEIJING) CO., LTD.",
        ],
    ),
    (
        "Alibaba",
        &[
            "Alibaba Group Holding Limited",
            "ALIBABA (CHINA) CO., LTD.",
            "Alibaba Damo (Hangzhou) Technology Co., Ltd.",
            "Alibaba Cloud Computing Co., Ltd.",
            "Alibaba Singapore Holding Private Limited",
            "ALIBABA TECHNOLOGY (ISRAEL) LTD.",
            "Alibaba Innovation Private Limited",
        ],
    ),
    (
        "Tencent",
        &[
            "Tencent Holdings Ltd.",
            "TENCENT AMERICA LLC",
            "TENCENT TECHNOLOGIES (SHENZHEN) COMPANY LIMITED",
            "TENCENT CLOUD COMPUTING (BEIJING) CO., LTD.",
            "Tencent Music Entertainment Technology (Shenzhen) Co., Ltd.",
        ],
    ),
    (
        "ByteDance",
        &[
            "ByteDance Ltd.",
            "BEIJING BYTEDANCE NETWORK TECHNOLOGY CO., LTD.",
            "TIANJIN BYTEDANCE TECHNOLOGY CO., LTD.",
            "Beijing Zitiao Network Technology Co., Ltd.",
            "BYTEDANCE INC.",
        ],
    ),
    (
        "Google",
        &[
            "Google LLC",
            "Google Inc.",
            "GOOGLE TECHNOLOGY HOLDINGS LLC",
            "Alphabet Communications, Inc.",
            "Alphabet Inc.",
        ],
    ),
    (
        "Meta",
        &[
            "Meta Platforms, Inc.",
            "Facebook, Inc.",
            "Meta Platforms Technologies, LLC",
            "Facebook Technologies, LLC",
        ],
    ),
    ("Apple", &["Apple Inc."]),
    (
        "Amazon",
        &[
            "Amazon.com, Inc.",
            "Amazon Technologies, Inc.",
            "Amazon Technology, Inc.",
        ],
    ),
    (
        "Microsoft",
        &[
            "Microsoft Corporation",
            "MICROSOFT TECHNOLOGY LICENSING, LLC",
            "Microsoft Licensing Technology, LLC",
        ],
    ),
    ("OpenAI", &["OpenAI, Inc.", "OpenAi OPCo, LLC."]),
    ("Anthropic", &["Anthropic PBC"]),
    ("Hugging Face", &["Hugging Face, Inc."]),
    ("Cohere", &["Cohere Technologies, Inc."]),
    (
        "Nvidia",
        &[
            "NVIDIA CORPORATION",
            "NVIDIA Technologies, Inc.",
            "Nvidia Denmark ApS",
            "Nvidia Technology UK Limited",
        ],
    ),
    (
        "Tesla",
        &[
            "Tesla, Inc.",
            "Tesla Motors, Inc.",
            "Tesla Motors Canada ULC",
            "TESLA GROHMANN AUTOMATION GMBH",
        ],
    ),
    (
        "Uber",
        &[
            "Uber Technologies, Inc.",
            "Uber Technology, Inc.",
            "UBER HOLDINGS LIMITED",
        ],
    ),
    ("Waymo", &["Waymo LLC"]),
    ("IBM", &["IBM Corporation", "IBM INTERNATIONAL GROUP BV"]),
    (
        "Intel",
        &[
            "Intel Corporation",
            "Intel NDTM US LLC",
            "Intel IP Corporation",
            "Intel Germany GmbH & Co. KG",
        ],
    ),
    (
        "Qualcomm",
        &["QUALCOMM Incorporated", "QUALCOMM Technologies, Inc."],
    ),
    ("Adobe", &["Adobe Inc."]),
    (
        "Oracle",
        &[
            "Oracle Corporation",
            "Oracle International Corporation",
            "ORACLE SYSTEMS CORPORATION",
            "Oracle Financial Services Software Limited",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_variant() {
        let table = AliasTable::builtin();

        assert_eq!(table.resolve("Google LLC"), Some("Google"));
        assert_eq!(table.resolve("Facebook, Inc."), Some("Meta"));
        assert_eq!(table.resolve("Anthropic PBC"), Some("Anthropic"));
    }

    #[test]
    fn test_resolve_unknown_returns_none() {
        let table = AliasTable::builtin();

        assert_eq!(table.resolve("Some Startup LLC"), None);
        // Resolution is exact-match, not fuzzy
        assert_eq!(table.resolve("google llc"), None);
    }

    #[test]
    fn test_records_cover_every_variant() {
        let table = AliasTable::builtin();
        let records = table.records();

        let total_variants: usize = table.companies().map(|c| c.variants.len()).sum();
        assert_eq!(records.len(), total_variants);
        assert!(records.iter().all(|r| r.relationship_type == "legal_entity"));
    }

    #[test]
    fn test_roster_order_is_stable() {
        let table = AliasTable::builtin();
        let first: Vec<&str> = table.companies().take(3).map(|c| c.canonical.as_str()).collect();

        assert_eq!(first, vec!["Baidu", "Alibaba", "Tencent"]);
        assert_eq!(table.len(), 22);
    }
}
