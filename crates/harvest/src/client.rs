use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

use crate::aliases::Company;

/// Tuning knobs for the PatentsView search client. Defaults match the
/// published rate guidance: fixed pauses, not adaptive backoff.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub page_size: usize,
    pub page_delay: Duration,
    pub variant_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://search.patentsview.org/api/v1/patent/".to_string(),
            page_size: 1000,
            page_delay: Duration::from_secs(1),
            variant_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// One patent object as returned by the search endpoint. Every nested
/// list may be absent; missing fields are tolerated, never fatal.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPatent {
    pub patent_id: String,
    #[serde(default)]
    pub patent_title: Option<String>,
    #[serde(default)]
    pub patent_date: Option<String>,
    #[serde(default)]
    pub assignees: Option<Vec<RawAssignee>>,
    #[serde(default)]
    pub inventors: Option<Vec<RawInventor>>,
    #[serde(default)]
    pub application: Option<Vec<RawApplication>>,
    #[serde(default)]
    pub patent_num_times_cited_by_us_patents: Option<u64>,
}

impl RawPatent {
    /// Filing date of the first application entry, if any.
    pub fn filing_date(&self) -> Option<&str> {
        self.application
            .as_deref()
            .and_then(|apps| apps.first())
            .and_then(|a| a.filing_date.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAssignee {
    #[serde(default)]
    pub assignee_organization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawInventor {
    #[serde(default)]
    pub inventor_id: Option<String>,
    #[serde(default)]
    pub inventor_name_first: Option<String>,
    #[serde(default)]
    pub inventor_name_last: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawApplication {
    #[serde(default)]
    pub filing_date: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    patents: Vec<RawPatent>,
}

/// Client for the PatentsView patent search endpoint.
pub struct PatentsViewClient {
    api_key: String,
    config: ClientConfig,
    client: reqwest::Client,
}

impl PatentsViewClient {
    pub fn new(api_key: String, config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            config,
            client,
        })
    }

    /// Build the boolean query document for one name variant: phrase match
    /// on the assignee organization, date-range filters on both filing and
    /// grant dates, ascending patent-id sort, cursor in `o.after`.
    pub fn build_query(
        &self,
        variant: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        after: Option<&str>,
    ) -> serde_json::Value {
        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();

        let mut options = json!({ "size": self.config.page_size });
        if let Some(cursor) = after {
            options["after"] = json!(cursor);
        }

        json!({
            "q": {
                "_and": [
                    { "_text_phrase": { "assignees.assignee_organization": variant } },
                    { "_gte": { "application.filing_date": start } },
                    { "_lte": { "application.filing_date": end } },
                    { "_gte": { "patent_date": start } },
                    { "_lte": { "patent_date": end } }
                ]
            },
            "f": [
                "patent_id", "patent_title", "patent_date",
                "application.filing_date",
                "assignees.assignee_organization",
                "inventors.inventor_id",
                "inventors.inventor_name_first",
                "inventors.inventor_name_last",
                "patent_num_times_cited_by_us_patents"
            ],
            "s": [{ "patent_id": "asc" }],
            "o": options
        })
    }

    async fn fetch_page(
        &self,
        variant: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        after: Option<&str>,
    ) -> Result<Vec<RawPatent>> {
        let payload = self.build_query(variant, start_date, end_date, after);

        let response = self
            .client
            .post(&self.config.base_url)
            .header("X-Api-Key", &self.api_key)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Failed to reach PatentsView")?;

        if !response.status().is_success() {
            anyhow::bail!("PatentsView request failed: {}", response.status());
        }

        let body: SearchResponse = response
            .json()
            .await
            .context("Failed to parse search response")?;

        Ok(body.patents)
    }

    /// Page through all results for one name variant. The cursor is the
    /// last-seen patent id; a short page ends the variant.
    pub async fn search_variant(
        &self,
        variant: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawPatent>> {
        let mut all = Vec::new();
        let mut after: Option<String> = None;
        let mut earliest_filing: Option<String> = None;

        loop {
            let batch = self
                .fetch_page(variant, start_date, end_date, after.as_deref())
                .await?;
            if batch.is_empty() {
                break;
            }

            let page_dates: Vec<&str> = batch.iter().filter_map(|p| p.filing_date()).collect();
            let batch_min = page_dates.iter().min().map(|d| d.to_string());
            let batch_max = page_dates.iter().max().map(|d| d.to_string());
            if let Some(min) = &batch_min {
                // ISO dates compare correctly as strings
                if earliest_filing.as_deref().is_none_or(|e| min.as_str() < e) {
                    earliest_filing = Some(min.clone());
                }
            }

            let batch_len = batch.len();
            all.extend(batch);

            info!(
                variant,
                retrieved = batch_len,
                total = all.len(),
                batch_min = batch_min.as_deref().unwrap_or("-"),
                batch_max = batch_max.as_deref().unwrap_or("-"),
                oldest_filing = earliest_filing.as_deref().unwrap_or("-"),
                "Retrieved page"
            );

            if last_page(batch_len, self.config.page_size) {
                break;
            }

            after = all.last().map(|p| p.patent_id.clone());
            sleep(self.config.page_delay).await;
        }

        Ok(all)
    }

    /// Query every name variant of a company and merge the results,
    /// deduplicating by patent id.
    pub async fn search_company(
        &self,
        company: &Company,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RawPatent>> {
        let mut all_raw = Vec::new();

        for variant in &company.variants {
            info!(company = %company.canonical, variant = %variant, "Querying variant");
            let batch = self.search_variant(variant, start_date, end_date).await?;
            all_raw.extend(batch);
            sleep(self.config.variant_delay).await;
        }

        let patents = dedup_by_patent_id(all_raw);
        info!(
            company = %company.canonical,
            unique_patents = patents.len(),
            "Company search complete"
        );
        Ok(patents)
    }
}

/// True when a page signals the end of a variant's results.
pub fn last_page(batch_len: usize, page_size: usize) -> bool {
    batch_len < page_size
}

/// Deduplicate merged variant results by patent id, keeping first
/// occurrence order. Duplicate ids carry identical content.
pub fn dedup_by_patent_id(raw: Vec<RawPatent>) -> Vec<RawPatent> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|p| seen.insert(p.patent_id.clone()))
        .collect()
}
