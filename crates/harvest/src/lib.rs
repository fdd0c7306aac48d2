pub mod aliases;
pub mod checkpoint;
pub mod client;
pub mod rows;

pub use aliases::{AliasRecord, AliasTable, Company};
pub use checkpoint::Manifest;
pub use client::{ClientConfig, PatentsViewClient, RawPatent};
pub use rows::PatentRow;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{error, info, warn};

/// Drives the per-company harvest loop: query all variants, dedup,
/// explode into inventor rows, append to the output table, mark done.
/// One company's failure never aborts the run; it is retried on the
/// next invocation because it was not marked done.
pub struct Harvester {
    client: PatentsViewClient,
    aliases: AliasTable,
}

impl Harvester {
    pub fn new(api_key: String, aliases: AliasTable, config: ClientConfig) -> Result<Self> {
        let client = PatentsViewClient::new(api_key, config)?;
        Ok(Self { client, aliases })
    }

    /// Harvest every company in the roster not already marked done,
    /// appending each company's rows after its full harvest succeeds.
    pub async fn run(&self, start_date: NaiveDate, end_date: NaiveDate, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let manifest_path = Manifest::path_for(output);
        let mut manifest = Manifest::load(&manifest_path);
        if manifest.is_empty() && output.exists() {
            // Output written before the manifest existed; recover the
            // done set from the table itself.
            let canonical = self.aliases.canonical_set();
            let processed = checkpoint::processed_from_csv(output, &canonical);
            if !processed.is_empty() {
                info!(companies = ?processed, "Resuming from existing output table");
                manifest.seed_done(processed);
            }
        }

        for company in self.aliases.companies() {
            if manifest.is_done(&company.canonical) {
                info!(company = %company.canonical, "Skipping (already done)");
                continue;
            }

            match self.harvest_company(company, start_date, end_date).await {
                Ok(company_rows) => {
                    if company_rows.is_empty() {
                        warn!(company = %company.canonical, "No data; marking done with no rows");
                    }
                    rows::append_rows(output, &company_rows)?;
                    manifest.mark_done(&company.canonical);
                    manifest.save(&manifest_path)?;
                    info!(
                        company = %company.canonical,
                        rows = company_rows.len(),
                        "Saved company rows"
                    );
                }
                Err(e) => {
                    error!(
                        company = %company.canonical,
                        error = %e,
                        "Company harvest failed; will retry on next run"
                    );
                }
            }
        }

        info!(
            done = manifest.done_count(),
            total = self.aliases.len(),
            output = %output.display(),
            "Harvest pass complete"
        );
        Ok(())
    }

    async fn harvest_company(
        &self,
        company: &Company,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PatentRow>> {
        let patents = self
            .client
            .search_company(company, start_date, end_date)
            .await?;
        Ok(rows::explode(&patents, &self.aliases))
    }
}
