//! Production-process command - find production records by embedded process
//!
//! Unwinds `process_embed` and keeps the entries whose `_id` matches,
//! optionally restricted to one production document.

use std::time::Instant;

use anyhow::Result;
use linetrace_core::{Page, ProductionProcessQuery};

use super::results::{DocumentSet, PipelineView};
use crate::config::Settings;
use crate::output::{Output, OutputConfig};

/// Run the production-process command.
pub async fn run(
    settings: &Settings,
    process_embed_id: &str,
    production_id: Option<&str>,
    page: Page,
    explain: bool,
    output: &OutputConfig,
) -> Result<()> {
    let mut query = ProductionProcessQuery::new(process_embed_id)?;
    if let Some(production_id) = production_id {
        query = query.in_production(production_id)?;
    }
    let collection = settings.collections.production.clone();

    if explain {
        let view = PipelineView::new(collection, &query.pipeline(&page));
        return Output::with_config(view, output.clone()).render();
    }

    let lookups = super::connect(settings).await?;
    let start = Instant::now();
    let rows = lookups.production_process(&query, &page).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Output::with_config(DocumentSet::new(collection, rows, elapsed), output.clone()).render()
}
