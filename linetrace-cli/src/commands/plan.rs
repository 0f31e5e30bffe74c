//! Plan-machine command - look up a machine inside an active plan
//!
//! Descends `line -> process -> machine` inside the plan document and prints
//! one row per matching path, projected to the line, target count and the
//! line and process numbers.

use std::time::Instant;

use anyhow::Result;
use linetrace_core::{Page, PlanMachineQuery};

use super::results::{DocumentSet, PipelineView};
use crate::config::Settings;
use crate::output::{Output, OutputConfig};

/// Arguments for the plan-machine lookup.
#[derive(Debug, Clone)]
pub struct PlanMachineArgs {
    pub plan_id: String,
    pub line_id: String,
    pub process_id: String,
    pub machine: String,
}

/// Run the plan-machine command.
pub async fn run(
    settings: &Settings,
    args: &PlanMachineArgs,
    page: Page,
    explain: bool,
    output: &OutputConfig,
) -> Result<()> {
    let query = PlanMachineQuery::new(&args.plan_id, &args.line_id, &args.process_id, &args.machine)?;
    let collection = settings.collections.plan.clone();

    if explain {
        let view = PipelineView::new(collection, &query.pipeline(&page));
        return Output::with_config(view, output.clone()).render();
    }

    let lookups = super::connect(settings).await?;
    let start = Instant::now();
    let rows = lookups.plan_machine(&query, &page).await?;
    let elapsed = start.elapsed().as_millis() as u64;

    Output::with_config(DocumentSet::new(collection, rows, elapsed), output.clone()).render()
}
