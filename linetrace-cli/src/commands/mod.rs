//! Command implementations for the linetrace CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod ping;
pub mod plan;
pub mod production;
pub mod results;

use anyhow::{Context, Result};
use linetrace_core::{Lookups, MongoStore};

use crate::config::Settings;

/// Build the MongoDB-backed lookups for the resolved settings.
pub async fn connect(settings: &Settings) -> Result<Lookups<MongoStore>> {
    let store = MongoStore::connect(&settings.mongo)
        .await
        .with_context(|| format!("Failed to set up client for {}", settings.mongo.describe()))?;
    Ok(Lookups::new(store).with_collections(settings.collections.clone()))
}
