//! Ping command - check that the configured deployment answers

use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use crate::config::Settings;
use crate::output::{Output, OutputConfig, Outputter};

/// Result of a successful ping.
#[derive(Debug, Serialize)]
pub struct PingResult {
    pub server: String,
    pub database: String,
    pub latency_ms: u64,
}

impl Outputter for PingResult {
    fn to_table(&self, config: &OutputConfig) -> String {
        let status = if config.use_colors() {
            "[OK]".green().to_string()
        } else {
            "[OK]".to_string()
        };
        format!(
            "{} {} ({}) answered in {}ms",
            status, self.server, self.database, self.latency_ms
        )
    }
}

/// Run the ping command.
pub async fn run(settings: &Settings, output: &OutputConfig) -> Result<()> {
    let lookups = super::connect(settings).await?;
    let server = settings.mongo.describe();

    let start = Instant::now();
    lookups
        .ping()
        .await
        .with_context(|| format!("No answer from {}", server))?;
    let latency_ms = start.elapsed().as_millis() as u64;

    let result = PingResult {
        server,
        database: lookups.store().database().to_string(),
        latency_ms,
    };
    Output::with_config(result, output.clone()).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_ping_result_table() {
        let result = PingResult {
            server: "127.0.0.1:27017/mongo".into(),
            database: "mongo".into(),
            latency_ms: 4,
        };
        let config = OutputConfig::new(OutputFormat::Table).without_colors();
        assert_eq!(
            result.to_table(&config),
            "[OK] 127.0.0.1:27017/mongo (mongo) answered in 4ms"
        );
    }
}
