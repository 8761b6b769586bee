// Blockpump - Block Migration for Content-Addressed Stores
// Copyright (C) 2026 Blockpump Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

mod pin;
mod run;

pub use pin::PinCmd;
pub use run::RunCmd;

use crate::output;
use crate::progress::BarProgress;
use anyhow::{Context, Result};
use blockpump_core::{Collector, Drain, Enumerator, Pump, PumpConfig, PumpReport};
use std::path::Path;
use std::sync::Arc;

/// Stages and sinks of one run, ready to start
pub(crate) struct Pipeline {
    pub enumerator: Arc<dyn Enumerator>,
    pub collector: Arc<dyn Collector>,
    pub drain: Arc<dyn Drain>,
    pub config: PumpConfig,
}

impl Pipeline {
    /// Run to completion with a progress bar and an optional failed-blocks file
    pub async fn execute(
        self,
        label: &str,
        failed_blocks_path: Option<&Path>,
        quiet: bool,
    ) -> Result<PumpReport> {
        let failed = blockpump_core::factory::failed_blocks_sink(failed_blocks_path)
            .await
            .context("Cannot create failed-blocks file")?;

        let report = Pump::new(self.enumerator, self.collector, self.drain, self.config)
            .with_failed_blocks(failed)
            .with_progress(Arc::new(BarProgress::new(label, quiet)))
            .run()
            .await?;

        if !quiet {
            summarize(&report, failed_blocks_path);
        }
        Ok(report)
    }
}

fn summarize(report: &PumpReport, failed_blocks_path: Option<&Path>) {
    if report.failed == 0 {
        output::success(&report.to_string());
    } else {
        output::warning(&report.to_string());
        match failed_blocks_path {
            Some(path) if !path.as_os_str().is_empty() => {
                output::detail("Failed keys", &path.display().to_string())
            }
            _ => output::detail("Failed keys", "discarded (no --failed-blocks-path)"),
        }
    }
}
