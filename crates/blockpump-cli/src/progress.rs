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

//! Terminal progress for pump runs.

use blockpump_core::{ProgressWriter, TotalCount};
use indicatif::{HumanCount, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.cyan} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%, {per_sec}, {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} {pos} blocks ({per_sec})";

/// Progress bar when the total is known, spinner otherwise
///
/// Draws to stderr; hidden in quiet mode.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(msg: &str, quiet: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        bar.set_message(msg.to_string());
        BarProgress { bar }
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

impl ProgressWriter for BarProgress {
    fn set_total(&self, total: TotalCount) {
        match total {
            TotalCount::Known(n) => {
                self.bar.set_length(n);
                self.bar.set_style(style(BAR_TEMPLATE));
            }
            TotalCount::Unknown => {
                self.bar.unset_length();
                self.bar.set_style(style(SPINNER_TEMPLATE));
            }
        }
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn increment(&self) {
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar
            .finish_with_message(format!("{} blocks done", HumanCount(self.bar.position())));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_total_sets_length() {
        let progress = BarProgress::new("copy", true);
        progress.set_total(TotalCount::Known(3));
        progress.increment();
        progress.increment();
        assert_eq!(progress.bar.length(), Some(3));
        assert_eq!(progress.bar.position(), 2);
        progress.finish();
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn test_unknown_total_is_unbounded() {
        let progress = BarProgress::new("copy", true);
        progress.set_total(TotalCount::Unknown);
        progress.increment();
        assert_eq!(progress.bar.length(), None);
        assert_eq!(progress.bar.position(), 1);
    }
}
