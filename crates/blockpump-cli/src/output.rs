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

//! Console output helpers shared by the commands.
//!
//! Messages go to stdout, errors to stderr. Logs and progress bars use stderr as well, so
//! stdout carries only the run summary.

use console::style;

/// Print a header line
pub fn header(msg: &str) {
    println!("{} {}", style("📦").green().bold(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", style("✅").green().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", style("⚠️").yellow(), msg);
}

/// Print an error message to stderr
pub fn error(msg: &str) {
    eprintln!("{} {}", style("❌").red().bold(), msg);
}

/// Print an indented `key: value` line
pub fn detail(key: &str, value: &str) {
    println!("  {}: {}", key, style(value).cyan());
}
