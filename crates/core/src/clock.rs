// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. History timestamps only need to
/// be monotonic per owner, which single-writer commit ordering already
/// guarantees.
pub fn now_millis() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
