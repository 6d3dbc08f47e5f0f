// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

// #![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(not(debug_assertions), deny(warnings))]

pub use builder::InfoSchemaBuilder;
pub use cache::{CacheLookup, InfoCache};
pub use catalog::Catalog;
pub use info_schema::InfoSchema;
pub use load::{rebuild_at_timestamp, rebuild_at_version};

mod builder;
mod cache;
mod catalog;
mod info_schema;
mod load;

#[cfg(test)]
mod test_support;

pub type Result<T> = tessera_core::Result<T>;
