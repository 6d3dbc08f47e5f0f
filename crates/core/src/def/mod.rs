// Copyright (c) tesseradb.com 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

mod column;
mod index;
mod partition;
mod schema;
mod sequence;
mod state;
mod table;

pub use column::{ColumnDef, ColumnIndex, Type};
pub use index::IndexDef;
pub use partition::PartitionDef;
pub use schema::SchemaDef;
pub use sequence::SequenceDef;
pub use state::SchemaState;
pub use table::TableDef;
