// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Fundamental value and identifier types shared by every ForgeDB crate.

pub mod error;
pub mod id;
pub mod params;
pub mod value;

pub use error::TypeError;
pub use id::{ChunkId, ChunkOffset, ColumnId, CommitId, ParameterId, RowId, TransactionId, ValueId};
pub use params::Params;
pub use value::{Type, Value};

pub type Result<T> = std::result::Result<T, TypeError>;
