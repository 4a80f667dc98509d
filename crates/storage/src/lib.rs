// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Columnar storage: tables partitioned into chunks, chunks holding one
//! segment per column plus optional MVCC bookkeeping.

pub mod builder;
pub mod chunk;
pub mod error;
pub mod mvcc;
pub mod segment;
pub mod table;

pub use builder::ColumnBuilder;
pub use chunk::Chunk;
pub use error::StorageError;
pub use mvcc::MvccColumns;
pub use segment::{DictionarySegment, ReferenceSegment, Segment, SegmentData, ValueSegment};
pub use table::{ColumnDef, PosList, Table, TableKind};

pub type Result<T> = std::result::Result<T, StorageError>;
