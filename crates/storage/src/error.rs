// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_type::{ChunkId, ColumnId, Type, TypeError};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StorageError {
	#[error("segment holds {actual} values but {expected} was requested")]
	TypeMismatch {
		expected: Type,
		actual: Type,
	},

	#[error("{column} does not exist in this table")]
	ColumnOutOfBounds {
		column: ColumnId,
	},

	#[error("{chunk} does not exist in this table")]
	ChunkOutOfBounds {
		chunk: ChunkId,
	},

	#[error("reference chunk does not reference exactly one table and position list")]
	InconsistentReferenceChunk,

	#[error("row offset {offset} is out of bounds for a segment of {len} rows")]
	OffsetOutOfBounds {
		offset: usize,
		len: usize,
	},

	#[error(transparent)]
	Type(#[from] TypeError),
}
