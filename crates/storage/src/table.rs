// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_type::{ChunkId, ColumnId, RowId, Type};
use serde::{Deserialize, Serialize};

use crate::{Chunk, StorageError};

/// Ordered row positions, shared by the reference segments of one chunk.
pub type PosList = Vec<RowId>;

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 65_535;

/// Whether a table owns its rows or references another table's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
	Data,
	References,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
	pub name: String,
	pub ty: Type,
	pub nullable: bool,
}

impl ColumnDef {
	pub fn new(name: impl Into<String>, ty: Type, nullable: bool) -> Self {
		Self { name: name.into(), ty, nullable }
	}
}

#[derive(Debug)]
pub struct Table {
	columns: Vec<ColumnDef>,
	chunks: Vec<Chunk>,
	kind: TableKind,
	max_chunk_size: usize,
}

impl Table {
	pub fn new(columns: Vec<ColumnDef>, kind: TableKind, max_chunk_size: usize) -> Self {
		Self { columns, chunks: Vec::new(), kind, max_chunk_size }
	}

	pub fn kind(&self) -> TableKind {
		self.kind
	}

	pub fn max_chunk_size(&self) -> usize {
		self.max_chunk_size
	}

	pub fn columns(&self) -> &[ColumnDef] {
		&self.columns
	}

	pub fn column_count(&self) -> usize {
		self.columns.len()
	}

	pub fn column_def(&self, column_id: ColumnId) -> crate::Result<&ColumnDef> {
		self.columns.get(column_id.as_usize()).ok_or(StorageError::ColumnOutOfBounds { column: column_id })
	}

	pub fn column_type(&self, column_id: ColumnId) -> crate::Result<Type> {
		Ok(self.column_def(column_id)?.ty)
	}

	pub fn column_is_nullable(&self, column_id: ColumnId) -> crate::Result<bool> {
		Ok(self.column_def(column_id)?.nullable)
	}

	pub fn find_column(&self, name: &str) -> Option<ColumnId> {
		self.columns.iter().position(|column| column.name == name).map(|index| ColumnId(index as u16))
	}

	pub fn chunk_count(&self) -> usize {
		self.chunks.len()
	}

	pub fn chunks(&self) -> &[Chunk] {
		&self.chunks
	}

	pub fn chunk(&self, chunk_id: ChunkId) -> crate::Result<&Chunk> {
		self.chunks.get(chunk_id.0 as usize).ok_or(StorageError::ChunkOutOfBounds { chunk: chunk_id })
	}

	pub fn add_chunk(&mut self, chunk: Chunk) {
		debug_assert_eq!(chunk.segments().len(), self.columns.len());
		self.chunks.push(chunk);
	}

	pub fn row_count(&self) -> usize {
		self.chunks.iter().map(|chunk| chunk.size() as usize).sum()
	}
}
