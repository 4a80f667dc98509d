// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_type::{ColumnId, Type, Value};

use crate::{
	StorageError,
	table::{PosList, Table},
};

/// A segment that does not store values itself but points into another
/// table through a position list. Reference segments of one chunk share
/// the position list, so one chunk always references one table.
#[derive(Debug, Clone)]
pub struct ReferenceSegment {
	table: Arc<Table>,
	column_id: ColumnId,
	positions: Arc<PosList>,
}

impl ReferenceSegment {
	pub fn new(table: Arc<Table>, column_id: ColumnId, positions: Arc<PosList>) -> Self {
		Self { table, column_id, positions }
	}

	pub fn referenced_table(&self) -> &Arc<Table> {
		&self.table
	}

	pub fn referenced_column(&self) -> ColumnId {
		self.column_id
	}

	pub fn positions(&self) -> &Arc<PosList> {
		&self.positions
	}

	pub fn ty(&self) -> Type {
		self.table.column_type(self.column_id).unwrap_or(Type::Undefined)
	}

	pub fn len(&self) -> usize {
		self.positions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}

	pub fn get(&self, offset: usize) -> crate::Result<Value> {
		let row_id =
			*self.positions.get(offset).ok_or(StorageError::OffsetOutOfBounds { offset, len: self.len() })?;
		let chunk = self.table.chunk(row_id.chunk_id)?;
		chunk.segment(self.column_id)?.get(row_id.chunk_offset as usize)
	}
}
