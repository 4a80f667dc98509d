// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_type::{ChunkOffset, ColumnId};
use parking_lot::RwLock;

use crate::{
	MvccColumns, StorageError,
	segment::Segment,
	table::{PosList, Table},
};

/// A horizontal partition of a table: one segment per column, all of the
/// same length, plus MVCC bookkeeping for data chunks.
#[derive(Debug, Clone)]
pub struct Chunk {
	segments: Vec<Arc<Segment>>,
	mvcc: Option<Arc<RwLock<MvccColumns>>>,
}

impl Chunk {
	pub fn new(segments: Vec<Arc<Segment>>) -> Self {
		debug_assert!(segments.windows(2).all(|pair| pair[0].len() == pair[1].len()));
		Self { segments, mvcc: None }
	}

	/// A data chunk with freshly initialized (all-visible) MVCC rows.
	pub fn with_mvcc(segments: Vec<Arc<Segment>>) -> Self {
		let len = segments.first().map_or(0, |segment| segment.len());
		let mut chunk = Self::new(segments);
		chunk.mvcc = Some(Arc::new(RwLock::new(MvccColumns::new(len))));
		chunk
	}

	pub fn size(&self) -> ChunkOffset {
		self.segments.first().map_or(0, |segment| segment.len()) as ChunkOffset
	}

	pub fn segments(&self) -> &[Arc<Segment>] {
		&self.segments
	}

	pub fn segment(&self, column_id: ColumnId) -> crate::Result<&Arc<Segment>> {
		self.segments.get(column_id.as_usize()).ok_or(StorageError::ColumnOutOfBounds { column: column_id })
	}

	pub fn has_mvcc(&self) -> bool {
		self.mvcc.is_some()
	}

	pub fn mvcc(&self) -> Option<&Arc<RwLock<MvccColumns>>> {
		self.mvcc.as_ref()
	}

	/// The table and position list this chunk references, verifying that
	/// every segment agrees on both. Data chunks return an error.
	pub fn reference_target(&self) -> crate::Result<(Arc<Table>, Arc<PosList>)> {
		let first = match self.segments.first().map(|segment| segment.as_ref()) {
			Some(Segment::Reference(reference)) => reference,
			_ => return Err(StorageError::InconsistentReferenceChunk),
		};
		for segment in &self.segments[1..] {
			match segment.as_ref() {
				Segment::Reference(reference)
					if Arc::ptr_eq(reference.referenced_table(), first.referenced_table())
						&& Arc::ptr_eq(reference.positions(), first.positions()) => {}
				_ => return Err(StorageError::InconsistentReferenceChunk),
			}
		}
		Ok((Arc::clone(first.referenced_table()), Arc::clone(first.positions())))
	}
}
