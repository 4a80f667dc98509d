// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::{collections::HashMap, sync::Arc};

use forgedb_storage::{ColumnBuilder, MvccColumns, Table, table::PosList};
use forgedb_type::{ChunkId, ChunkOffset, CommitId, TransactionId};
use parking_lot::{ArcRwLockReadGuard, RawRwLock};

use crate::{
	metrics::Metrics,
	operators::aggregate::{GroupKey, GroupState},
	reader::SegmentReader,
	tuple::RuntimeTuple,
};

pub type MvccReadGuard = ArcRwLockReadGuard<RawRwLock, MvccColumns>;

/// Mutable state a sink accumulates while rows stream in.
#[derive(Debug)]
pub enum SinkState {
	None,
	/// One builder per output column of a materializing sink.
	Tuples(Vec<ColumnBuilder>),
	/// Row positions of the current chunk, drained per chunk.
	Offsets(PosList),
	/// Open-addressed group map of the aggregate sink.
	Aggregate(HashMap<GroupKey, GroupState>),
}

/// Everything one execution of a fused chain needs at runtime. Stack
/// scoped: created when the wrapper starts executing, dropped when it
/// returns. Never shared across executions.
pub struct RuntimeContext {
	pub tuple: RuntimeTuple,
	pub readers: Vec<SegmentReader>,
	pub chunk_id: ChunkId,
	pub chunk_offset: ChunkOffset,
	pub chunk_size: ChunkOffset,
	pub own_tid: TransactionId,
	pub snapshot_cid: CommitId,
	/// Shared lock over the current data chunk's MVCC vectors.
	pub mvcc: Option<MvccReadGuard>,
	/// Plain per-chunk snapshot of the row transaction ids, filled when
	/// the hot loop must not touch atomics.
	pub row_tids: Option<Vec<TransactionId>>,
	/// For reference chunks: the table the chunk points into.
	pub referenced_table: Option<Arc<Table>>,
	/// For reference chunks: the shared position list.
	pub pos_list: Option<Arc<PosList>>,
	/// Rows the chain may still emit; decremented by the limit operator
	/// and checked by the source at the top of its loop.
	pub remaining_rows: u64,
	pub sink: SinkState,
	pub metrics: Metrics,
	pub measure: bool,
}

impl RuntimeContext {
	pub fn new(own_tid: TransactionId, snapshot_cid: CommitId, measure: bool) -> Self {
		Self {
			tuple: RuntimeTuple::default(),
			readers: Vec::new(),
			chunk_id: ChunkId(0),
			chunk_offset: 0,
			chunk_size: 0,
			own_tid,
			snapshot_cid,
			mvcc: None,
			row_tids: None,
			referenced_table: None,
			pos_list: None,
			remaining_rows: u64::MAX,
			sink: SinkState::None,
			metrics: Metrics::default(),
			measure,
		}
	}

	/// Let reader `index` pull the current row's value into its slot.
	pub fn read_input(&mut self, index: usize) -> crate::Result<()> {
		let Self { readers, tuple, chunk_offset, .. } = self;
		readers[index].read_into(*chunk_offset, tuple)
	}
}
