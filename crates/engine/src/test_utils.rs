// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Helpers for the crate's own tests: small tables in both encodings,
//! a ready-made translator, and column materialization.

use std::sync::Arc;

use forgedb_storage::{
	Chunk, ColumnDef, DictionarySegment, ReferenceSegment, Segment, Table, TableKind, ValueSegment,
	table::{DEFAULT_MAX_CHUNK_SIZE, PosList},
};
use forgedb_transaction::TransactionContext;
use forgedb_type::{ChunkId, ColumnId, CommitId, RowId, TransactionId, Value};

use crate::{ExecutionConfig, InterpretingCodeGenerator, JitAwareTranslator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	Plain,
	Dictionary,
}

/// Build a data table. `chunks[c][col]` holds the values of column
/// `col` in chunk `c`; every chunk gets fresh (all-visible) MVCC rows
/// when `with_mvcc` is set.
pub fn build_table(
	columns: Vec<(ColumnDef, Encoding)>,
	chunks: &[Vec<Vec<Value>>],
	with_mvcc: bool,
) -> Arc<Table> {
	let defs = columns.iter().map(|(def, _)| def.clone()).collect();
	let mut table = Table::new(defs, TableKind::Data, DEFAULT_MAX_CHUNK_SIZE);
	for chunk_values in chunks {
		assert_eq!(chunk_values.len(), columns.len());
		let segments = columns
			.iter()
			.zip(chunk_values)
			.map(|((def, encoding), values)| {
				let segment = match encoding {
					Encoding::Plain => Segment::Value(
						ValueSegment::from_values(def.ty, def.nullable, values).unwrap(),
					),
					Encoding::Dictionary => {
						Segment::Dictionary(DictionarySegment::from_values(def.ty, values).unwrap())
					}
				};
				Arc::new(segment)
			})
			.collect();
		let chunk = if with_mvcc { Chunk::with_mvcc(segments) } else { Chunk::new(segments) };
		table.add_chunk(chunk);
	}
	Arc::new(table)
}

/// Wrap every row of `table` into a reference table (one reference
/// chunk per data chunk).
pub fn reference_all_rows(table: &Arc<Table>) -> Arc<Table> {
	let defs = table.columns().to_vec();
	let mut reference = Table::new(defs, TableKind::References, table.max_chunk_size());
	for (index, chunk) in table.chunks().iter().enumerate() {
		let positions: PosList = (0..chunk.size())
			.map(|offset| RowId::new(ChunkId(index as u32), offset))
			.collect();
		let positions = Arc::new(positions);
		let segments = (0..table.column_count())
			.map(|column| {
				Arc::new(Segment::Reference(ReferenceSegment::new(
					Arc::clone(table),
					ColumnId(column as u16),
					Arc::clone(&positions),
				)))
			})
			.collect();
		reference.add_chunk(Chunk::new(segments));
	}
	Arc::new(reference)
}

/// Materialize one column of a table, resolving references and
/// dictionary codes, in `(chunk_id, chunk_offset)` order.
pub fn collect_column(table: &Table, column_id: ColumnId) -> Vec<Value> {
	let mut values = Vec::new();
	for chunk in table.chunks() {
		let segment = chunk.segment(column_id).unwrap();
		for offset in 0..segment.len() {
			values.push(segment.get(offset).unwrap());
		}
	}
	values
}

pub fn jit_config() -> ExecutionConfig {
	ExecutionConfig { jit: true, ..ExecutionConfig::default() }
}

pub fn translator(config: ExecutionConfig) -> JitAwareTranslator {
	JitAwareTranslator::new(config, Arc::new(InterpretingCodeGenerator))
}

/// A transaction that sees every committed row.
pub fn read_everything_tx() -> TransactionContext {
	TransactionContext::new(TransactionId(1), CommitId(100))
}
