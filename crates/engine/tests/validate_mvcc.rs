// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! MVCC validation over data and reference tables: the fused validate
//! operator must agree with the row-visibility rules row by row.

mod common;

use std::sync::Arc;

use common::{all_columns, as_i32, int_table, scan};
use forgedb_engine::{
	ExecutionConfig,
	test_utils::{Encoding, collect_column, jit_config, reference_all_rows, translator},
};
use forgedb_plan::PlanNode;
use forgedb_storage::Table;
use forgedb_transaction::TransactionContext;
use forgedb_type::{ChunkId, ColumnId, CommitId, TransactionId};

/// The canonical three-chunk visibility fixture: snapshot 3, own
/// transaction 5, expected visibility
/// `[false, true, false, false, true, false, true, true]`.
fn seeded_table() -> Arc<Table> {
	let table = {
		let chunks: Vec<Vec<Vec<forgedb_type::Value>>> = vec![
			vec![(1..=3).map(forgedb_type::Value::Int4).collect()],
			vec![(4..=6).map(forgedb_type::Value::Int4).collect()],
			vec![(7..=8).map(forgedb_type::Value::Int4).collect()],
		];
		forgedb_engine::test_utils::build_table(
			vec![(forgedb_storage::ColumnDef::new("a", forgedb_type::Type::Int4, false), Encoding::Plain)],
			&chunks,
			true,
		)
	};

	let seed = |chunk: u32, rows: &[(u64, CommitId, u64)]| {
		let chunk = table.chunk(ChunkId(chunk)).unwrap();
		let mvcc = chunk.mvcc().unwrap();
		let mut mvcc = mvcc.write();
		for (offset, (begin, end, tid)) in rows.iter().enumerate() {
			mvcc.set_begin_cid(offset, CommitId(*begin));
			mvcc.set_end_cid(offset, *end);
			mvcc.set_tid(offset, TransactionId(*tid));
		}
	};

	// deleted, visible, inserted after the snapshot
	seed(0, &[(1, CommitId(2), 0), (1, CommitId::MAX, 0), (10, CommitId::MAX, 0)]);
	// others' pending insert, own insert, own delete
	seed(1, &[(4, CommitId::MAX, 4), (5, CommitId::MAX, 5), (3, CommitId(5), 5)]);
	// others' uncommitted delete, delete committed after the snapshot
	seed(2, &[(1, CommitId(4), 4), (1, CommitId(9), 0)]);

	table
}

fn validating_tx() -> TransactionContext {
	TransactionContext::new(TransactionId(5), CommitId(3))
}

#[test]
fn visibility_on_a_data_table() {
	let table = seeded_table();
	let plan = PlanNode::projection(all_columns(&table), PlanNode::validate(scan(&table)));

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &validating_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![2, 5, 7, 8]);
}

#[test]
fn visibility_on_a_reference_table() {
	let table = seeded_table();
	let reference = reference_all_rows(&table);

	// A sort produces the reference input, so the validate fuses over a
	// reference table.
	let sorted = PlanNode::sort(all_columns(&table), scan(&table));
	let plan = PlanNode::projection(all_columns(&table), PlanNode::validate(sorted));

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&reference, &validating_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![2, 5, 7, 8]);
}

#[test]
fn materialized_transaction_ids_match_atomic_loads() {
	let table = seeded_table();
	let plan = PlanNode::projection(all_columns(&table), PlanNode::validate(scan(&table)));

	let config = ExecutionConfig { use_load_atomic: false, ..jit_config() };
	let wrapper = translator(config).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &validating_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![2, 5, 7, 8]);
}

#[test]
fn an_aborted_transaction_produces_no_output() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let plan = PlanNode::projection(all_columns(&table), PlanNode::validate(scan(&table)));

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let tx = validating_tx();
	tx.abort();
	let output = wrapper.execute(&table, &tx).unwrap();
	assert_eq!(output.table.row_count(), 0);
}

#[test]
fn validation_can_be_disabled() {
	let table = seeded_table();
	let plan = PlanNode::projection(all_columns(&table), PlanNode::validate(scan(&table)));

	let config = ExecutionConfig { jit_validate: false, ..jit_config() };
	// With validate not jittable the subtree degenerates to a single
	// projection, which is not worth fusing.
	assert!(translator(config).translate_node(&plan).unwrap().is_none());
}
