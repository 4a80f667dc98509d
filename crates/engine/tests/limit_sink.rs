// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Limit semantics and sink selection: passthrough outputs use the
//! position-recording sink, and the limit stops the source early.

mod common;

use common::{all_columns, as_i32, int_table, scan};
use forgedb_engine::{
	EngineError,
	operators::OperatorKind,
	test_utils::{Encoding, collect_column, jit_config, read_everything_tx, translator},
};
use forgedb_plan::{Expression, PlanNode};
use forgedb_type::{ColumnId, Value};

#[test]
fn limit_over_passthrough_columns_records_positions_only() {
	let table = int_table(Encoding::Plain, &[&[10, 20, 30], &[40, 50]]);
	let plan = PlanNode::limit(
		Expression::literal(3i64),
		PlanNode::projection(all_columns(&table), scan(&table)),
	);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let kinds = wrapper.with_chain(|chain| chain.operators().iter().map(|op| op.kind()).collect::<Vec<_>>());
	assert_eq!(kinds, vec![OperatorKind::ReadTuples, OperatorKind::Limit, OperatorKind::WriteOffset]);

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![10, 20, 30]);
}

#[test]
fn limit_spanning_chunks_keeps_the_original_order() {
	let table = int_table(Encoding::Plain, &[&[1, 2], &[3, 4], &[5, 6]]);
	let plan = PlanNode::limit(
		Expression::literal(5i64),
		PlanNode::projection(all_columns(&table), scan(&table)),
	);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![1, 2, 3, 4, 5]);
}

#[test]
fn limit_zero_reads_nothing() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let plan = PlanNode::limit(
		Expression::literal(0i64),
		PlanNode::projection(all_columns(&table), scan(&table)),
	);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(output.table.row_count(), 0);
}

#[test]
fn negative_limit_is_a_configuration_error() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let plan = PlanNode::limit(
		Expression::literal(-1i64),
		PlanNode::projection(all_columns(&table), scan(&table)),
	);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let error = wrapper.execute(&table, &read_everything_tx()).unwrap_err();
	assert!(matches!(error, EngineError::LimitRowCountNegative { rows: -1 }));
}

#[test]
fn null_limit_is_a_configuration_error() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let plan = PlanNode::limit(
		Expression::Literal(Value::Undefined),
		PlanNode::projection(all_columns(&table), scan(&table)),
	);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let error = wrapper.execute(&table, &read_everything_tx()).unwrap_err();
	assert!(matches!(error, EngineError::LimitRowCountNull));
}

#[test]
fn limit_expression_arithmetic_is_folded() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3, 4]]);
	let plan = PlanNode::limit(
		Expression::arithmetic(
			forgedb_plan::ArithmeticOp::Add,
			Expression::literal(1i64),
			Expression::literal(1i64),
		),
		PlanNode::projection(all_columns(&table), scan(&table)),
	);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![1, 2]);
}
