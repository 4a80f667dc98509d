// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Value-id pushdown: predicates over dictionary-encoded columns run on
//! integer codes, with literals resolved through each chunk's
//! dictionary.

mod common;

use common::{all_columns, as_i32, column, int_table, scan};
use forgedb_engine::{
	expression::ExprKind,
	test_utils::{Encoding, collect_column, jit_config, read_everything_tx, translator},
};
use forgedb_plan::{ComparisonOp, Expression, PlanNode};
use forgedb_type::{ColumnId, ParameterId, Params, Type};

#[test]
fn filter_on_dictionary_column_rewrites_to_value_ids() {
	let table = int_table(Encoding::Dictionary, &[&[1, 3, 3, 5, 7, 9]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThanEquals, column(&table, 0), Expression::literal(3i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");

	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].op, ExprKind::GreaterThanEquals);
	assert!(records[0].literal_index.is_some());

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![3, 3, 5, 7, 9]);
}

#[test]
fn between_decomposes_into_two_value_id_records() {
	let table = int_table(Encoding::Dictionary, &[&[0, 2, 4, 6, 8, 10]]);
	let predicate = PlanNode::predicate(
		Expression::between(column(&table, 0), Expression::literal(2i32), Expression::literal(8i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");

	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 2);
	assert_eq!(records[0].op, ExprKind::GreaterThanEquals);
	// The upper half keeps its `<=`; its per-chunk resolution goes
	// through the dictionary's upper bound.
	assert_eq!(records[1].op, ExprKind::LessThanEquals);

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![2, 4, 6, 8]);
}

#[test]
fn literal_missing_from_the_dictionary_matches_nothing() {
	let table = int_table(Encoding::Dictionary, &[&[10, 20, 30]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::Equals, column(&table, 0), Expression::literal(15i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].op, ExprKind::Equals);

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(output.table.row_count(), 0);
}

#[test]
fn not_equals_on_a_missing_literal_keeps_every_row() {
	let table = int_table(Encoding::Dictionary, &[&[10, 20, 30]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::NotEquals, column(&table, 0), Expression::literal(15i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![10, 20, 30]);
}

#[test]
fn swapped_operands_are_normalized_to_the_column_side() {
	// `7 > a` must behave as `a < 7`.
	let table = int_table(Encoding::Dictionary, &[&[1, 5, 7, 9]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, Expression::literal(7i32), column(&table, 0)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].op, ExprKind::LessThan);

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![1, 5]);
}

#[test]
fn swapped_less_than_rewrites_against_the_upper_bound() {
	// `7 < a` must behave as `a > 7`: the node flips to `<=` in its
	// literal-on-the-left form and the record keeps the `>` so the
	// chunk resolution picks the upper bound.
	let table = int_table(Encoding::Dictionary, &[&[1, 3, 5, 7, 9]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::LessThan, Expression::literal(7i32), column(&table, 0)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].op, ExprKind::GreaterThan);

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![9]);
}

#[test]
fn swapped_greater_than_equals_rewrites_against_the_upper_bound() {
	// `7 >= a` must behave as `a <= 7`: the node flips to `>` in its
	// literal-on-the-left form and the record keeps the `<=` so the
	// chunk resolution picks the upper bound.
	let table = int_table(Encoding::Dictionary, &[&[1, 3, 5, 7, 9]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThanEquals, Expression::literal(7i32), column(&table, 0)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 1);
	assert_eq!(records[0].op, ExprKind::LessThanEquals);

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![1, 3, 5, 7]);
}

#[test]
fn value_id_parameters_resolve_per_chunk() {
	let table = int_table(Encoding::Dictionary, &[&[1, 3, 5], &[2, 4, 6]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(
			ComparisonOp::GreaterThanEquals,
			column(&table, 0),
			Expression::Parameter { id: ParameterId(0), ty: Some(Type::Int4), nullable: false },
		),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let mut wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let records = wrapper.with_chain(|chain| chain.source().value_id_predicates().to_vec());
	assert_eq!(records.len(), 1);
	assert!(records[0].parameter_index.is_some());

	wrapper.set_parameters(Params::empty().bind(ParameterId(0), 4i32));
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![5, 4, 6]);
}

#[test]
fn plain_encodings_keep_the_value_id_path_off() {
	// The column is not dictionary encoded, so the predicate cannot be
	// rewritten, but the scan still fuses and filters correctly.
	let table = int_table(Encoding::Plain, &[&[1, 3, 5, 7]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThanEquals, column(&table, 0), Expression::literal(5i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	assert!(wrapper.with_chain(|chain| chain.source().value_id_predicates().is_empty()));

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![5, 7]);
}
