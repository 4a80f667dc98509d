// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Jittability decisions: what fuses, what falls back, and which sink a
//! fused chain ends in.

mod common;

use common::{all_columns, as_i32, column, int_table, scan};
use forgedb_engine::{
	ExecutionConfig,
	operators::OperatorKind,
	test_utils::{Encoding, collect_column, jit_config, read_everything_tx, translator},
};
use forgedb_plan::{ComparisonOp, Expression, PlanNode, ScanType};
use forgedb_type::{ColumnId, ParameterId, Type};

#[test]
fn a_disabled_jit_never_fuses() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(1i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	assert!(translator(ExecutionConfig::default()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn a_single_predicate_is_not_worth_fusing() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let plan = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(1i32)),
		scan(&table),
	);

	assert!(translator(jit_config()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn index_scans_stay_on_the_non_jit_path() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let predicate = PlanNode::scan_predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(1i32)),
		ScanType::IndexScan,
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	assert!(translator(jit_config()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn like_predicates_fall_back() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let predicate = PlanNode::predicate(
		Expression::Like {
			value: Box::new(column(&table, 0)),
			pattern: Box::new(Expression::literal("1%")),
			negated: false,
		},
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	assert!(translator(jit_config()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn in_predicates_fall_back() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let predicate = PlanNode::predicate(
		Expression::In {
			value: Box::new(column(&table, 0)),
			list: vec![Expression::literal(1i32), Expression::literal(2i32)],
			negated: false,
		},
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	assert!(translator(jit_config()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn string_against_number_falls_back() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::Equals, column(&table, 0), Expression::literal("5")),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	assert!(translator(jit_config()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn an_untyped_placeholder_reaching_translation_is_an_error() {
	// Aggregate arguments are not type-checked during subtree
	// selection, so the placeholder is only discovered while the chain
	// is being built; the query must fail instead of silently falling
	// back.
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let plan = PlanNode::aggregate(
		Vec::new(),
		vec![forgedb_plan::AggregateExpression::new(
			forgedb_plan::AggregateFunction::Sum,
			Some(Expression::Parameter { id: ParameterId(0), ty: None, nullable: false }),
		)],
		scan(&table),
	);

	let error = match translator(jit_config()).translate_node(&plan) {
		Err(error) => error,
		Ok(_) => panic!("expected a configuration error"),
	};
	assert!(matches!(error, forgedb_engine::EngineError::UnknownParameterType { parameter: ParameterId(0) }));
}

#[test]
fn untyped_placeholders_fall_back() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(
			ComparisonOp::Equals,
			column(&table, 0),
			Expression::Parameter { id: ParameterId(0), ty: None, nullable: false },
		),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	assert!(translator(jit_config()).translate_node(&plan).unwrap().is_none());
}

#[test]
fn a_union_of_predicates_fuses_into_a_disjunction() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3, 4, 5, 6, 7, 8, 9]]);
	let base = scan(&table);
	let low = PlanNode::predicate(
		Expression::comparison(ComparisonOp::LessThan, column(&table, 0), Expression::literal(3i32)),
		base.clone(),
	);
	let high = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(7i32)),
		base,
	);
	let plan = PlanNode::projection(all_columns(&table), PlanNode::union(low, high));

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![1, 2, 8, 9]);
}

#[test]
fn union_fusion_honours_the_predicate_knob() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3]]);
	let base = scan(&table);
	let low = PlanNode::predicate(
		Expression::comparison(ComparisonOp::LessThan, column(&table, 0), Expression::literal(2i32)),
		base.clone(),
	);
	let high = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(2i32)),
		base,
	);
	let plan = PlanNode::projection(all_columns(&table), PlanNode::union(low, high));

	let config = ExecutionConfig { jit_predicate: false, ..jit_config() };
	assert!(translator(config).translate_node(&plan).unwrap().is_none());
}

#[test]
fn computed_outputs_materialize_through_write_tuples() {
	let table = int_table(Encoding::Plain, &[&[1, 3, 5]]);
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(2i32)),
		scan(&table),
	);
	let incremented = Expression::arithmetic(
		forgedb_plan::ArithmeticOp::Add,
		column(&table, 0),
		Expression::literal(1i32),
	);
	let plan = PlanNode::projection(vec![incremented], predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let kinds = wrapper.with_chain(|chain| chain.operators().iter().map(|op| op.kind()).collect::<Vec<_>>());
	assert_eq!(kinds.last(), Some(&OperatorKind::WriteTuples));

	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(output.table.columns()[0].ty, Type::Int4);
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![4, 6]);
}

#[test]
fn redundant_not_equals_zero_is_elided() {
	// The SQL translator wraps boolean predicates as `<expr> != 0`; the
	// fused chain filters on the expression directly.
	let table = int_table(Encoding::Plain, &[&[1, 2, 3, 4]]);
	let inner = Expression::comparison(ComparisonOp::GreaterThan, column(&table, 0), Expression::literal(2i32));
	let wrapped = Expression::comparison(ComparisonOp::NotEquals, inner, Expression::literal(0i32));
	let predicate = PlanNode::predicate(wrapped, scan(&table));
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(as_i32(&collect_column(&output.table, ColumnId(0))), vec![3, 4]);
}

#[test]
fn translation_allocates_the_same_slots_every_time() {
	let table = int_table(Encoding::Dictionary, &[&[1, 2, 3, 4]]);
	let predicate = PlanNode::predicate(
		Expression::between(column(&table, 0), Expression::literal(2i32), Expression::literal(3i32)),
		scan(&table),
	);
	let plan = PlanNode::projection(all_columns(&table), predicate);

	let translator = translator(jit_config());
	let first = translator.translate_node(&plan).unwrap().expect("plan must fuse");
	let second = translator.translate_node(&plan).unwrap().expect("plan must fuse");

	let slots = |wrapper: &forgedb_engine::JitOperatorWrapper| {
		wrapper.with_chain(|chain| (chain.source().num_slots(), chain.descriptions()))
	};
	assert_eq!(slots(&first), slots(&second));
}
