// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! Cross-configuration equivalences: lazy loading, interpretation and
//! deep copies must never change what a chain produces.

mod common;

use common::{all_columns, as_i32, column, int_table, scan};
use forgedb_engine::{
	ExecutionConfig,
	test_utils::{Encoding, collect_column, jit_config, read_everything_tx, translator},
};
use forgedb_plan::{ComparisonOp, Expression, PlanNode, PlanRef};
use forgedb_type::{ColumnId, Value};

fn filtered_plan(table: &std::sync::Arc<forgedb_storage::Table>) -> PlanRef {
	let predicate = PlanNode::predicate(
		Expression::comparison(ComparisonOp::GreaterThan, column(table, 0), Expression::literal(4i32)),
		scan(table),
	);
	PlanNode::projection(all_columns(table), predicate)
}

fn run_with(config: ExecutionConfig, plan: &PlanRef, table: &std::sync::Arc<forgedb_storage::Table>) -> Vec<Value> {
	let wrapper = translator(config).translate_node(plan).unwrap().expect("plan must fuse");
	let output = wrapper.execute(table, &read_everything_tx()).unwrap();
	collect_column(&output.table, ColumnId(0))
}

#[test]
fn lazy_and_eager_loading_agree() {
	let table = int_table(Encoding::Plain, &[&[5, 1, 7, 3], &[9, 2, 8]]);
	let plan = filtered_plan(&table);

	let lazy = run_with(jit_config(), &plan, &table);
	let eager = run_with(ExecutionConfig { lazy_load: false, ..jit_config() }, &plan, &table);
	assert_eq!(lazy, eager);
	assert_eq!(as_i32(&lazy), vec![5, 7, 9, 8]);
}

#[test]
fn interpreted_and_specialized_execution_agree() {
	let table = int_table(Encoding::Dictionary, &[&[5, 1, 7, 3], &[9, 2, 8]]);
	let plan = filtered_plan(&table);

	let specialized = run_with(jit_config(), &plan, &table);
	let interpreted = run_with(ExecutionConfig { interpret: true, ..jit_config() }, &plan, &table);
	assert_eq!(specialized, interpreted);
}

#[test]
fn surviving_rows_keep_their_input_order() {
	let table = int_table(Encoding::Plain, &[&[5, 1, 7, 3], &[9, 2, 8]]);
	let plan = filtered_plan(&table);

	let output = run_with(jit_config(), &plan, &table);
	// The output is the order-preserving subsequence of the input.
	assert_eq!(as_i32(&output), vec![5, 7, 9, 8]);
}

#[test]
fn deep_copies_share_one_specialization() {
	let table = int_table(Encoding::Plain, &[&[1, 2, 3, 4]]);
	let plan = filtered_plan(&table);

	let wrapper = translator(jit_config()).translate_node(&plan).unwrap().expect("plan must fuse");
	let copy = wrapper.deep_copy();

	let first = wrapper.execute(&table, &read_everything_tx()).unwrap();
	let second = copy.execute(&table, &read_everything_tx()).unwrap();
	assert_eq!(
		collect_column(&first.table, ColumnId(0)),
		collect_column(&second.table, ColumnId(0))
	);
	assert_eq!(wrapper.specialization_passes(), 1);
	assert_eq!(copy.specialization_passes(), 1);
}

#[test]
fn measured_runs_produce_the_same_table() {
	let table = int_table(Encoding::Plain, &[&[3, 6, 9]]);
	let plan = filtered_plan(&table);

	let plain = run_with(jit_config(), &plan, &table);
	let measured = run_with(ExecutionConfig { measure: true, ..jit_config() }, &plan, &table);
	assert_eq!(plain, measured);
}
