// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

// Shared between the integration test binaries; not every binary uses
// every helper.
#![allow(dead_code)]

use std::sync::Arc;

use forgedb_engine::test_utils::{Encoding, build_table};
use forgedb_plan::{Expression, PlanNode, PlanRef};
use forgedb_storage::{ColumnDef, Table};
use forgedb_type::{ColumnId, Type, Value};

/// Single-column table `t(a int4)` with one chunk per slice.
pub fn int_table(encoding: Encoding, chunks: &[&[i32]]) -> Arc<Table> {
	let chunks: Vec<Vec<Vec<Value>>> = chunks
		.iter()
		.map(|values| vec![values.iter().map(|v| Value::Int4(*v)).collect()])
		.collect();
	build_table(vec![(ColumnDef::new("a", Type::Int4, false), encoding)], &chunks, false)
}

pub fn scan(table: &Arc<Table>) -> PlanRef {
	PlanNode::stored_table("t", Arc::clone(table))
}

pub fn column(table: &Arc<Table>, index: u16) -> Expression {
	Expression::column(table, ColumnId(index))
}

/// All of the table's columns, as a projection list.
pub fn all_columns(table: &Arc<Table>) -> Vec<Expression> {
	(0..table.column_count()).map(|index| column(table, index as u16)).collect()
}

pub fn as_i32(values: &[Value]) -> Vec<i32> {
	values
		.iter()
		.map(|value| match value {
			Value::Int4(v) => *v,
			other => panic!("expected int4, got {other:?}"),
		})
		.collect()
}
