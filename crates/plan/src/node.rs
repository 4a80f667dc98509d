// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_storage::Table;
use forgedb_type::ColumnId;

use crate::expression::{AggregateExpression, Expression};

/// Shared handle to a plan node. Plans are DAGs (a union's two predicate
/// branches join back at a common input), so node identity is pointer
/// identity.
pub type PlanRef = Arc<PlanNode>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
	TableScan,
	IndexScan,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
	StoredTable {
		name: String,
		table: Arc<Table>,
	},
	Predicate {
		predicate: Expression,
		scan_type: ScanType,
	},
	Projection {
		expressions: Vec<Expression>,
	},
	Aggregate {
		group_by: Vec<Expression>,
		aggregates: Vec<AggregateExpression>,
	},
	Validate,
	Limit {
		row_count: Expression,
	},
	Union,
	Sort {
		expressions: Vec<Expression>,
	},
}

#[derive(Debug, Clone)]
pub struct PlanNode {
	pub kind: NodeKind,
	pub left: Option<PlanRef>,
	pub right: Option<PlanRef>,
}

impl PlanNode {
	pub fn stored_table(name: impl Into<String>, table: Arc<Table>) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::StoredTable { name: name.into(), table }, left: None, right: None })
	}

	pub fn predicate(predicate: Expression, input: PlanRef) -> PlanRef {
		Self::scan_predicate(predicate, ScanType::TableScan, input)
	}

	pub fn scan_predicate(predicate: Expression, scan_type: ScanType, input: PlanRef) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Predicate { predicate, scan_type }, left: Some(input), right: None })
	}

	pub fn projection(expressions: Vec<Expression>, input: PlanRef) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Projection { expressions }, left: Some(input), right: None })
	}

	pub fn aggregate(
		group_by: Vec<Expression>,
		aggregates: Vec<AggregateExpression>,
		input: PlanRef,
	) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Aggregate { group_by, aggregates }, left: Some(input), right: None })
	}

	pub fn validate(input: PlanRef) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Validate, left: Some(input), right: None })
	}

	pub fn limit(row_count: Expression, input: PlanRef) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Limit { row_count }, left: Some(input), right: None })
	}

	pub fn union(left: PlanRef, right: PlanRef) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Union, left: Some(left), right: Some(right) })
	}

	pub fn sort(expressions: Vec<Expression>, input: PlanRef) -> PlanRef {
		Arc::new(PlanNode { kind: NodeKind::Sort { expressions }, left: Some(input), right: None })
	}

	pub fn left_input(&self) -> Option<&PlanRef> {
		self.left.as_ref()
	}

	pub fn right_input(&self) -> Option<&PlanRef> {
		self.right.as_ref()
	}

	/// The columns this node produces, as expressions. Aggregate nodes
	/// are excluded from lookups below them (they are always chain
	/// roots), so they only report their group-by columns here.
	pub fn output_expressions(&self) -> Vec<Expression> {
		match &self.kind {
			NodeKind::StoredTable { table, .. } => (0..table.column_count())
				.map(|index| Expression::column(table, ColumnId(index as u16)))
				.collect(),
			NodeKind::Projection { expressions } => expressions.clone(),
			NodeKind::Aggregate { group_by, .. } => group_by.clone(),
			NodeKind::Predicate { .. }
			| NodeKind::Validate
			| NodeKind::Limit { .. }
			| NodeKind::Union
			| NodeKind::Sort { .. } => {
				self.left.as_ref().map(|input| input.output_expressions()).unwrap_or_default()
			}
		}
	}

	/// Resolve `expression` to a position in this node's output. For a
	/// stored table the position equals the physical column id.
	pub fn find_column_id(&self, expression: &Expression) -> Option<ColumnId> {
		self.output_expressions()
			.iter()
			.position(|candidate| candidate == expression)
			.map(|index| ColumnId(index as u16))
	}
}

#[cfg(test)]
mod tests {
	use forgedb_storage::{ColumnDef, Table, TableKind, table::DEFAULT_MAX_CHUNK_SIZE};
	use forgedb_type::Type;

	use super::*;

	fn table() -> Arc<Table> {
		Arc::new(Table::new(
			vec![ColumnDef::new("a", Type::Int4, false), ColumnDef::new("b", Type::Int8, true)],
			TableKind::Data,
			DEFAULT_MAX_CHUNK_SIZE,
		))
	}

	#[test]
	fn stored_table_positions_are_column_ids() {
		let table = table();
		let node = PlanNode::stored_table("t", Arc::clone(&table));
		let b = Expression::column(&table, ColumnId(1));
		assert_eq!(node.find_column_id(&b), Some(ColumnId(1)));
	}

	#[test]
	fn passthrough_nodes_expose_their_inputs_columns() {
		let table = table();
		let scan = PlanNode::stored_table("t", Arc::clone(&table));
		let validated = PlanNode::validate(scan);
		let a = Expression::column(&table, ColumnId(0));
		assert_eq!(validated.find_column_id(&a), Some(ColumnId(0)));
	}

	#[test]
	fn computed_columns_are_not_resolvable_on_the_input() {
		let table = table();
		let scan = PlanNode::stored_table("t", Arc::clone(&table));
		let computed = Expression::arithmetic(
			crate::ArithmeticOp::Add,
			Expression::column(&table, ColumnId(0)),
			Expression::literal(1i32),
		);
		assert_eq!(scan.find_column_id(&computed), None);
	}

	#[test]
	fn columns_of_a_different_table_do_not_resolve() {
		let node = PlanNode::stored_table("t", table());
		let other = table();
		let foreign = Expression::column(&other, ColumnId(0));
		assert_eq!(node.find_column_id(&foreign), None);
	}
}
