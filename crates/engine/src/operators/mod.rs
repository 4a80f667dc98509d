// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

pub mod aggregate;
pub mod compute;
pub mod filter;
pub mod limit;
pub mod read_tuples;
pub mod read_value;
pub mod validate;
pub mod write_offset;
pub mod write_tuples;

use std::{sync::Arc, time::Instant};

use forgedb_storage::Table;

use crate::{EngineError, context::RuntimeContext, expression::ExpressionArena};

pub use aggregate::AggregateSink;
pub use compute::Compute;
pub use filter::Filter;
pub use limit::Limit;
pub use read_tuples::ReadTuples;
pub use read_value::ReadValue;
pub use validate::Validate;
pub use write_offset::WriteOffset;
pub use write_tuples::WriteTuples;

/// Discriminant used for metrics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
	ReadTuples,
	ReadValue,
	Validate,
	Compute,
	Filter,
	Limit,
	Aggregate,
	WriteTuples,
	WriteOffset,
}

impl OperatorKind {
	pub const COUNT: usize = 9;
}

/// One fine-grained operator of a fused chain.
#[derive(Debug)]
pub enum JitOperator {
	ReadTuples(ReadTuples),
	ReadValue(ReadValue),
	Validate(Validate),
	Compute(Compute),
	Filter(Filter),
	Limit(Limit),
	Aggregate(AggregateSink),
	WriteTuples(WriteTuples),
	WriteOffset(WriteOffset),
}

impl JitOperator {
	pub fn kind(&self) -> OperatorKind {
		match self {
			JitOperator::ReadTuples(_) => OperatorKind::ReadTuples,
			JitOperator::ReadValue(_) => OperatorKind::ReadValue,
			JitOperator::Validate(_) => OperatorKind::Validate,
			JitOperator::Compute(_) => OperatorKind::Compute,
			JitOperator::Filter(_) => OperatorKind::Filter,
			JitOperator::Limit(_) => OperatorKind::Limit,
			JitOperator::Aggregate(_) => OperatorKind::Aggregate,
			JitOperator::WriteTuples(_) => OperatorKind::WriteTuples,
			JitOperator::WriteOffset(_) => OperatorKind::WriteOffset,
		}
	}

	pub fn is_sink(&self) -> bool {
		matches!(
			self,
			JitOperator::Aggregate(_) | JitOperator::WriteTuples(_) | JitOperator::WriteOffset(_)
		)
	}

	pub fn description(&self, expressions: &ExpressionArena) -> String {
		match self {
			JitOperator::ReadTuples(op) => op.description(),
			JitOperator::ReadValue(op) => op.description(),
			JitOperator::Validate(op) => op.description(),
			JitOperator::Compute(op) => op.description(expressions),
			JitOperator::Filter(op) => op.description(),
			JitOperator::Limit(op) => op.description(),
			JitOperator::Aggregate(op) => op.description(),
			JitOperator::WriteTuples(op) => op.description(),
			JitOperator::WriteOffset(op) => op.description(),
		}
	}

	/// The tuple slots this operator reads, each with a flag telling
	/// whether the operator could load the slot itself (computes and
	/// filters fuse loads; everything else needs the value beforehand).
	pub fn accessed_slots(&self, expressions: &ExpressionArena) -> Vec<(usize, bool)> {
		let mut slots = match self {
			JitOperator::Compute(op) => expressions
				.column_slots(op.expression())
				.into_iter()
				.map(|slot| (slot.index(), true))
				.collect(),
			JitOperator::Filter(op) => vec![(op.condition().index(), true)],
			JitOperator::Aggregate(op) => {
				let mut slots: Vec<(usize, bool)> =
					op.group_by_columns().iter().map(|column| (column.slot.index(), false)).collect();
				slots.extend(
					op.aggregate_columns()
						.iter()
						.filter_map(|column| column.slot)
						.map(|slot| (slot.index(), false)),
				);
				slots
			}
			JitOperator::WriteTuples(op) => {
				op.outputs().iter().map(|output| (output.slot.index(), false)).collect()
			}
			_ => Vec::new(),
		};
		slots.sort_unstable();
		slots.dedup_by_key(|entry| entry.0);
		slots
	}
}

/// An ordered chain of operators plus the expression arena they share.
/// The source is always first and a sink always last; control flow is
/// push style, each operator consuming the current row and tail-calling
/// the next index.
#[derive(Debug)]
pub struct OperatorChain {
	pub(crate) expressions: ExpressionArena,
	pub(crate) ops: Vec<JitOperator>,
	pub(crate) loads_inserted: bool,
}

impl OperatorChain {
	pub fn new(expressions: ExpressionArena, ops: Vec<JitOperator>) -> crate::Result<Self> {
		match ops.first() {
			Some(JitOperator::ReadTuples(_)) => {}
			_ => return Err(EngineError::invalid_plan("operator chain without a source")),
		}
		if !ops.last().map_or(false, JitOperator::is_sink) {
			return Err(EngineError::invalid_plan("operator chain without a sink"));
		}
		Ok(Self { expressions, ops, loads_inserted: false })
	}

	pub fn expressions(&self) -> &ExpressionArena {
		&self.expressions
	}

	pub fn operators(&self) -> &[JitOperator] {
		&self.ops
	}

	pub fn source(&self) -> &ReadTuples {
		match &self.ops[0] {
			JitOperator::ReadTuples(source) => source,
			_ => unreachable!("validated at construction"),
		}
	}

	pub(crate) fn source_mut(&mut self) -> &mut ReadTuples {
		match &mut self.ops[0] {
			JitOperator::ReadTuples(source) => source,
			_ => unreachable!("validated at construction"),
		}
	}

	pub fn sink(&self) -> &JitOperator {
		self.ops.last().expect("validated at construction")
	}

	pub fn descriptions(&self) -> Vec<String> {
		self.ops.iter().map(|op| op.description(&self.expressions)).collect()
	}

	/// Run the source's per-tuple loop over the currently bound chunk.
	pub fn execute(&self, ctx: &mut RuntimeContext) -> crate::Result<()> {
		self.source().execute(self, ctx)
	}

	/// Push the current row into the operator at `index`.
	pub(crate) fn consume(&self, index: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let Some(op) = self.ops.get(index) else {
			return Ok(());
		};
		if ctx.measure {
			let kind = op.kind();
			let start = Instant::now();
			let outcome = self.dispatch(op, index, ctx);
			ctx.metrics.add_operator_time(kind, start.elapsed());
			outcome
		} else {
			self.dispatch(op, index, ctx)
		}
	}

	fn dispatch(&self, op: &JitOperator, index: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		match op {
			// The source only appears at index zero and never consumes.
			JitOperator::ReadTuples(_) => Ok(()),
			JitOperator::ReadValue(op) => op.consume(self, index + 1, ctx),
			JitOperator::Validate(op) => op.consume(self, index + 1, ctx),
			JitOperator::Compute(op) => op.consume(self, index + 1, ctx),
			JitOperator::Filter(op) => op.consume(self, index + 1, ctx),
			JitOperator::Limit(op) => op.consume(self, index + 1, ctx),
			JitOperator::Aggregate(op) => op.consume(ctx),
			JitOperator::WriteTuples(op) => op.consume(ctx),
			JitOperator::WriteOffset(op) => op.consume(ctx),
		}
	}

	pub(crate) fn sink_create_output_table(&self, in_table: &Table) -> Table {
		match self.sink() {
			JitOperator::Aggregate(sink) => sink.create_output_table(in_table),
			JitOperator::WriteTuples(sink) => sink.create_output_table(in_table),
			JitOperator::WriteOffset(sink) => sink.create_output_table(in_table),
			_ => unreachable!("validated at construction"),
		}
	}

	pub(crate) fn sink_before_query(&self, ctx: &mut RuntimeContext) {
		match self.sink() {
			JitOperator::Aggregate(sink) => sink.before_query(ctx),
			JitOperator::WriteTuples(sink) => sink.before_query(ctx),
			JitOperator::WriteOffset(sink) => sink.before_query(ctx),
			_ => unreachable!("validated at construction"),
		}
	}

	pub(crate) fn sink_after_chunk(
		&self,
		in_table: &Arc<Table>,
		out_table: &mut Table,
		ctx: &mut RuntimeContext,
	) -> crate::Result<()> {
		match self.sink() {
			JitOperator::Aggregate(_) => Ok(()),
			JitOperator::WriteTuples(sink) => sink.after_chunk(out_table, ctx),
			JitOperator::WriteOffset(sink) => sink.after_chunk(in_table, out_table, ctx),
			_ => unreachable!("validated at construction"),
		}
	}

	pub(crate) fn sink_after_query(&self, out_table: &mut Table, ctx: &mut RuntimeContext) -> crate::Result<()> {
		match self.sink() {
			JitOperator::Aggregate(sink) => sink.after_query(out_table, ctx),
			JitOperator::WriteTuples(sink) => sink.after_query(out_table, ctx),
			JitOperator::WriteOffset(sink) => sink.after_query(out_table, ctx),
			_ => unreachable!("validated at construction"),
		}
	}
}
