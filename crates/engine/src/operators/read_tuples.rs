// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_plan::Expression;
use forgedb_storage::{Chunk, Segment, Table};
use forgedb_type::{ChunkId, ColumnId, ParameterId, Params, Type, Value, ValueId};

use crate::{
	EngineError,
	context::RuntimeContext,
	expression::{ExprId, ExprKind, ExpressionArena},
	operators::OperatorChain,
	reader::{ReaderKind, SegmentReader},
	tuple::TupleSlot,
};

/// A table column the chain reads. `ty` is the declared column type;
/// for value-id columns the slot is typed `ValueId` instead and the
/// reader is built over the dictionary's attribute vector.
#[derive(Debug, Clone)]
pub struct InputColumn {
	pub column_id: ColumnId,
	pub ty: Type,
	pub slot: TupleSlot,
	pub use_value_id: bool,
}

#[derive(Debug, Clone)]
pub struct InputLiteral {
	pub value: Value,
	pub slot: TupleSlot,
	pub use_value_id: bool,
}

#[derive(Debug, Clone)]
pub struct InputParameter {
	pub parameter_id: ParameterId,
	pub slot: TupleSlot,
	pub use_value_id: bool,
}

/// One rewritten comparison: which input column it scans, the comparison
/// that holds over value ids (normalized to column-on-the-left), and the
/// literal or parameter whose slot receives the per-chunk resolved id.
#[derive(Debug, Clone)]
pub struct ValueIdPredicate {
	pub input_column_index: usize,
	pub op: ExprKind,
	pub literal_index: Option<usize>,
	pub parameter_index: Option<usize>,
}

/// The first operator of every chain. It allocates every slot of the
/// runtime tuple, stores literal and parameter values before execution,
/// builds the per-chunk segment readers, resolves value-id predicates
/// against each chunk's dictionary, and drives the per-row loop.
#[derive(Debug)]
pub struct ReadTuples {
	num_slots: u16,
	has_validate: bool,
	use_load_atomic: bool,
	lazy: bool,
	row_count_expression: Option<Expression>,
	input_columns: Vec<InputColumn>,
	input_literals: Vec<InputLiteral>,
	input_parameters: Vec<InputParameter>,
	value_id_predicates: Vec<ValueIdPredicate>,
	/// Reader kinds of the chunk the execute function was chosen
	/// against; a chunk with different kinds falls back to
	/// interpretation.
	baseline_kinds: Option<Vec<ReaderKind>>,
}

impl ReadTuples {
	pub fn new(has_validate: bool, row_count_expression: Option<Expression>, use_load_atomic: bool) -> Self {
		Self {
			num_slots: 0,
			has_validate,
			use_load_atomic,
			lazy: false,
			row_count_expression,
			input_columns: Vec::new(),
			input_literals: Vec::new(),
			input_parameters: Vec::new(),
			value_id_predicates: Vec::new(),
			baseline_kinds: None,
		}
	}

	pub fn description(&self) -> String {
		let mut parts = Vec::new();
		for column in &self.input_columns {
			parts.push(format!(
				"{}{} x{} = {}",
				if column.use_value_id { "(V) " } else { "" },
				column.ty,
				column.slot.index(),
				column.column_id
			));
		}
		for literal in &self.input_literals {
			parts.push(format!(
				"{}{} x{} = {}",
				if literal.use_value_id { "(V) " } else { "" },
				literal.slot.ty(),
				literal.slot.index(),
				literal.value
			));
		}
		for parameter in &self.input_parameters {
			parts.push(format!(
				"{}{} x{} = {}",
				if parameter.use_value_id { "(V) " } else { "" },
				parameter.slot.ty(),
				parameter.slot.index(),
				parameter.parameter_id
			));
		}
		format!("[ReadTuples] {}", parts.join(", "))
	}

	pub fn has_validate(&self) -> bool {
		self.has_validate
	}

	pub fn set_lazy(&mut self, lazy: bool) {
		self.lazy = lazy;
	}

	pub fn row_count_expression(&self) -> Option<&Expression> {
		self.row_count_expression.as_ref()
	}

	pub fn num_slots(&self) -> u16 {
		self.num_slots
	}

	pub fn input_columns(&self) -> &[InputColumn] {
		&self.input_columns
	}

	pub fn input_literals(&self) -> &[InputLiteral] {
		&self.input_literals
	}

	pub fn input_parameters(&self) -> &[InputParameter] {
		&self.input_parameters
	}

	pub fn value_id_predicates(&self) -> &[ValueIdPredicate] {
		&self.value_id_predicates
	}

	/// Request a slot for a table column. Requesting the same column with
	/// the same encoding twice returns the slot assigned the first time.
	pub fn add_input_column(
		&mut self,
		ty: Type,
		nullable: bool,
		column_id: ColumnId,
		use_value_id: bool,
	) -> TupleSlot {
		if let Some(existing) = self
			.input_columns
			.iter()
			.find(|column| column.column_id == column_id && column.use_value_id == use_value_id)
		{
			return existing.slot;
		}
		let slot_ty = if use_value_id { Type::ValueId } else { ty };
		let slot = TupleSlot::new(self.next_slot(), slot_ty, nullable);
		self.input_columns.push(InputColumn { column_id, ty, slot, use_value_id });
		slot
	}

	/// Request a slot holding a literal. The value is written into the
	/// tuple before the query runs; value-id literals are resolved per
	/// chunk instead and never deduplicated.
	pub fn add_literal(&mut self, value: Value, use_value_id: bool) -> TupleSlot {
		if !use_value_id {
			if let Some(existing) =
				self.input_literals.iter().find(|literal| literal.value == value && !literal.use_value_id)
			{
				return existing.slot;
			}
		}
		let (ty, nullable) =
			if use_value_id { (Type::ValueId, false) } else { (value.ty(), value.is_undefined()) };
		let slot = TupleSlot::new(self.next_slot(), ty, nullable);
		self.input_literals.push(InputLiteral { value, slot, use_value_id });
		slot
	}

	pub fn add_parameter(
		&mut self,
		ty: Type,
		nullable: bool,
		parameter_id: ParameterId,
		use_value_id: bool,
	) -> TupleSlot {
		if !use_value_id {
			if let Some(existing) = self
				.input_parameters
				.iter()
				.find(|parameter| parameter.parameter_id == parameter_id && !parameter.use_value_id)
			{
				return existing.slot;
			}
		}
		let slot_ty = if use_value_id { Type::ValueId } else { ty };
		let slot = TupleSlot::new(self.next_slot(), slot_ty, nullable);
		self.input_parameters.push(InputParameter { parameter_id, slot, use_value_id });
		slot
	}

	/// Request an anonymous slot for an expression result.
	pub fn add_temporary_slot(&mut self) -> u16 {
		self.next_slot()
	}

	fn next_slot(&mut self) -> u16 {
		let index = self.num_slots;
		self.num_slots += 1;
		index
	}

	pub fn find_input_column(&self, slot: &TupleSlot) -> Option<ColumnId> {
		self.input_columns.iter().find(|column| column.slot == *slot).map(|column| column.column_id)
	}

	pub fn find_literal(&self, slot: &TupleSlot) -> Option<&Value> {
		self.input_literals
			.iter()
			.find(|literal| literal.slot.index() == slot.index())
			.map(|literal| &literal.value)
	}

	/// Record a comparison that runs on value ids. The expression node is
	/// normalized so the per-chunk bound lookup makes the rewritten
	/// integer comparison match the original predicate: a `>` turns into
	/// `>=` and a `<=` into `<` against the dictionary's upper bound.
	pub fn add_value_id_predicate(
		&mut self,
		expressions: &mut ExpressionArena,
		expr: ExprId,
	) -> crate::Result<()> {
		debug_assert!(expressions.kind(expr).is_comparison(), "only binary comparisons can use value ids");
		let node = expressions.node(expr);
		let (left, right) = match (node.left, node.right) {
			(Some(left), Some(right)) => (left, right),
			_ => return Err(EngineError::invalid_plan("value id predicate without two operands")),
		};
		let (left_slot, right_slot) = (expressions.result(left), expressions.result(right));

		// The matching entries were registered last, so search backwards.
		let find_column = |slot: &TupleSlot| {
			self.input_columns.iter().rposition(|column| column.slot == *slot && column.use_value_id)
		};
		let mut column_index = find_column(&left_slot);
		let swap = column_index.is_none();
		if swap {
			column_index = find_column(&right_slot);
		}
		let column_index = column_index
			.ok_or_else(|| EngineError::invalid_plan("value id predicate without a value id column"))?;

		let other_slot = if swap { left_slot } else { right_slot };
		let literal_index = self
			.input_literals
			.iter()
			.rposition(|literal| literal.slot == other_slot && literal.use_value_id);
		let parameter_index = match literal_index {
			Some(_) => None,
			None => self
				.input_parameters
				.iter()
				.rposition(|parameter| parameter.slot == other_slot && parameter.use_value_id),
		};
		if literal_index.is_none() && parameter_index.is_none() {
			return Err(EngineError::invalid_plan("value id predicate without a literal or parameter"));
		}

		let op = if swap { expressions.kind(expr).swapped() } else { expressions.kind(expr) };
		if op == ExprKind::GreaterThan {
			expressions
				.set_kind(expr, if swap { ExprKind::LessThanEquals } else { ExprKind::GreaterThanEquals });
		} else if op == ExprKind::LessThanEquals {
			expressions.set_kind(expr, if swap { ExprKind::GreaterThan } else { ExprKind::LessThan });
		}

		self.value_id_predicates.push(ValueIdPredicate {
			input_column_index: column_index,
			op,
			literal_index,
			parameter_index,
		});
		Ok(())
	}

	pub(crate) fn set_baseline_kinds(&mut self, kinds: Option<Vec<ReaderKind>>) {
		self.baseline_kinds = kinds;
	}

	pub(crate) fn build_readers(&self, chunk: &Chunk) -> crate::Result<Vec<SegmentReader>> {
		self.input_columns
			.iter()
			.map(|column| SegmentReader::build(chunk.segment(column.column_id)?, column.slot, column.use_value_id))
			.collect()
	}

	/// Size the runtime tuple, materialize literal and parameter slots,
	/// and evaluate the limit's row-count expression.
	pub fn before_query(&self, params: &Params, ctx: &mut RuntimeContext) -> crate::Result<()> {
		ctx.tuple.resize(self.num_slots as usize);
		ctx.remaining_rows = match &self.row_count_expression {
			Some(expression) => evaluate_row_count(expression, params)?,
			None => u64::MAX,
		};
		for literal in &self.input_literals {
			if !literal.use_value_id {
				ctx.tuple.set_value(&literal.slot, &literal.value);
			}
		}
		for parameter in &self.input_parameters {
			if parameter.use_value_id {
				continue;
			}
			let value = params
				.get(parameter.parameter_id)
				.ok_or(EngineError::UnboundParameter { parameter: parameter.parameter_id })?;
			let value = value.cast_to(parameter.slot.ty())?;
			ctx.tuple.set_value(&parameter.slot, &value);
		}
		Ok(())
	}

	/// Bind one chunk: build the segment readers, bind MVCC state for the
	/// validate operator, resolve value-id literals and parameters
	/// through the chunk's dictionaries. Returns whether the chunk's
	/// reader types match the ones the execute function was chosen for.
	pub fn before_chunk(
		&self,
		in_table: &Table,
		chunk_id: ChunkId,
		params: &Params,
		ctx: &mut RuntimeContext,
	) -> crate::Result<bool> {
		let chunk = in_table.chunk(chunk_id)?;
		ctx.chunk_id = chunk_id;
		ctx.chunk_offset = 0;
		ctx.chunk_size = chunk.size();
		ctx.mvcc = None;
		ctx.row_tids = None;
		ctx.referenced_table = None;
		ctx.pos_list = None;

		if self.has_validate {
			if let Some(mvcc) = chunk.mvcc() {
				if !self.use_load_atomic {
					let mut tids = Vec::new();
					mvcc.read().materialize_tids(&mut tids);
					ctx.row_tids = Some(tids);
				}
				ctx.mvcc = Some(mvcc.read_arc());
			} else {
				let (referenced_table, pos_list) = chunk
					.reference_target()
					.map_err(|_| EngineError::mvcc("validate input references more than one table"))?;
				ctx.referenced_table = Some(referenced_table);
				ctx.pos_list = Some(pos_list);
			}
		}

		ctx.readers = self.build_readers(chunk)?;
		self.resolve_value_id_predicates(chunk, params, ctx)?;

		let same_type = match &self.baseline_kinds {
			Some(baseline) => {
				baseline.len() == ctx.readers.len()
					&& baseline
						.iter()
						.zip(ctx.readers.iter())
						.all(|(kind, reader)| *kind == reader.kind())
			}
			None => true,
		};
		Ok(same_type)
	}

	fn resolve_value_id_predicates(
		&self,
		chunk: &Chunk,
		params: &Params,
		ctx: &mut RuntimeContext,
	) -> crate::Result<()> {
		for predicate in &self.value_id_predicates {
			let column = &self.input_columns[predicate.input_column_index];
			let dictionary = match chunk.segment(column.column_id)?.as_ref() {
				Segment::Dictionary(dictionary) => dictionary,
				_ => {
					return Err(EngineError::invalid_plan(
						"value id predicate over a chunk without dictionary encoding",
					));
				}
			};
			if dictionary.unique_values_count() > ValueId::MAX_ENCODABLE.0 as usize {
				return Err(EngineError::ValueIdOverflow {
					unique_values: dictionary.unique_values_count(),
				});
			}

			let (value, slot) = if let Some(index) = predicate.literal_index {
				let literal = &self.input_literals[index];
				(literal.value.clone(), literal.slot)
			} else {
				let index = predicate.parameter_index.ok_or_else(|| {
					EngineError::invalid_plan("value id predicate without a literal or parameter")
				})?;
				let parameter = &self.input_parameters[index];
				let value = params
					.get(parameter.parameter_id)
					.ok_or(EngineError::UnboundParameter { parameter: parameter.parameter_id })?;
				(value.clone(), parameter.slot)
			};

			let value = value.cast_to(column.ty)?;
			if value.is_undefined() {
				ctx.tuple.set_null(slot.index(), true);
				continue;
			}

			let value_id = match predicate.op {
				ExprKind::Equals | ExprKind::NotEquals => {
					if dictionary.lower_bound(&value)? == dictionary.upper_bound(&value)? {
						ValueId::INVALID
					} else {
						dictionary.lower_bound(&value)?
					}
				}
				ExprKind::LessThan | ExprKind::GreaterThanEquals => dictionary.lower_bound(&value)?,
				ExprKind::LessThanEquals | ExprKind::GreaterThan => dictionary.upper_bound(&value)?,
				other => {
					return Err(EngineError::invalid_plan(format!(
						"unsupported value id comparison {other:?}"
					)));
				}
			};
			// The not-found substitute is the maximum encodable id; real
			// codes stay below it, so any less-than trivially holds and
			// any equality trivially fails.
			let resolved = if value_id.is_invalid() { ValueId::MAX_ENCODABLE.0 } else { value_id.0 };
			ctx.tuple.set_value_id(slot.index(), resolved);
		}
		Ok(())
	}

	/// The per-tuple loop. Under eager loading every reader materializes
	/// its slot before the row is pushed down the chain; under lazy
	/// loading the loads happen inside downstream operators.
	pub fn execute(&self, chain: &OperatorChain, ctx: &mut RuntimeContext) -> crate::Result<()> {
		while ctx.chunk_offset < ctx.chunk_size && ctx.remaining_rows > 0 {
			if !self.lazy {
				for index in 0..ctx.readers.len() {
					ctx.read_input(index)?;
				}
			}
			chain.consume(1, ctx)?;
			ctx.chunk_offset += 1;
		}
		Ok(())
	}
}

fn evaluate_row_count(expression: &Expression, params: &Params) -> crate::Result<u64> {
	let value = const_fold(expression, params)?;
	let rows = match value {
		Value::Undefined => return Err(EngineError::LimitRowCountNull),
		Value::Int4(rows) => rows as i64,
		Value::Int8(rows) => rows,
		other => {
			return Err(EngineError::invalid_plan(format!("LIMIT row count of type {}", other.ty())));
		}
	};
	if rows < 0 {
		return Err(EngineError::LimitRowCountNegative { rows });
	}
	Ok(rows as u64)
}

/// Constant folding for the limit's row-count expression: literals,
/// bound parameters and integer arithmetic over them.
fn const_fold(expression: &Expression, params: &Params) -> crate::Result<Value> {
	match expression {
		Expression::Literal(value) => Ok(value.clone()),
		Expression::Parameter { id, .. } => {
			params.get(*id).cloned().ok_or(EngineError::UnboundParameter { parameter: *id })
		}
		Expression::Arithmetic { op, left, right } => {
			let (left, right) = (const_fold(left, params)?, const_fold(right, params)?);
			if left.is_undefined() || right.is_undefined() {
				return Ok(Value::Undefined);
			}
			let (left, right) = match (left.cast_to(Type::Int8)?, right.cast_to(Type::Int8)?) {
				(Value::Int8(left), Value::Int8(right)) => (left, right),
				_ => {
					return Err(EngineError::invalid_plan(
						"LIMIT row count must be an integer expression",
					));
				}
			};
			use forgedb_plan::ArithmeticOp;
			let folded = match op {
				ArithmeticOp::Add => left.checked_add(right),
				ArithmeticOp::Subtract => left.checked_sub(right),
				ArithmeticOp::Multiply => left.checked_mul(right),
				ArithmeticOp::Divide => left.checked_div(right),
				ArithmeticOp::Modulo => left.checked_rem(right),
			};
			Ok(folded.map(Value::Int8).unwrap_or(Value::Undefined))
		}
		_ => Err(EngineError::invalid_plan("LIMIT row count must be a constant expression")),
	}
}

#[cfg(test)]
mod tests {
	use forgedb_storage::ColumnDef;
	use forgedb_type::{CommitId, TransactionId};

	use super::*;
	use crate::test_utils::{Encoding, build_table};

	#[test]
	fn input_columns_are_deduplicated() {
		let mut source = ReadTuples::new(false, None, true);
		let first = source.add_input_column(Type::Int4, false, ColumnId(0), false);
		let second = source.add_input_column(Type::Int4, false, ColumnId(0), false);
		assert_eq!(first, second);
		assert_eq!(source.num_slots(), 1);

		// The same column read as value ids gets its own slot.
		let codes = source.add_input_column(Type::Int4, false, ColumnId(0), true);
		assert_ne!(first, codes);
		assert_eq!(codes.ty(), Type::ValueId);
	}

	#[test]
	fn literals_are_deduplicated_by_value() {
		let mut source = ReadTuples::new(false, None, true);
		let first = source.add_literal(Value::Int4(42), false);
		let second = source.add_literal(Value::Int4(42), false);
		let third = source.add_literal(Value::Int4(43), false);
		assert_eq!(first, second);
		assert_ne!(first, third);
	}

	#[test]
	fn value_id_literals_are_never_deduplicated() {
		let mut source = ReadTuples::new(false, None, true);
		let first = source.add_literal(Value::Int4(42), true);
		let second = source.add_literal(Value::Int4(42), true);
		assert_ne!(first.index(), second.index());
	}

	#[test]
	fn row_count_folds_arithmetic() {
		let expression = Expression::arithmetic(
			forgedb_plan::ArithmeticOp::Add,
			Expression::literal(2i64),
			Expression::literal(1i64),
		);
		assert_eq!(evaluate_row_count(&expression, &Params::empty()).unwrap(), 3);
	}

	#[test]
	fn negative_row_count_is_a_configuration_error() {
		let expression = Expression::literal(-1i64);
		assert!(matches!(
			evaluate_row_count(&expression, &Params::empty()),
			Err(EngineError::LimitRowCountNegative { rows: -1 })
		));
	}

	#[test]
	fn null_row_count_is_a_configuration_error() {
		let expression = Expression::Literal(Value::Undefined);
		assert!(matches!(evaluate_row_count(&expression, &Params::empty()), Err(EngineError::LimitRowCountNull)));
	}

	#[test]
	fn a_missing_literal_resolves_to_the_not_found_substitute() {
		let table = build_table(
			vec![(ColumnDef::new("a", Type::Int4, false), Encoding::Dictionary)],
			&[vec![vec![Value::Int4(10), Value::Int4(20), Value::Int4(30)]]],
			false,
		);

		let mut source = ReadTuples::new(false, None, true);
		let mut expressions = ExpressionArena::new();
		let column = source.add_input_column(Type::Int4, false, ColumnId(0), true);
		let missing = source.add_literal(Value::Int4(15), true);
		let present = source.add_literal(Value::Int4(20), true);
		let column_leaf = expressions.add_column(column);
		let missing_leaf = expressions.add_column(missing);
		let present_leaf = expressions.add_column(present);
		let missing_check = expressions
			.add_binary(ExprKind::Equals, column_leaf, missing_leaf, source.add_temporary_slot())
			.unwrap();
		let present_check = expressions
			.add_binary(ExprKind::Equals, column_leaf, present_leaf, source.add_temporary_slot())
			.unwrap();
		source.add_value_id_predicate(&mut expressions, missing_check).unwrap();
		source.add_value_id_predicate(&mut expressions, present_check).unwrap();

		let mut ctx = RuntimeContext::new(TransactionId::NONE, CommitId(0), false);
		source.before_query(&Params::empty(), &mut ctx).unwrap();
		source.before_chunk(&table, ChunkId(0), &Params::empty(), &mut ctx).unwrap();

		// The absent literal gets the exact substitute id; the present
		// one resolves to its dictionary code.
		assert_eq!(ctx.tuple.get_value_id(missing.index()), ValueId::MAX_ENCODABLE.0);
		assert_eq!(ctx.tuple.get_value_id(present.index()), 1);
	}
}
