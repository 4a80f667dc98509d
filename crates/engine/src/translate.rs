// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::{
	collections::{HashSet, VecDeque},
	sync::Arc,
};

use forgedb_plan::{
	AggregateFunction, ArithmeticOp, ComparisonOp, Expression, LogicalOp, NodeKind, PlanNode, PlanRef, ScanType,
};
use forgedb_storage::{Segment, TableKind};
use forgedb_type::{ChunkId, Type, Value};
use tracing::debug;

use crate::{
	EngineError,
	config::ExecutionConfig,
	expression::{ExprId, ExprKind, ExpressionArena},
	operators::{
		AggregateSink, Compute, Filter, JitOperator, Limit, OperatorChain, ReadTuples, Validate, WriteOffset,
		WriteTuples, write_offset::PassthroughColumn,
	},
	specialize::CodeGenerator,
	wrapper::JitOperatorWrapper,
};

/// Translates the largest jittable subtree under a plan node into a
/// fused operator chain. `Ok(None)` means the node is not worth fusing
/// and the caller must use the non-JIT translator; an error means the
/// plan itself is malformed.
pub struct JitAwareTranslator {
	config: ExecutionConfig,
	codegen: Arc<dyn CodeGenerator>,
}

enum BoolComposition {
	Neutral,
	Composed(Expression),
	Unsupported,
}

impl JitAwareTranslator {
	pub fn new(config: ExecutionConfig, codegen: Arc<dyn CodeGenerator>) -> Self {
		Self { config, codegen }
	}

	pub fn translate_node(&self, node: &PlanRef) -> crate::Result<Option<JitOperatorWrapper>> {
		if !self.config.jit {
			return Ok(None);
		}
		self.try_translate(node)
	}

	fn try_translate(&self, node: &PlanRef) -> crate::Result<Option<JitOperatorWrapper>> {
		let mut jittable_count = 0usize;
		let mut input_nodes: Vec<PlanRef> = Vec::new();
		let mut use_validate = false;
		let mut allow_aggregate = true;

		self.visit_breadth_first(node, |current| {
			let is_root = Arc::ptr_eq(current, node);
			if self.node_is_jittable(current, allow_aggregate, is_root) {
				use_validate |= matches!(current.kind, NodeKind::Validate);
				jittable_count += 1;
				allow_aggregate &= matches!(current.kind, NodeKind::Limit { .. });
				true
			} else {
				if !input_nodes.iter().any(|known| Arc::ptr_eq(known, current)) {
					input_nodes.push(Arc::clone(current));
				}
				false
			}
		});

		// Fusing pays off for aggregates and for chains of at least two
		// operators over a single input.
		if input_nodes.len() != 1 || jittable_count < 1 {
			return Ok(None);
		}
		if jittable_count == 1
			&& matches!(
				node.kind,
				NodeKind::Projection { .. }
					| NodeKind::Validate
					| NodeKind::Limit { .. }
					| NodeKind::Predicate { .. }
			) {
			return Ok(None);
		}
		if jittable_count == 2 && matches!(node.kind, NodeKind::Validate) {
			return Ok(None);
		}

		let use_limit = matches!(node.kind, NodeKind::Limit { .. });
		let last_node = if use_limit {
			Arc::clone(node.left_input().ok_or_else(|| EngineError::invalid_plan("limit without input"))?)
		} else {
			Arc::clone(node)
		};
		let input_node = Arc::clone(&input_nodes[0]);

		let row_count_expression = match &node.kind {
			NodeKind::Limit { row_count } if use_limit => Some(row_count.clone()),
			_ => None,
		};
		let mut source = ReadTuples::new(use_validate, row_count_expression, self.config.use_load_atomic);
		let mut arena = ExpressionArena::new();
		let mut ops: Vec<JitOperator> = Vec::new();

		if use_validate {
			ops.push(JitOperator::Validate(Validate::new(input_table_kind(&input_node))));
		}

		// The filter section: everything from the first predicate or
		// union down to the input collapses into one boolean expression.
		let mut filter_node = Arc::clone(node);
		while !Arc::ptr_eq(&filter_node, &input_node)
			&& !matches!(filter_node.kind, NodeKind::Predicate { .. } | NodeKind::Union)
		{
			filter_node = Arc::clone(
				filter_node
					.left_input()
					.ok_or_else(|| EngineError::invalid_plan("fused subtree is not a chain"))?,
			);
		}
		if !Arc::ptr_eq(&filter_node, &input_node) {
			let boolean_expression = match self.subplan_to_boolean_expression(&filter_node, &input_node)? {
				BoolComposition::Composed(expression) => expression,
				_ => return Ok(None),
			};
			let Some(condition) =
				self.translate_expression(&boolean_expression, &mut source, &mut arena, &input_node, false, false)?
			else {
				return Ok(None);
			};
			if arena.kind(condition) != ExprKind::Column {
				ops.push(JitOperator::Compute(Compute::new(condition)));
			}
			ops.push(JitOperator::Filter(Filter::new(arena.result(condition))));
		}

		if let NodeKind::Aggregate { group_by, aggregates } = &last_node.kind {
			// Aggregates materialize, so the aggregate is always the
			// last operator of its chain.
			let mut sink = AggregateSink::new();
			for expression in group_by {
				let Some(translated) =
					self.translate_expression(expression, &mut source, &mut arena, &input_node, false, false)?
				else {
					return Ok(None);
				};
				if arena.kind(translated) != ExprKind::Column {
					ops.push(JitOperator::Compute(Compute::new(translated)));
				}
				sink.add_groupby_column(expression.as_column_name(), arena.result(translated));
			}
			for aggregate in aggregates {
				match &aggregate.argument {
					None => sink.add_aggregate_column(aggregate.as_column_name(), None, aggregate.function)?,
					Some(argument) => {
						let Some(translated) = self.translate_expression(
							argument,
							&mut source,
							&mut arena,
							&input_node,
							false,
							false,
						)?
						else {
							return Ok(None);
						};
						if arena.kind(translated) != ExprKind::Column {
							ops.push(JitOperator::Compute(Compute::new(translated)));
						}
						sink.add_aggregate_column(
							aggregate.as_column_name(),
							Some(arena.result(translated)),
							aggregate.function,
						)?;
					}
				}
			}
			ops.push(JitOperator::Aggregate(sink));
		} else {
			if use_limit {
				ops.push(JitOperator::Limit(Limit));
			}
			let output_expressions = node.output_expressions();
			let must_materialize =
				output_expressions.iter().any(|expression| input_node.find_column_id(expression).is_none());
			if must_materialize {
				let mut sink = WriteTuples::new();
				for expression in &output_expressions {
					let Some(translated) = self.translate_expression(
						expression,
						&mut source,
						&mut arena,
						&input_node,
						false,
						false,
					)?
					else {
						return Ok(None);
					};
					// A plain column needs no compute; it would not
					// compute anything anyway.
					if arena.kind(translated) != ExprKind::Column {
						ops.push(JitOperator::Compute(Compute::new(translated)));
					}
					sink.add_output_column(expression.as_column_name(), arena.result(translated));
				}
				ops.push(JitOperator::WriteTuples(sink));
			} else {
				let mut sink = WriteOffset::new();
				for expression in &output_expressions {
					let column_id = input_node.find_column_id(expression).ok_or_else(|| {
						EngineError::invalid_plan("output column must reference an input column")
					})?;
					sink.add_output_column(PassthroughColumn {
						name: expression.as_column_name(),
						ty: expression.ty(),
						nullable: expression.nullable(),
						column_id,
					});
				}
				ops.push(JitOperator::WriteOffset(sink));
			}
		}

		let mut operators = Vec::with_capacity(ops.len() + 1);
		operators.push(JitOperator::ReadTuples(source));
		operators.extend(ops);
		let chain = OperatorChain::new(arena, operators)?;
		debug!(chain = %chain.descriptions().join(" "), "fused {jittable_count} plan nodes");
		Ok(Some(JitOperatorWrapper::new(chain, self.config, Arc::clone(&self.codegen))))
	}

	fn node_is_jittable(&self, node: &PlanRef, allow_aggregate: bool, is_root: bool) -> bool {
		match &node.kind {
			NodeKind::Aggregate { aggregates, .. } => {
				let has_count_distinct = aggregates
					.iter()
					.any(|aggregate| aggregate.function == AggregateFunction::CountDistinct);
				allow_aggregate && !has_count_distinct
			}
			NodeKind::Predicate { predicate, scan_type } => {
				if matches!(predicate, Expression::In { .. } | Expression::Like { .. }) {
					return false;
				}
				*scan_type == ScanType::TableScan && expression_is_jittable(predicate)
			}
			NodeKind::Validate => self.config.jit_validate,
			NodeKind::Limit { .. } => is_root,
			NodeKind::Projection { expressions } => expressions
				.iter()
				.all(|expression| {
					matches!(expression, Expression::Column(_)) || expression_is_jittable(expression)
				}),
			NodeKind::Union => self.config.jit_predicate,
			NodeKind::StoredTable { .. } | NodeKind::Sort { .. } => false,
		}
	}

	fn visit_breadth_first(&self, root: &PlanRef, mut visit: impl FnMut(&PlanRef) -> bool) {
		let mut visited: HashSet<*const PlanNode> = HashSet::new();
		let mut queue: VecDeque<PlanRef> = VecDeque::new();
		queue.push_back(Arc::clone(root));
		while let Some(current) = queue.pop_front() {
			if !visited.insert(Arc::as_ptr(&current)) {
				continue;
			}
			if visit(&current) {
				if let Some(left) = current.left_input() {
					queue.push_back(Arc::clone(left));
				}
				if let Some(right) = current.right_input() {
					queue.push_back(Arc::clone(right));
				}
			}
		}
	}

	/// Collapse the predicate section between `node` and `input_node`
	/// into one boolean expression: predicates compose conjunctively,
	/// the two branches of a union disjunctively.
	fn subplan_to_boolean_expression(
		&self,
		node: &PlanRef,
		input_node: &PlanRef,
	) -> crate::Result<BoolComposition> {
		if Arc::ptr_eq(node, input_node) {
			return Ok(BoolComposition::Neutral);
		}
		match &node.kind {
			NodeKind::Predicate { predicate, .. } => {
				let below = node
					.left_input()
					.ok_or_else(|| EngineError::invalid_plan("predicate without input"))?;
				Ok(match self.subplan_to_boolean_expression(below, input_node)? {
					BoolComposition::Neutral => BoolComposition::Composed(predicate.clone()),
					BoolComposition::Composed(rest) => {
						BoolComposition::Composed(Expression::and(predicate.clone(), rest))
					}
					BoolComposition::Unsupported => BoolComposition::Unsupported,
				})
			}
			NodeKind::Union => {
				let (Some(left), Some(right)) = (node.left_input(), node.right_input()) else {
					return Err(EngineError::invalid_plan("union without two inputs"));
				};
				let left = self.subplan_to_boolean_expression(left, input_node)?;
				let right = self.subplan_to_boolean_expression(right, input_node)?;
				Ok(match (left, right) {
					(BoolComposition::Composed(left), BoolComposition::Composed(right)) => {
						BoolComposition::Composed(Expression::or(left, right))
					}
					_ => BoolComposition::Unsupported,
				})
			}
			NodeKind::Validate | NodeKind::Projection { .. } | NodeKind::Limit { .. } => {
				match node.left_input() {
					Some(below) => self.subplan_to_boolean_expression(below, input_node),
					None => Ok(BoolComposition::Unsupported),
				}
			}
			_ => Ok(BoolComposition::Unsupported),
		}
	}

	fn translate_expression(
		&self,
		expression: &Expression,
		source: &mut ReadTuples,
		arena: &mut ExpressionArena,
		input_node: &PlanRef,
		use_value_id: bool,
		can_be_bool_column: bool,
	) -> crate::Result<Option<ExprId>> {
		if let Some(column_id) = input_node.find_column_id(expression) {
			let ty = if can_be_bool_column { Type::Bool } else { expression.ty() };
			let slot = source.add_input_column(ty, expression.nullable(), column_id, use_value_id);
			return Ok(Some(arena.add_column(slot)));
		}

		match expression {
			Expression::Literal(value) => {
				Ok(Some(arena.add_column(source.add_literal(value.clone(), use_value_id))))
			}
			Expression::Parameter { id, ty, nullable } => match ty {
				// Subtree selection refuses nodes containing untyped
				// placeholders, so one reaching translation is a
				// configuration error, not a fallback.
				None => Err(EngineError::UnknownParameterType { parameter: *id }),
				Some(ty) => {
					Ok(Some(arena.add_column(source.add_parameter(*ty, *nullable, *id, use_value_id))))
				}
			},
			Expression::Column(_) => {
				// A column must have been resolved by find_column_id.
				Err(EngineError::invalid_plan("column does not exist in the input node"))
			}
			Expression::Comparison { op, left, right } => {
				// The SQL translator wraps boolean expressions in a
				// redundant `<expr> != 0`; unwrap it.
				if *op == ComparisonOp::NotEquals {
					if let Expression::Literal(Value::Int4(0)) = right.as_ref() {
						return self.translate_expression(left, source, arena, input_node, false, true);
					}
				}
				let use_value_id = self.can_use_value_ids(expression, input_node);
				let Some(left) =
					self.translate_expression(left, source, arena, input_node, use_value_id, false)?
				else {
					return Ok(None);
				};
				let Some(right) =
					self.translate_expression(right, source, arena, input_node, use_value_id, false)?
				else {
					return Ok(None);
				};
				if arena.result(left).ty().is_string() != arena.result(right).ty().is_string() {
					return Ok(None);
				}
				let translated =
					arena.add_binary(comparison_kind(*op), left, right, source.add_temporary_slot())?;
				if use_value_id {
					source.add_value_id_predicate(arena, translated)?;
				}
				Ok(Some(translated))
			}
			Expression::Between { value, lower, upper } => {
				let use_value_id = self.can_use_value_ids(expression, input_node);
				let Some(value) =
					self.translate_expression(value, source, arena, input_node, use_value_id, false)?
				else {
					return Ok(None);
				};
				let Some(lower) =
					self.translate_expression(lower, source, arena, input_node, use_value_id, false)?
				else {
					return Ok(None);
				};
				let Some(upper) =
					self.translate_expression(upper, source, arena, input_node, use_value_id, false)?
				else {
					return Ok(None);
				};
				let value_is_string = arena.result(value).ty().is_string();
				if value_is_string != arena.result(lower).ty().is_string()
					|| value_is_string != arena.result(upper).ty().is_string()
				{
					return Ok(None);
				}
				// `a BETWEEN lo AND hi` fuses as `a >= lo AND a <= hi`;
				// both halves can be value-id comparisons on their own.
				let lower_check = arena.add_binary(
					ExprKind::GreaterThanEquals,
					value,
					lower,
					source.add_temporary_slot(),
				)?;
				let upper_check =
					arena.add_binary(ExprKind::LessThanEquals, value, upper, source.add_temporary_slot())?;
				if use_value_id {
					source.add_value_id_predicate(arena, lower_check)?;
					source.add_value_id_predicate(arena, upper_check)?;
				}
				Ok(Some(arena.add_binary(
					ExprKind::And,
					lower_check,
					upper_check,
					source.add_temporary_slot(),
				)?))
			}
			Expression::Arithmetic { op, left, right } => {
				let Some(left) = self.translate_expression(left, source, arena, input_node, false, false)?
				else {
					return Ok(None);
				};
				let Some(right) = self.translate_expression(right, source, arena, input_node, false, false)?
				else {
					return Ok(None);
				};
				if arena.result(left).ty().promote(arena.result(right).ty()).is_none() {
					return Ok(None);
				}
				Ok(Some(arena.add_binary(arithmetic_kind(*op), left, right, source.add_temporary_slot())?))
			}
			Expression::Logical { op, left, right } => {
				let Some(left) = self.translate_expression(left, source, arena, input_node, false, false)?
				else {
					return Ok(None);
				};
				let Some(right) = self.translate_expression(right, source, arena, input_node, false, false)?
				else {
					return Ok(None);
				};
				let kind = match op {
					LogicalOp::And => ExprKind::And,
					LogicalOp::Or => ExprKind::Or,
				};
				Ok(Some(arena.add_binary(kind, left, right, source.add_temporary_slot())?))
			}
			Expression::IsNull(inner) => {
				let Some(inner) = self.translate_expression(inner, source, arena, input_node, false, false)?
				else {
					return Ok(None);
				};
				Ok(Some(arena.add_unary(ExprKind::IsNull, inner, source.add_temporary_slot())?))
			}
			Expression::IsNotNull(inner) => {
				let Some(inner) = self.translate_expression(inner, source, arena, input_node, false, false)?
				else {
					return Ok(None);
				};
				Ok(Some(arena.add_unary(ExprKind::IsNotNull, inner, source.add_temporary_slot())?))
			}
			// IN, LIKE, CASE, CAST, function calls, unary minus and
			// anything else stay on the non-JIT path.
			_ => Ok(None),
		}
	}

	/// A comparison runs on value ids when it scans exactly one
	/// dictionary-encoded column of a stored table against literals or
	/// parameters.
	fn can_use_value_ids(&self, expression: &Expression, input_node: &PlanRef) -> bool {
		let NodeKind::StoredTable { table, .. } = &input_node.kind else {
			return false;
		};
		let arguments: Vec<&Expression> = match expression {
			Expression::Comparison { left, right, .. } => vec![left, right],
			Expression::Between { value, lower, upper } => vec![value, lower, upper],
			_ => return false,
		};
		let mut found_column = false;
		for argument in arguments {
			match argument {
				Expression::Literal(_) | Expression::Parameter { .. } => {}
				Expression::Column(column) => {
					if found_column || !Arc::ptr_eq(&column.table, table) {
						return false;
					}
					let dictionary_encoded = table
						.chunk(ChunkId(0))
						.and_then(|chunk| chunk.segment(column.column_id))
						.map(|segment| matches!(segment.as_ref(), Segment::Dictionary(_)))
						.unwrap_or(false);
					if !dictionary_encoded {
						return false;
					}
					found_column = true;
				}
				_ => return false,
			}
		}
		found_column
	}
}

fn expression_is_jittable(expression: &Expression) -> bool {
	match expression {
		Expression::Column(_) | Expression::Literal(_) => true,
		Expression::Parameter { ty, .. } => ty.is_some(),
		Expression::Arithmetic { left, right, .. }
		| Expression::Comparison { left, right, .. }
		| Expression::Logical { left, right, .. } => {
			expression_is_jittable(left) && expression_is_jittable(right)
		}
		Expression::Between { value, lower, upper } => {
			expression_is_jittable(value) && expression_is_jittable(lower) && expression_is_jittable(upper)
		}
		Expression::IsNull(inner) | Expression::IsNotNull(inner) => expression_is_jittable(inner),
		Expression::In { .. }
		| Expression::Like { .. }
		| Expression::Cast { .. }
		| Expression::Case { .. }
		| Expression::Call { .. }
		| Expression::UnaryMinus(_) => false,
	}
}

fn comparison_kind(op: ComparisonOp) -> ExprKind {
	match op {
		ComparisonOp::Equals => ExprKind::Equals,
		ComparisonOp::NotEquals => ExprKind::NotEquals,
		ComparisonOp::LessThan => ExprKind::LessThan,
		ComparisonOp::LessThanEquals => ExprKind::LessThanEquals,
		ComparisonOp::GreaterThan => ExprKind::GreaterThan,
		ComparisonOp::GreaterThanEquals => ExprKind::GreaterThanEquals,
	}
}

fn arithmetic_kind(op: ArithmeticOp) -> ExprKind {
	match op {
		ArithmeticOp::Add => ExprKind::Addition,
		ArithmeticOp::Subtract => ExprKind::Subtraction,
		ArithmeticOp::Multiply => ExprKind::Multiplication,
		ArithmeticOp::Divide => ExprKind::Division,
		ArithmeticOp::Modulo => ExprKind::Modulo,
	}
}

fn input_table_kind(node: &PlanRef) -> TableKind {
	match node.kind {
		NodeKind::StoredTable { .. } => TableKind::Data,
		_ => TableKind::References,
	}
}
