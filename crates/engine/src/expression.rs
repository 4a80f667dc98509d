// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_type::Type;

use crate::{EngineError, context::RuntimeContext, tuple::TupleSlot};

/// Index of a node inside the chain's expression arena.
pub type ExprId = usize;

/// Expression vocabulary of the fused pipeline. `Column` is the only
/// leaf kind: columns, literals and parameters all become slot
/// references by the time an expression tree is built. `Between` is
/// decomposed during translation and `Like`/`NotLike`/`In` never pass
/// the jittability check, so none of the four ever appears in a built
/// tree; they exist as vocabulary for the translator and the value-id
/// predicate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprKind {
	Column,
	Addition,
	Subtraction,
	Multiplication,
	Division,
	Modulo,
	Equals,
	NotEquals,
	LessThan,
	LessThanEquals,
	GreaterThan,
	GreaterThanEquals,
	And,
	Or,
	Not,
	IsNull,
	IsNotNull,
	Between,
	Like,
	NotLike,
	In,
}

impl ExprKind {
	pub fn is_binary(&self) -> bool {
		matches!(
			self,
			ExprKind::Addition
				| ExprKind::Subtraction
				| ExprKind::Multiplication
				| ExprKind::Division
				| ExprKind::Modulo
				| ExprKind::Equals
				| ExprKind::NotEquals
				| ExprKind::LessThan
				| ExprKind::LessThanEquals
				| ExprKind::GreaterThan
				| ExprKind::GreaterThanEquals
				| ExprKind::And
				| ExprKind::Or
		)
	}

	pub fn is_comparison(&self) -> bool {
		matches!(
			self,
			ExprKind::Equals
				| ExprKind::NotEquals
				| ExprKind::LessThan
				| ExprKind::LessThanEquals
				| ExprKind::GreaterThan
				| ExprKind::GreaterThanEquals
		)
	}

	/// The comparison that holds after the operands are swapped.
	pub fn swapped(&self) -> ExprKind {
		match self {
			ExprKind::LessThan => ExprKind::GreaterThan,
			ExprKind::LessThanEquals => ExprKind::GreaterThanEquals,
			ExprKind::GreaterThan => ExprKind::LessThan,
			ExprKind::GreaterThanEquals => ExprKind::LessThanEquals,
			other => *other,
		}
	}

	fn symbol(&self) -> &'static str {
		match self {
			ExprKind::Column => "x",
			ExprKind::Addition => "+",
			ExprKind::Subtraction => "-",
			ExprKind::Multiplication => "*",
			ExprKind::Division => "/",
			ExprKind::Modulo => "%",
			ExprKind::Equals => "=",
			ExprKind::NotEquals => "<>",
			ExprKind::LessThan => "<",
			ExprKind::LessThanEquals => "<=",
			ExprKind::GreaterThan => ">",
			ExprKind::GreaterThanEquals => ">=",
			ExprKind::And => "AND",
			ExprKind::Or => "OR",
			ExprKind::Not => "NOT",
			ExprKind::IsNull => "IS NULL",
			ExprKind::IsNotNull => "IS NOT NULL",
			ExprKind::Between => "BETWEEN",
			ExprKind::Like => "LIKE",
			ExprKind::NotLike => "NOT LIKE",
			ExprKind::In => "IN",
		}
	}
}

/// One node of the tree. Non-leaf nodes own their result slot; the
/// result slot of a leaf is the slot it references.
#[derive(Debug, Clone)]
pub struct ExpressionNode {
	pub kind: ExprKind,
	pub result: TupleSlot,
	pub left: Option<ExprId>,
	pub right: Option<ExprId>,
	/// When set, computing this leaf first lets the given reader pull
	/// the slot's value from the current chunk (embedded lazy load).
	pub load_reader: Option<usize>,
}

/// All expression nodes of one chain, referenced by index. The source
/// allocates the slots; the arena owns the node structure.
#[derive(Debug, Default)]
pub struct ExpressionArena {
	nodes: Vec<ExpressionNode>,
}

impl ExpressionArena {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn node(&self, id: ExprId) -> &ExpressionNode {
		&self.nodes[id]
	}

	pub fn result(&self, id: ExprId) -> TupleSlot {
		self.nodes[id].result
	}

	pub fn kind(&self, id: ExprId) -> ExprKind {
		self.nodes[id].kind
	}

	pub fn set_kind(&mut self, id: ExprId, kind: ExprKind) {
		self.nodes[id].kind = kind;
	}

	pub fn add_column(&mut self, slot: TupleSlot) -> ExprId {
		self.push(ExpressionNode { kind: ExprKind::Column, result: slot, left: None, right: None, load_reader: None })
	}

	pub fn add_unary(&mut self, kind: ExprKind, child: ExprId, slot_index: u16) -> crate::Result<ExprId> {
		let child_slot = self.result(child);
		let (ty, nullable) = match kind {
			ExprKind::Not => (Type::Bool, child_slot.nullable()),
			ExprKind::IsNull | ExprKind::IsNotNull => (Type::Bool, false),
			other => {
				return Err(EngineError::invalid_plan(format!("{} is not a unary expression", other.symbol())));
			}
		};
		let result = TupleSlot::new(slot_index, ty, nullable);
		Ok(self.push(ExpressionNode { kind, result, left: Some(child), right: None, load_reader: None }))
	}

	pub fn add_binary(
		&mut self,
		kind: ExprKind,
		left: ExprId,
		right: ExprId,
		slot_index: u16,
	) -> crate::Result<ExprId> {
		let (left_slot, right_slot) = (self.result(left), self.result(right));
		let nullable = left_slot.nullable() || right_slot.nullable();
		let ty = match kind {
			ExprKind::Addition
			| ExprKind::Subtraction
			| ExprKind::Multiplication
			| ExprKind::Division
			| ExprKind::Modulo => left_slot.ty().promote(right_slot.ty()).ok_or_else(|| {
				EngineError::invalid_plan(format!(
					"no arithmetic over {} and {}",
					left_slot.ty(),
					right_slot.ty()
				))
			})?,
			kind if kind.is_comparison() => {
				if left_slot.ty().is_string() != right_slot.ty().is_string() {
					return Err(EngineError::invalid_plan("strings only compare against strings"));
				}
				Type::Bool
			}
			ExprKind::And | ExprKind::Or => Type::Bool,
			other => {
				return Err(EngineError::invalid_plan(format!("{} is not a binary expression", other.symbol())));
			}
		};
		let result = TupleSlot::new(slot_index, ty, nullable);
		Ok(self.push(ExpressionNode { kind, result, left: Some(left), right: Some(right), load_reader: None }))
	}

	fn push(&mut self, node: ExpressionNode) -> ExprId {
		self.nodes.push(node);
		self.nodes.len() - 1
	}

	/// The input slots this expression reads (its column leaves).
	pub fn column_slots(&self, root: ExprId) -> Vec<TupleSlot> {
		let mut slots = Vec::new();
		self.walk(root, &mut |node| {
			if node.kind == ExprKind::Column {
				slots.push(node.result);
			}
		});
		slots
	}

	/// Attach an embedded load to every leaf referencing `slot_index`.
	pub fn embed_load(&mut self, root: ExprId, slot_index: usize, reader: usize) {
		let mut targets = Vec::new();
		self.collect_leaves(root, slot_index, &mut targets);
		for id in targets {
			self.nodes[id].load_reader = Some(reader);
		}
	}

	fn collect_leaves(&self, id: ExprId, slot_index: usize, out: &mut Vec<ExprId>) {
		let node = &self.nodes[id];
		if node.kind == ExprKind::Column && node.result.index() == slot_index {
			out.push(id);
		}
		if let Some(left) = node.left {
			self.collect_leaves(left, slot_index, out);
		}
		if let Some(right) = node.right {
			self.collect_leaves(right, slot_index, out);
		}
	}

	fn walk(&self, id: ExprId, visit: &mut impl FnMut(&ExpressionNode)) {
		let node = &self.nodes[id];
		visit(node);
		if let Some(left) = node.left {
			self.walk(left, visit);
		}
		if let Some(right) = node.right {
			self.walk(right, visit);
		}
	}

	pub fn describe(&self, id: ExprId) -> String {
		let node = &self.nodes[id];
		match (node.kind, node.left, node.right) {
			(ExprKind::Column, _, _) => format!("x{}", node.result.index()),
			(kind, Some(left), None) => format!("({} {})", kind.symbol(), self.describe(left)),
			(kind, Some(left), Some(right)) => {
				format!("({} {} {})", self.describe(left), kind.symbol(), self.describe(right))
			}
			(kind, _, _) => kind.symbol().to_string(),
		}
	}

	/// Evaluate the subtree rooted at `id` into its result slot. Leaves
	/// are already materialized in the tuple (or load themselves through
	/// an embedded reader); every non-leaf stores its value into the one
	/// slot it owns.
	pub fn compute(&self, id: ExprId, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let node = &self.nodes[id];
		match node.kind {
			ExprKind::Column => {
				if let Some(reader) = node.load_reader {
					ctx.read_input(reader)?;
				}
				Ok(())
			}
			ExprKind::Not => {
				let child = node.left.ok_or_else(|| EngineError::invalid_plan("NOT without operand"))?;
				self.compute(child, ctx)?;
				let child_slot = self.result(child);
				let result = node.result;
				if child_slot.nullable() && ctx.tuple.is_null(child_slot.index()) {
					ctx.tuple.set_null(result.index(), true);
				} else {
					let value = ctx.tuple.get_bool(child_slot.index());
					ctx.tuple.set_bool(result.index(), !value);
				}
				Ok(())
			}
			ExprKind::IsNull | ExprKind::IsNotNull => {
				let child = node.left.ok_or_else(|| EngineError::invalid_plan("null test without operand"))?;
				self.compute(child, ctx)?;
				let child_slot = self.result(child);
				let is_null = child_slot.nullable() && ctx.tuple.is_null(child_slot.index());
				let value = if node.kind == ExprKind::IsNull { is_null } else { !is_null };
				ctx.tuple.set_bool(node.result.index(), value);
				Ok(())
			}
			ExprKind::And => self.compute_and(id, ctx),
			ExprKind::Or => self.compute_or(id, ctx),
			kind if kind.is_binary() => self.compute_binary(id, ctx),
			kind => Err(EngineError::invalid_plan(format!("{} cannot be computed", kind.symbol()))),
		}
	}

	/// Three-valued AND with short circuit: a false operand wins over an
	/// unknown one.
	fn compute_and(&self, id: ExprId, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let node = &self.nodes[id];
		let (left, right) = self.binary_children(id)?;
		self.compute(left, ctx)?;
		let left_slot = self.result(left);
		let left_null = left_slot.nullable() && ctx.tuple.is_null(left_slot.index());
		let left_value = ctx.tuple.get_bool(left_slot.index());
		if !left_null && !left_value {
			ctx.tuple.set_bool(node.result.index(), false);
			return Ok(());
		}
		self.compute(right, ctx)?;
		let right_slot = self.result(right);
		let right_null = right_slot.nullable() && ctx.tuple.is_null(right_slot.index());
		let right_value = ctx.tuple.get_bool(right_slot.index());
		if left_null {
			if !right_null && !right_value {
				ctx.tuple.set_bool(node.result.index(), false);
			} else {
				ctx.tuple.set_null(node.result.index(), true);
			}
		} else if right_null {
			ctx.tuple.set_null(node.result.index(), true);
		} else {
			ctx.tuple.set_bool(node.result.index(), right_value);
		}
		Ok(())
	}

	/// Three-valued OR with short circuit: a true operand wins over an
	/// unknown one.
	fn compute_or(&self, id: ExprId, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let node = &self.nodes[id];
		let (left, right) = self.binary_children(id)?;
		self.compute(left, ctx)?;
		let left_slot = self.result(left);
		let left_null = left_slot.nullable() && ctx.tuple.is_null(left_slot.index());
		let left_value = ctx.tuple.get_bool(left_slot.index());
		if !left_null && left_value {
			ctx.tuple.set_bool(node.result.index(), true);
			return Ok(());
		}
		self.compute(right, ctx)?;
		let right_slot = self.result(right);
		let right_null = right_slot.nullable() && ctx.tuple.is_null(right_slot.index());
		let right_value = ctx.tuple.get_bool(right_slot.index());
		if left_null {
			if !right_null && right_value {
				ctx.tuple.set_bool(node.result.index(), true);
			} else {
				ctx.tuple.set_null(node.result.index(), true);
			}
		} else if right_null {
			ctx.tuple.set_null(node.result.index(), true);
		} else {
			ctx.tuple.set_bool(node.result.index(), right_value);
		}
		Ok(())
	}

	fn compute_binary(&self, id: ExprId, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let node = &self.nodes[id];
		let (left, right) = self.binary_children(id)?;
		self.compute(left, ctx)?;
		self.compute(right, ctx)?;
		let (left_slot, right_slot) = (self.result(left), self.result(right));
		let result = node.result;

		let left_null = left_slot.nullable() && ctx.tuple.is_null(left_slot.index());
		let right_null = right_slot.nullable() && ctx.tuple.is_null(right_slot.index());
		if left_null || right_null {
			ctx.tuple.set_null(result.index(), true);
			return Ok(());
		}

		if node.kind.is_comparison() {
			let outcome = self.compare(node.kind, left_slot, right_slot, ctx)?;
			ctx.tuple.set_bool(result.index(), outcome);
			return Ok(());
		}
		self.arithmetic(node.kind, left_slot, right_slot, result, ctx)
	}

	fn compare(
		&self,
		kind: ExprKind,
		left: TupleSlot,
		right: TupleSlot,
		ctx: &mut RuntimeContext,
	) -> crate::Result<bool> {
		use std::cmp::Ordering;

		let ordering = match (left.ty(), right.ty()) {
			(Type::ValueId, Type::ValueId) => {
				ctx.tuple.get_value_id(left.index()).cmp(&ctx.tuple.get_value_id(right.index()))
			}
			(Type::Utf8, Type::Utf8) => ctx.tuple.get_str(left.index()).cmp(ctx.tuple.get_str(right.index())),
			(Type::Bool, Type::Bool) => ctx.tuple.get_bool(left.index()).cmp(&ctx.tuple.get_bool(right.index())),
			(left_ty, right_ty) => match left_ty.promote(right_ty) {
				Some(Type::Int4) | Some(Type::Int8) => ctx
					.tuple
					.get_as_i64(left.index(), left_ty)
					.cmp(&ctx.tuple.get_as_i64(right.index(), right_ty)),
				Some(Type::Float4) => ctx
					.tuple
					.get_as_f32(left.index(), left_ty)
					.partial_cmp(&ctx.tuple.get_as_f32(right.index(), right_ty))
					.unwrap_or(Ordering::Less),
				Some(Type::Float8) => ctx
					.tuple
					.get_as_f64(left.index(), left_ty)
					.partial_cmp(&ctx.tuple.get_as_f64(right.index(), right_ty))
					.unwrap_or(Ordering::Less),
				_ => {
					return Err(EngineError::invalid_plan(format!(
						"no comparison over {left_ty} and {right_ty}"
					)));
				}
			},
		};
		Ok(match kind {
			ExprKind::Equals => ordering == Ordering::Equal,
			ExprKind::NotEquals => ordering != Ordering::Equal,
			ExprKind::LessThan => ordering == Ordering::Less,
			ExprKind::LessThanEquals => ordering != Ordering::Greater,
			ExprKind::GreaterThan => ordering == Ordering::Greater,
			_ => ordering != Ordering::Less,
		})
	}

	fn arithmetic(
		&self,
		kind: ExprKind,
		left: TupleSlot,
		right: TupleSlot,
		result: TupleSlot,
		ctx: &mut RuntimeContext,
	) -> crate::Result<()> {
		match result.ty() {
			Type::Int4 => {
				let l = ctx.tuple.get_i32(left.index());
				let r = ctx.tuple.get_i32(right.index());
				let value = match kind {
					ExprKind::Addition => Some(l.wrapping_add(r)),
					ExprKind::Subtraction => Some(l.wrapping_sub(r)),
					ExprKind::Multiplication => Some(l.wrapping_mul(r)),
					ExprKind::Division => l.checked_div(r),
					_ => l.checked_rem(r),
				};
				match value {
					Some(value) => ctx.tuple.set_i32(result.index(), value),
					None => ctx.tuple.set_null(result.index(), true),
				}
			}
			Type::Int8 => {
				let l = ctx.tuple.get_as_i64(left.index(), left.ty());
				let r = ctx.tuple.get_as_i64(right.index(), right.ty());
				let value = match kind {
					ExprKind::Addition => Some(l.wrapping_add(r)),
					ExprKind::Subtraction => Some(l.wrapping_sub(r)),
					ExprKind::Multiplication => Some(l.wrapping_mul(r)),
					ExprKind::Division => l.checked_div(r),
					_ => l.checked_rem(r),
				};
				match value {
					Some(value) => ctx.tuple.set_i64(result.index(), value),
					None => ctx.tuple.set_null(result.index(), true),
				}
			}
			Type::Float4 => {
				let l = ctx.tuple.get_as_f32(left.index(), left.ty());
				let r = ctx.tuple.get_as_f32(right.index(), right.ty());
				let value = match kind {
					ExprKind::Addition => l + r,
					ExprKind::Subtraction => l - r,
					ExprKind::Multiplication => l * r,
					ExprKind::Division => l / r,
					_ => l % r,
				};
				ctx.tuple.set_f32(result.index(), value);
			}
			Type::Float8 => {
				let l = ctx.tuple.get_as_f64(left.index(), left.ty());
				let r = ctx.tuple.get_as_f64(right.index(), right.ty());
				let value = match kind {
					ExprKind::Addition => l + r,
					ExprKind::Subtraction => l - r,
					ExprKind::Multiplication => l * r,
					ExprKind::Division => l / r,
					_ => l % r,
				};
				ctx.tuple.set_f64(result.index(), value);
			}
			other => {
				return Err(EngineError::invalid_plan(format!("no arithmetic result of type {other}")));
			}
		}
		Ok(())
	}

	fn binary_children(&self, id: ExprId) -> crate::Result<(ExprId, ExprId)> {
		let node = &self.nodes[id];
		match (node.left, node.right) {
			(Some(left), Some(right)) => Ok((left, right)),
			_ => Err(EngineError::invalid_plan(format!("{} is missing an operand", node.kind.symbol()))),
		}
	}
}

#[cfg(test)]
mod tests {
	use forgedb_type::{CommitId, TransactionId};

	use super::*;
	use crate::context::RuntimeContext;

	fn context(slots: usize) -> RuntimeContext {
		let mut ctx = RuntimeContext::new(TransactionId::NONE, CommitId(0), false);
		ctx.tuple.resize(slots);
		ctx
	}

	#[test]
	fn arithmetic_promotes_mixed_integers() {
		let mut arena = ExpressionArena::new();
		let a = arena.add_column(TupleSlot::new(0, Type::Int4, false));
		let b = arena.add_column(TupleSlot::new(1, Type::Int8, false));
		let sum = arena.add_binary(ExprKind::Addition, a, b, 2).unwrap();
		assert_eq!(arena.result(sum).ty(), Type::Int8);

		let mut ctx = context(3);
		ctx.tuple.set_i32(0, 40);
		ctx.tuple.set_i64(1, 2);
		arena.compute(sum, &mut ctx).unwrap();
		assert_eq!(ctx.tuple.get_i64(2), 42);
	}

	#[test]
	fn comparison_propagates_nulls() {
		let mut arena = ExpressionArena::new();
		let a = arena.add_column(TupleSlot::new(0, Type::Int4, true));
		let b = arena.add_column(TupleSlot::new(1, Type::Int4, false));
		let cmp = arena.add_binary(ExprKind::LessThan, a, b, 2).unwrap();

		let mut ctx = context(3);
		ctx.tuple.set_null(0, true);
		ctx.tuple.set_i32(1, 10);
		arena.compute(cmp, &mut ctx).unwrap();
		assert!(ctx.tuple.is_null(2));
	}

	#[test]
	fn and_is_three_valued() {
		let mut arena = ExpressionArena::new();
		let a = arena.add_column(TupleSlot::new(0, Type::Bool, true));
		let b = arena.add_column(TupleSlot::new(1, Type::Bool, false));
		let and = arena.add_binary(ExprKind::And, a, b, 2).unwrap();

		// null AND false == false
		let mut ctx = context(3);
		ctx.tuple.set_null(0, true);
		ctx.tuple.set_bool(1, false);
		arena.compute(and, &mut ctx).unwrap();
		assert!(!ctx.tuple.is_null(2));
		assert!(!ctx.tuple.get_bool(2));

		// null AND true == null
		ctx.tuple.set_null(0, true);
		ctx.tuple.set_bool(1, true);
		arena.compute(and, &mut ctx).unwrap();
		assert!(ctx.tuple.is_null(2));
	}

	#[test]
	fn or_short_circuits_on_true() {
		let mut arena = ExpressionArena::new();
		let a = arena.add_column(TupleSlot::new(0, Type::Bool, false));
		let b = arena.add_column(TupleSlot::new(1, Type::Bool, true));
		let or = arena.add_binary(ExprKind::Or, a, b, 2).unwrap();

		let mut ctx = context(3);
		ctx.tuple.set_bool(0, true);
		ctx.tuple.set_null(1, true);
		arena.compute(or, &mut ctx).unwrap();
		assert!(ctx.tuple.get_bool(2));
	}

	#[test]
	fn string_and_number_do_not_mix() {
		let mut arena = ExpressionArena::new();
		let a = arena.add_column(TupleSlot::new(0, Type::Utf8, false));
		let b = arena.add_column(TupleSlot::new(1, Type::Int4, false));
		assert!(arena.add_binary(ExprKind::Equals, a, b, 2).is_err());
	}

	#[test]
	fn integer_division_by_zero_is_null() {
		let mut arena = ExpressionArena::new();
		let a = arena.add_column(TupleSlot::new(0, Type::Int4, false));
		let b = arena.add_column(TupleSlot::new(1, Type::Int4, false));
		let div = arena.add_binary(ExprKind::Division, a, b, 2).unwrap();

		let mut ctx = context(3);
		ctx.tuple.set_i32(0, 1);
		ctx.tuple.set_i32(1, 0);
		arena.compute(div, &mut ctx).unwrap();
		assert!(ctx.tuple.is_null(2));
	}
}
