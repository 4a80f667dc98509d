// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use crate::{
	context::RuntimeContext,
	expression::{ExprId, ExpressionArena},
	operators::OperatorChain,
	tuple::TupleSlot,
};

/// Evaluates one expression tree into its result slot and passes the row
/// on unconditionally.
#[derive(Debug)]
pub struct Compute {
	expression: ExprId,
}

impl Compute {
	pub fn new(expression: ExprId) -> Self {
		Self { expression }
	}

	pub fn expression(&self) -> ExprId {
		self.expression
	}

	pub fn result(&self, expressions: &ExpressionArena) -> TupleSlot {
		expressions.result(self.expression)
	}

	pub fn description(&self, expressions: &ExpressionArena) -> String {
		format!(
			"[Compute] x{} = {}",
			expressions.result(self.expression).index(),
			expressions.describe(self.expression)
		)
	}

	pub fn consume(&self, chain: &OperatorChain, next: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		chain.expressions.compute(self.expression, ctx)?;
		chain.consume(next, ctx)
	}
}
