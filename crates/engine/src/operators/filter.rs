// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use crate::{context::RuntimeContext, operators::OperatorChain, tuple::TupleSlot};

/// Passes the row on iff the boolean condition slot holds true. An
/// unknown (null) condition filters the row, per SQL semantics.
#[derive(Debug)]
pub struct Filter {
	condition: TupleSlot,
	load: Option<usize>,
}

impl Filter {
	pub fn new(condition: TupleSlot) -> Self {
		Self { condition, load: None }
	}

	pub fn condition(&self) -> TupleSlot {
		self.condition
	}

	/// Fuse the condition column's load into the filter itself.
	pub fn set_load(&mut self, reader: usize) {
		self.load = Some(reader);
	}

	pub fn description(&self) -> String {
		format!("[Filter] x{}", self.condition.index())
	}

	pub fn consume(&self, chain: &OperatorChain, next: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		if let Some(reader) = self.load {
			ctx.read_input(reader)?;
		}
		let index = self.condition.index();
		let pass = !(self.condition.nullable() && ctx.tuple.is_null(index)) && ctx.tuple.get_bool(index);
		if pass {
			chain.consume(next, ctx)
		} else {
			Ok(())
		}
	}
}
