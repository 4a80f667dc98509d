// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_type::ColumnId;

use crate::{context::RuntimeContext, operators::OperatorChain, tuple::TupleSlot};

/// Explicit column load, inserted by the wrapper right before the first
/// operator that reads the slot when the load cannot be embedded.
#[derive(Debug)]
pub struct ReadValue {
	column_id: ColumnId,
	slot: TupleSlot,
	reader: usize,
}

impl ReadValue {
	pub fn new(column_id: ColumnId, slot: TupleSlot, reader: usize) -> Self {
		Self { column_id, slot, reader }
	}

	pub fn slot(&self) -> TupleSlot {
		self.slot
	}

	pub fn description(&self) -> String {
		format!("[ReadValue] x{} = {}", self.slot.index(), self.column_id)
	}

	pub fn consume(&self, chain: &OperatorChain, next: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		ctx.read_input(self.reader)?;
		chain.consume(next, ctx)
	}
}
