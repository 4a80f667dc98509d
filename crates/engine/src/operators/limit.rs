// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use crate::{context::RuntimeContext, operators::OperatorChain};

/// Counts surviving rows against the context's remaining-rows budget.
/// When the budget is used up the tail is not called and the source
/// stops at the top of its loop.
#[derive(Debug)]
pub struct Limit;

impl Limit {
	pub fn description(&self) -> String {
		"[Limit]".to_string()
	}

	pub fn consume(&self, chain: &OperatorChain, next: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		if ctx.remaining_rows == 0 {
			return Ok(());
		}
		ctx.remaining_rows -= 1;
		chain.consume(next, ctx)
	}
}
