// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_storage::TableKind;

use crate::{EngineError, context::RuntimeContext, mvcc::is_row_visible, operators::OperatorChain};

/// Drops row versions the executing transaction must not see. For data
/// chunks the MVCC vectors come from the context's per-chunk lock; for
/// reference chunks the row is first resolved through the position list
/// and the vectors are read from the referenced table.
#[derive(Debug)]
pub struct Validate {
	input_kind: TableKind,
}

impl Validate {
	pub fn new(input_kind: TableKind) -> Self {
		Self { input_kind }
	}

	pub fn set_input_kind(&mut self, input_kind: TableKind) {
		self.input_kind = input_kind;
	}

	pub fn input_kind(&self) -> TableKind {
		self.input_kind
	}

	pub fn description(&self) -> String {
		match self.input_kind {
			TableKind::Data => "[Validate] data".to_string(),
			TableKind::References => "[Validate] references".to_string(),
		}
	}

	pub fn consume(&self, chain: &OperatorChain, next: usize, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let visible = match self.input_kind {
			TableKind::Data => {
				let offset = ctx.chunk_offset as usize;
				let mvcc = ctx
					.mvcc
					.as_ref()
					.ok_or_else(|| EngineError::mvcc("validate over a data chunk without mvcc data"))?;
				let row_tid = match &ctx.row_tids {
					Some(tids) => tids[offset],
					None => mvcc.tid(offset),
				};
				is_row_visible(
					ctx.own_tid,
					ctx.snapshot_cid,
					mvcc.begin_cid(offset),
					mvcc.end_cid(offset),
					row_tid,
				)
			}
			TableKind::References => {
				let row_id = {
					let pos_list = ctx
						.pos_list
						.as_ref()
						.ok_or_else(|| EngineError::mvcc("validate over a reference chunk without positions"))?;
					pos_list[ctx.chunk_offset as usize]
				};
				let referenced_table = ctx
					.referenced_table
					.as_ref()
					.ok_or_else(|| EngineError::mvcc("validate over a reference chunk without a table"))?;
				let chunk = referenced_table.chunk(row_id.chunk_id)?;
				let mvcc = chunk
					.mvcc()
					.ok_or_else(|| EngineError::mvcc("referenced chunk without mvcc data"))?
					.read();
				let offset = row_id.chunk_offset as usize;
				is_row_visible(
					ctx.own_tid,
					ctx.snapshot_cid,
					mvcc.begin_cid(offset),
					mvcc.end_cid(offset),
					mvcc.tid(offset),
				)
			}
		};
		if visible {
			chain.consume(next, ctx)
		} else {
			Ok(())
		}
	}
}
