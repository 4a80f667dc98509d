// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_storage::{Chunk, ColumnDef, ReferenceSegment, Segment, Table, TableKind};
use forgedb_type::{ColumnId, RowId, Type};

use crate::{
	EngineError,
	context::{RuntimeContext, SinkState},
};

/// A passthrough output column: no computation, just a name and the id
/// of the column in the (possibly referenced) input table.
#[derive(Debug, Clone)]
pub struct PassthroughColumn {
	pub name: String,
	pub ty: Type,
	pub nullable: bool,
	pub column_id: ColumnId,
}

/// Position-only sink, used when every output column passes an input
/// column through: it records `(chunk, offset)` pairs instead of values
/// and emits reference chunks sharing one position list per input chunk.
#[derive(Debug, Default)]
pub struct WriteOffset {
	outputs: Vec<PassthroughColumn>,
}

impl WriteOffset {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_output_column(&mut self, column: PassthroughColumn) {
		self.outputs.push(column);
	}

	pub fn outputs(&self) -> &[PassthroughColumn] {
		&self.outputs
	}

	pub fn description(&self) -> String {
		let columns: Vec<String> =
			self.outputs.iter().map(|output| format!("{} = {}", output.name, output.column_id)).collect();
		format!("[WriteOffset] {}", columns.join(", "))
	}

	pub fn create_output_table(&self, in_table: &Table) -> Table {
		let defs = self
			.outputs
			.iter()
			.map(|output| ColumnDef::new(output.name.clone(), output.ty, output.nullable))
			.collect();
		Table::new(defs, TableKind::References, in_table.max_chunk_size())
	}

	pub fn before_query(&self, ctx: &mut RuntimeContext) {
		ctx.sink = SinkState::Offsets(Vec::new());
	}

	pub fn consume(&self, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let row_id = RowId::new(ctx.chunk_id, ctx.chunk_offset);
		let SinkState::Offsets(positions) = &mut ctx.sink else {
			return Err(EngineError::invalid_plan("offset sink without position state"));
		};
		positions.push(row_id);
		Ok(())
	}

	/// Drain the chunk's surviving positions into one reference chunk.
	/// When the input itself is a reference table, the positions are
	/// resolved once more so the output references the original table.
	pub fn after_chunk(
		&self,
		in_table: &Arc<Table>,
		out_table: &mut Table,
		ctx: &mut RuntimeContext,
	) -> crate::Result<()> {
		let positions = {
			let SinkState::Offsets(positions) = &mut ctx.sink else {
				return Err(EngineError::invalid_plan("offset sink without position state"));
			};
			std::mem::take(positions)
		};
		if positions.is_empty() {
			return Ok(());
		}

		match in_table.kind() {
			TableKind::Data => {
				let positions = Arc::new(positions);
				let segments = self
					.outputs
					.iter()
					.map(|output| {
						Arc::new(Segment::Reference(ReferenceSegment::new(
							Arc::clone(in_table),
							output.column_id,
							Arc::clone(&positions),
						)))
					})
					.collect();
				out_table.add_chunk(Chunk::new(segments));
			}
			TableKind::References => {
				let in_chunk = in_table.chunk(ctx.chunk_id)?;
				let (referenced_table, referenced_positions) = in_chunk.reference_target()?;
				let resolved: Vec<RowId> = positions
					.iter()
					.map(|row_id| referenced_positions[row_id.chunk_offset as usize])
					.collect();
				let resolved = Arc::new(resolved);
				let segments = self
					.outputs
					.iter()
					.map(|output| {
						let column_id = match in_chunk.segment(output.column_id)?.as_ref() {
							Segment::Reference(reference) => reference.referenced_column(),
							_ => {
								return Err(EngineError::mvcc(
									"reference chunk with a non-reference segment",
								));
							}
						};
						Ok(Arc::new(Segment::Reference(ReferenceSegment::new(
							Arc::clone(&referenced_table),
							column_id,
							Arc::clone(&resolved),
						))))
					})
					.collect::<crate::Result<Vec<_>>>()?;
				out_table.add_chunk(Chunk::new(segments));
			}
		}
		Ok(())
	}

	pub fn after_query(&self, _out_table: &mut Table, _ctx: &mut RuntimeContext) -> crate::Result<()> {
		Ok(())
	}
}
