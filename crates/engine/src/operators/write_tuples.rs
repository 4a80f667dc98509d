// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_storage::{Chunk, ColumnBuilder, ColumnDef, Table, TableKind};

use crate::{
	EngineError,
	context::{RuntimeContext, SinkState},
	tuple::TupleSlot,
};

#[derive(Debug, Clone)]
pub struct OutputColumn {
	pub name: String,
	pub slot: TupleSlot,
}

/// Materializing sink: appends one value per output column for each
/// surviving row and emits a chunk per input chunk.
#[derive(Debug, Default)]
pub struct WriteTuples {
	outputs: Vec<OutputColumn>,
}

impl WriteTuples {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_output_column(&mut self, name: impl Into<String>, slot: TupleSlot) {
		self.outputs.push(OutputColumn { name: name.into(), slot });
	}

	pub fn outputs(&self) -> &[OutputColumn] {
		&self.outputs
	}

	pub fn description(&self) -> String {
		let columns: Vec<String> =
			self.outputs.iter().map(|output| format!("{} = x{}", output.name, output.slot.index())).collect();
		format!("[WriteTuples] {}", columns.join(", "))
	}

	fn output_defs(&self) -> Vec<ColumnDef> {
		self.outputs
			.iter()
			.map(|output| ColumnDef::new(output.name.clone(), output.slot.ty(), output.slot.nullable()))
			.collect()
	}

	pub fn create_output_table(&self, in_table: &Table) -> Table {
		Table::new(self.output_defs(), TableKind::Data, in_table.max_chunk_size())
	}

	pub fn before_query(&self, ctx: &mut RuntimeContext) {
		let builders =
			self.outputs.iter().map(|output| ColumnBuilder::new(output.slot.ty(), output.slot.nullable())).collect();
		ctx.sink = SinkState::Tuples(builders);
	}

	pub fn consume(&self, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let values: Vec<_> = self.outputs.iter().map(|output| ctx.tuple.get_value(&output.slot)).collect();
		let SinkState::Tuples(builders) = &mut ctx.sink else {
			return Err(EngineError::invalid_plan("write sink without builders"));
		};
		for (builder, value) in builders.iter_mut().zip(values) {
			builder.push(value);
		}
		Ok(())
	}

	pub fn after_chunk(&self, out_table: &mut Table, ctx: &mut RuntimeContext) -> crate::Result<()> {
		self.flush(out_table, ctx)
	}

	pub fn after_query(&self, out_table: &mut Table, ctx: &mut RuntimeContext) -> crate::Result<()> {
		self.flush(out_table, ctx)
	}

	fn flush(&self, out_table: &mut Table, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let SinkState::Tuples(builders) = &mut ctx.sink else {
			return Err(EngineError::invalid_plan("write sink without builders"));
		};
		if builders.first().map_or(true, |builder| builder.is_empty()) {
			return Ok(());
		}
		let segments = builders.iter_mut().map(|builder| builder.flush()).collect::<Result<Vec<_>, _>>()?;
		out_table.add_chunk(Chunk::new(segments));
		Ok(())
	}
}
