// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_type::{Type, Value};

use crate::segment::{Segment, ValueSegment};

/// Row-at-a-time accumulator for one output column. Sinks push one value
/// per surviving row and flush the builder into a segment per chunk.
#[derive(Debug)]
pub struct ColumnBuilder {
	ty: Type,
	nullable: bool,
	values: Vec<Value>,
}

impl ColumnBuilder {
	pub fn new(ty: Type, nullable: bool) -> Self {
		Self { ty, nullable, values: Vec::new() }
	}

	pub fn ty(&self) -> Type {
		self.ty
	}

	pub fn push(&mut self, value: Value) {
		debug_assert!(value.is_undefined() || value.ty() == self.ty, "builder fed a value of the wrong type");
		self.values.push(value);
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Drain the accumulated values into a value segment.
	pub fn flush(&mut self) -> crate::Result<Arc<Segment>> {
		let values = std::mem::take(&mut self.values);
		let segment = ValueSegment::from_values(self.ty, self.nullable, &values)?;
		Ok(Arc::new(Segment::Value(segment)))
	}
}
