// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::{
	cmp::Ordering,
	collections::{HashMap, hash_map::Entry},
};

use forgedb_plan::AggregateFunction;
use forgedb_storage::{Chunk, ColumnBuilder, ColumnDef, Table, TableKind};
use forgedb_type::{Type, Value};

use crate::{
	EngineError,
	context::{RuntimeContext, SinkState},
	tuple::{RuntimeTuple, TupleSlot},
};

/// Hashable rendition of one group-by slot value. Floats hash by their
/// bit pattern; null is its own key part so null groups stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
	Undefined,
	Bool(bool),
	Int4(i32),
	Int8(i64),
	Float4(u32),
	Float8(u64),
	Utf8(String),
	ValueId(u32),
}

pub type GroupKey = Vec<KeyPart>;

#[derive(Debug)]
pub struct GroupState {
	keys: Vec<Value>,
	accumulators: Vec<Accumulator>,
}

#[derive(Debug, Clone)]
pub enum Accumulator {
	CountAll { count: i64 },
	Count { count: i64 },
	SumInt { sum: i64, seen: bool },
	SumFloat { sum: f64, seen: bool },
	Min { value: Option<Value> },
	Max { value: Option<Value> },
	Avg { sum: f64, count: i64 },
}

impl Accumulator {
	fn update(&mut self, input: &Value) {
		match self {
			Accumulator::CountAll { count } => *count += 1,
			Accumulator::Count { count } => {
				if !input.is_undefined() {
					*count += 1;
				}
			}
			Accumulator::SumInt { sum, seen } => {
				if let Some(value) = numeric_as_i64(input) {
					*sum = sum.wrapping_add(value);
					*seen = true;
				}
			}
			Accumulator::SumFloat { sum, seen } => {
				if let Some(value) = numeric_as_f64(input) {
					*sum += value;
					*seen = true;
				}
			}
			Accumulator::Min { value } => {
				if input.is_undefined() {
					return;
				}
				let replace =
					value.as_ref().map_or(true, |best| compare_values(input, best) == Ordering::Less);
				if replace {
					*value = Some(input.clone());
				}
			}
			Accumulator::Max { value } => {
				if input.is_undefined() {
					return;
				}
				let replace =
					value.as_ref().map_or(true, |best| compare_values(input, best) == Ordering::Greater);
				if replace {
					*value = Some(input.clone());
				}
			}
			Accumulator::Avg { sum, count } => {
				if let Some(value) = numeric_as_f64(input) {
					*sum += value;
					*count += 1;
				}
			}
		}
	}

	fn result(&self) -> Value {
		match self {
			Accumulator::CountAll { count } | Accumulator::Count { count } => Value::Int8(*count),
			Accumulator::SumInt { sum, seen } => {
				if *seen {
					Value::Int8(*sum)
				} else {
					Value::Undefined
				}
			}
			Accumulator::SumFloat { sum, seen } => {
				if *seen {
					Value::Float8(*sum)
				} else {
					Value::Undefined
				}
			}
			Accumulator::Min { value } | Accumulator::Max { value } => {
				value.clone().unwrap_or(Value::Undefined)
			}
			Accumulator::Avg { sum, count } => {
				if *count > 0 {
					Value::Float8(sum / *count as f64)
				} else {
					Value::Undefined
				}
			}
		}
	}
}

#[derive(Debug, Clone)]
pub struct GroupByColumn {
	pub name: String,
	pub slot: TupleSlot,
}

#[derive(Debug, Clone)]
pub struct AggregateColumn {
	pub name: String,
	pub slot: Option<TupleSlot>,
	pub function: AggregateFunction,
}

/// Hash-aggregate sink: one map entry per distinct combination of the
/// group-by slots, holding one accumulator per aggregate column. Groups
/// are materialized into the output table when the query finishes.
#[derive(Debug, Default)]
pub struct AggregateSink {
	group_by: Vec<GroupByColumn>,
	aggregates: Vec<AggregateColumn>,
}

impl AggregateSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_groupby_column(&mut self, name: impl Into<String>, slot: TupleSlot) {
		self.group_by.push(GroupByColumn { name: name.into(), slot });
	}

	/// `slot` is `None` only for `COUNT(*)`.
	pub fn add_aggregate_column(
		&mut self,
		name: impl Into<String>,
		slot: Option<TupleSlot>,
		function: AggregateFunction,
	) -> crate::Result<()> {
		match function {
			AggregateFunction::CountDistinct => return Err(EngineError::CountDistinctUnsupported),
			AggregateFunction::Count => {}
			_ => {
				let slot = slot.ok_or_else(|| {
					EngineError::invalid_plan(format!("{}() needs an argument", function.name()))
				})?;
				if matches!(function, AggregateFunction::Sum | AggregateFunction::Avg)
					&& !slot.ty().is_numeric()
				{
					return Err(EngineError::invalid_plan(format!(
						"{}() over non-numeric type {}",
						function.name(),
						slot.ty()
					)));
				}
			}
		}
		self.aggregates.push(AggregateColumn { name: name.into(), slot, function });
		Ok(())
	}

	pub fn group_by_columns(&self) -> &[GroupByColumn] {
		&self.group_by
	}

	pub fn aggregate_columns(&self) -> &[AggregateColumn] {
		&self.aggregates
	}

	pub fn description(&self) -> String {
		let groups: Vec<String> =
			self.group_by.iter().map(|column| format!("{} = x{}", column.name, column.slot.index())).collect();
		let aggregates: Vec<String> = self.aggregates.iter().map(|column| column.name.clone()).collect();
		format!("[Aggregate] by ({}) compute ({})", groups.join(", "), aggregates.join(", "))
	}

	fn output_defs(&self) -> Vec<ColumnDef> {
		let mut defs = Vec::with_capacity(self.group_by.len() + self.aggregates.len());
		for column in &self.group_by {
			defs.push(ColumnDef::new(column.name.clone(), column.slot.ty(), column.slot.nullable()));
		}
		for column in &self.aggregates {
			let ty = match (column.function, column.slot) {
				(AggregateFunction::Count, _) | (AggregateFunction::CountDistinct, _) => Type::Int8,
				(AggregateFunction::Avg, _) => Type::Float8,
				(AggregateFunction::Sum, Some(slot)) => match slot.ty() {
					// Integer sums accumulate in the wide type.
					Type::Int4 | Type::Int8 => Type::Int8,
					Type::Float4 => Type::Float4,
					_ => Type::Float8,
				},
				(_, Some(slot)) => slot.ty(),
				(_, None) => Type::Int8,
			};
			let nullable =
				!matches!(column.function, AggregateFunction::Count | AggregateFunction::CountDistinct);
			defs.push(ColumnDef::new(column.name.clone(), ty, nullable));
		}
		defs
	}

	fn fresh_accumulators(&self) -> Vec<Accumulator> {
		self.aggregates
			.iter()
			.map(|column| match (column.function, column.slot) {
				(AggregateFunction::Count, None) => Accumulator::CountAll { count: 0 },
				(AggregateFunction::Count, Some(_)) => Accumulator::Count { count: 0 },
				(AggregateFunction::Sum, Some(slot)) => match slot.ty() {
					Type::Int4 | Type::Int8 => Accumulator::SumInt { sum: 0, seen: false },
					_ => Accumulator::SumFloat { sum: 0.0, seen: false },
				},
				(AggregateFunction::Min, _) => Accumulator::Min { value: None },
				(AggregateFunction::Max, _) => Accumulator::Max { value: None },
				(AggregateFunction::Avg, _) => Accumulator::Avg { sum: 0.0, count: 0 },
				_ => Accumulator::CountAll { count: 0 },
			})
			.collect()
	}

	pub fn create_output_table(&self, in_table: &Table) -> Table {
		Table::new(self.output_defs(), TableKind::Data, in_table.max_chunk_size())
	}

	pub fn before_query(&self, ctx: &mut RuntimeContext) {
		ctx.sink = SinkState::Aggregate(HashMap::new());
	}

	pub fn consume(&self, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let key: GroupKey = self.group_by.iter().map(|column| key_part(&ctx.tuple, column.slot)).collect();
		let key_values: Vec<Value> =
			self.group_by.iter().map(|column| ctx.tuple.get_value(&column.slot)).collect();
		let inputs: Vec<Value> = self
			.aggregates
			.iter()
			.map(|column| match column.slot {
				Some(slot) => ctx.tuple.get_value(&slot),
				None => Value::Undefined,
			})
			.collect();

		let SinkState::Aggregate(groups) = &mut ctx.sink else {
			return Err(EngineError::invalid_plan("aggregate sink without aggregate state"));
		};
		let state = match groups.entry(key) {
			Entry::Occupied(entry) => entry.into_mut(),
			Entry::Vacant(entry) => {
				entry.insert(GroupState { keys: key_values, accumulators: self.fresh_accumulators() })
			}
		};
		for (accumulator, input) in state.accumulators.iter_mut().zip(inputs.iter()) {
			accumulator.update(input);
		}
		Ok(())
	}

	pub fn after_query(&self, out_table: &mut Table, ctx: &mut RuntimeContext) -> crate::Result<()> {
		let SinkState::Aggregate(groups) = std::mem::replace(&mut ctx.sink, SinkState::None) else {
			return Err(EngineError::invalid_plan("aggregate sink without aggregate state"));
		};
		let defs = self.output_defs();
		let mut builders: Vec<ColumnBuilder> =
			defs.iter().map(|def| ColumnBuilder::new(def.ty, def.nullable)).collect();
		let max_chunk_size = out_table.max_chunk_size();

		let mut rows = 0usize;
		for state in groups.into_values() {
			for (index, key) in state.keys.iter().enumerate() {
				builders[index].push(key.clone());
			}
			for (offset, accumulator) in state.accumulators.iter().enumerate() {
				let def = &defs[self.group_by.len() + offset];
				let value = accumulator.result();
				let value = if value.is_undefined() { value } else { value.cast_to(def.ty)? };
				builders[self.group_by.len() + offset].push(value);
			}
			rows += 1;
			if rows == max_chunk_size {
				flush(&mut builders, out_table)?;
				rows = 0;
			}
		}
		if rows > 0 {
			flush(&mut builders, out_table)?;
		}
		Ok(())
	}
}

fn flush(builders: &mut [ColumnBuilder], out_table: &mut Table) -> crate::Result<()> {
	let segments = builders.iter_mut().map(|builder| builder.flush()).collect::<Result<Vec<_>, _>>()?;
	out_table.add_chunk(Chunk::new(segments));
	Ok(())
}

fn key_part(tuple: &RuntimeTuple, slot: TupleSlot) -> KeyPart {
	if slot.nullable() && tuple.is_null(slot.index()) {
		return KeyPart::Undefined;
	}
	match slot.ty() {
		Type::Bool => KeyPart::Bool(tuple.get_bool(slot.index())),
		Type::Int4 => KeyPart::Int4(tuple.get_i32(slot.index())),
		Type::Int8 => KeyPart::Int8(tuple.get_i64(slot.index())),
		Type::Float4 => KeyPart::Float4(tuple.get_f32(slot.index()).to_bits()),
		Type::Float8 => KeyPart::Float8(tuple.get_f64(slot.index()).to_bits()),
		Type::Utf8 => KeyPart::Utf8(tuple.get_str(slot.index()).to_string()),
		Type::ValueId => KeyPart::ValueId(tuple.get_value_id(slot.index())),
		Type::Undefined => KeyPart::Undefined,
	}
}

fn numeric_as_i64(value: &Value) -> Option<i64> {
	match value {
		Value::Int4(v) => Some(*v as i64),
		Value::Int8(v) => Some(*v),
		_ => None,
	}
}

fn numeric_as_f64(value: &Value) -> Option<f64> {
	match value {
		Value::Int4(v) => Some(*v as f64),
		Value::Int8(v) => Some(*v as f64),
		Value::Float4(v) => Some(*v as f64),
		Value::Float8(v) => Some(*v),
		_ => None,
	}
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
	match (left, right) {
		(Value::Bool(l), Value::Bool(r)) => l.cmp(r),
		(Value::Utf8(l), Value::Utf8(r)) => l.cmp(r),
		(Value::Int4(l), Value::Int4(r)) => l.cmp(r),
		(Value::Int8(l), Value::Int8(r)) => l.cmp(r),
		(Value::Float4(l), Value::Float4(r)) => l.total_cmp(r),
		(Value::Float8(l), Value::Float8(r)) => l.total_cmp(r),
		_ => Ordering::Equal,
	}
}
