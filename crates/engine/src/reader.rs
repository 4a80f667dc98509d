// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_storage::{DictionarySegment, Segment, SegmentData, Table, table::PosList};
use forgedb_type::{ChunkOffset, ColumnId, Type, ValueId};

use crate::{EngineError, tuple::{RuntimeTuple, TupleSlot}};

/// How a reader obtains its values. Part of the per-chunk type signature
/// the specialized function is compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderSource {
	Value,
	Dictionary,
	DictionaryCodes,
	Reference,
}

/// The type signature of one segment reader. A specialized function is
/// only reused for a chunk whose reader kinds match the kinds it was
/// compiled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderKind {
	pub source: ReaderSource,
	pub ty: Type,
	pub nullable: bool,
}

#[derive(Debug)]
pub struct ValueReader<T> {
	values: Arc<Vec<T>>,
	validity: Option<Arc<Vec<bool>>>,
	slot: TupleSlot,
}

#[derive(Debug)]
pub struct DecodingReader {
	segment: DictionarySegment,
	slot: TupleSlot,
}

#[derive(Debug)]
pub struct CodeReader {
	codes: Arc<Vec<ValueId>>,
	slot: TupleSlot,
}

#[derive(Debug)]
pub struct ReferenceReader {
	table: Arc<Table>,
	column_id: ColumnId,
	positions: Arc<PosList>,
	slot: TupleSlot,
}

/// Per-chunk reader pulling one column's value at the current offset into
/// its tuple slot. The variant is chosen once per chunk; the per-row body
/// of the common variants is monomorphic.
#[derive(Debug)]
pub enum SegmentReader {
	Bool(ValueReader<bool>),
	Int4(ValueReader<i32>),
	Int8(ValueReader<i64>),
	Float4(ValueReader<f32>),
	Float8(ValueReader<f64>),
	Utf8(ValueReader<String>),
	Decode(DecodingReader),
	Codes(CodeReader),
	Reference(ReferenceReader),
}

impl SegmentReader {
	/// Build the reader feeding `slot` from `segment`. With
	/// `use_value_id` the segment must be dictionary encoded and the
	/// reader yields raw codes instead of decoded values.
	pub fn build(segment: &Segment, slot: TupleSlot, use_value_id: bool) -> crate::Result<Self> {
		if use_value_id {
			return match segment {
				Segment::Dictionary(dictionary) => {
					Ok(SegmentReader::Codes(CodeReader { codes: Arc::clone(dictionary.codes()), slot }))
				}
				_ => Err(EngineError::invalid_plan(
					"value id predicate over a segment that is not dictionary encoded",
				)),
			};
		}
		let reader = match segment {
			Segment::Value(value) => {
				let validity = value.validity().cloned();
				match value.data() {
					SegmentData::Bool(values) => {
						SegmentReader::Bool(ValueReader { values: Arc::clone(values), validity, slot })
					}
					SegmentData::Int4(values) => {
						SegmentReader::Int4(ValueReader { values: Arc::clone(values), validity, slot })
					}
					SegmentData::Int8(values) => {
						SegmentReader::Int8(ValueReader { values: Arc::clone(values), validity, slot })
					}
					SegmentData::Float4(values) => {
						SegmentReader::Float4(ValueReader { values: Arc::clone(values), validity, slot })
					}
					SegmentData::Float8(values) => {
						SegmentReader::Float8(ValueReader { values: Arc::clone(values), validity, slot })
					}
					SegmentData::Utf8(values) => {
						SegmentReader::Utf8(ValueReader { values: Arc::clone(values), validity, slot })
					}
				}
			}
			Segment::Dictionary(dictionary) => {
				SegmentReader::Decode(DecodingReader { segment: dictionary.clone(), slot })
			}
			Segment::Reference(reference) => SegmentReader::Reference(ReferenceReader {
				table: Arc::clone(reference.referenced_table()),
				column_id: reference.referenced_column(),
				positions: Arc::clone(reference.positions()),
				slot,
			}),
		};
		Ok(reader)
	}

	pub fn kind(&self) -> ReaderKind {
		match self {
			SegmentReader::Bool(reader) => value_kind(Type::Bool, reader.validity.is_some()),
			SegmentReader::Int4(reader) => value_kind(Type::Int4, reader.validity.is_some()),
			SegmentReader::Int8(reader) => value_kind(Type::Int8, reader.validity.is_some()),
			SegmentReader::Float4(reader) => value_kind(Type::Float4, reader.validity.is_some()),
			SegmentReader::Float8(reader) => value_kind(Type::Float8, reader.validity.is_some()),
			SegmentReader::Utf8(reader) => value_kind(Type::Utf8, reader.validity.is_some()),
			SegmentReader::Decode(reader) => ReaderKind {
				source: ReaderSource::Dictionary,
				ty: reader.segment.ty(),
				nullable: reader.slot.nullable(),
			},
			SegmentReader::Codes(reader) => ReaderKind {
				source: ReaderSource::DictionaryCodes,
				ty: Type::ValueId,
				nullable: reader.slot.nullable(),
			},
			SegmentReader::Reference(reader) => ReaderKind {
				source: ReaderSource::Reference,
				ty: reader.slot.ty(),
				nullable: reader.slot.nullable(),
			},
		}
	}

	/// Pull the value at `offset` into the reader's slot.
	pub fn read_into(&self, offset: ChunkOffset, tuple: &mut RuntimeTuple) -> crate::Result<()> {
		let offset = offset as usize;
		match self {
			SegmentReader::Bool(reader) => {
				if read_null(reader, offset, tuple) {
					return Ok(());
				}
				tuple.set_bool(reader.slot.index(), reader.values[offset]);
			}
			SegmentReader::Int4(reader) => {
				if read_null(reader, offset, tuple) {
					return Ok(());
				}
				tuple.set_i32(reader.slot.index(), reader.values[offset]);
			}
			SegmentReader::Int8(reader) => {
				if read_null(reader, offset, tuple) {
					return Ok(());
				}
				tuple.set_i64(reader.slot.index(), reader.values[offset]);
			}
			SegmentReader::Float4(reader) => {
				if read_null(reader, offset, tuple) {
					return Ok(());
				}
				tuple.set_f32(reader.slot.index(), reader.values[offset]);
			}
			SegmentReader::Float8(reader) => {
				if read_null(reader, offset, tuple) {
					return Ok(());
				}
				tuple.set_f64(reader.slot.index(), reader.values[offset]);
			}
			SegmentReader::Utf8(reader) => {
				if read_null(reader, offset, tuple) {
					return Ok(());
				}
				tuple.set_string(reader.slot.index(), reader.values[offset].clone());
			}
			SegmentReader::Decode(reader) => {
				let value = reader.segment.get(offset)?;
				tuple.set_value(&reader.slot, &value);
			}
			SegmentReader::Codes(reader) => {
				let code = reader.codes[offset];
				if code.is_invalid() {
					tuple.set_null(reader.slot.index(), true);
				} else {
					tuple.set_value_id(reader.slot.index(), code.0);
				}
			}
			SegmentReader::Reference(reader) => {
				let row_id = reader.positions[offset];
				let chunk = reader.table.chunk(row_id.chunk_id)?;
				let value = chunk.segment(reader.column_id)?.get(row_id.chunk_offset as usize)?;
				tuple.set_value(&reader.slot, &value);
			}
		}
		Ok(())
	}
}

fn value_kind(ty: Type, nullable: bool) -> ReaderKind {
	ReaderKind { source: ReaderSource::Value, ty, nullable }
}

fn read_null<T>(reader: &ValueReader<T>, offset: usize, tuple: &mut RuntimeTuple) -> bool {
	match &reader.validity {
		Some(validity) if !validity[offset] => {
			tuple.set_null(reader.slot.index(), true);
			true
		}
		_ => false,
	}
}
