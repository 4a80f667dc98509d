// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_type::{Type, Value, ValueId};

use crate::{StorageError, segment::SegmentData};

/// A dictionary-compressed column segment: a sorted dictionary of the
/// distinct non-null values plus one code per row. Nulls are encoded as
/// `ValueId::INVALID` in the attribute vector.
#[derive(Debug, Clone)]
pub struct DictionarySegment {
	dictionary: SegmentData,
	codes: Arc<Vec<ValueId>>,
}

impl DictionarySegment {
	/// Dictionary-encode `values`. The dictionary keeps the distinct
	/// non-null values in sorted order, so code comparisons are monotone
	/// with value comparisons.
	pub fn from_values(ty: Type, values: &[Value]) -> crate::Result<Self> {
		let mut distinct = values
			.iter()
			.filter(|value| !value.is_undefined())
			.map(|value| value.cast_to(ty).map_err(StorageError::from))
			.collect::<crate::Result<Vec<_>>>()?;
		sort_values(ty, &mut distinct)?;
		distinct.dedup();
		if let Some(last) = distinct.len().checked_sub(1) {
			// Every code must fit below the not-found substitute.
			ValueId::from_index(last)?;
		}

		let mut segment =
			Self { dictionary: SegmentData::from_values(ty, &distinct)?, codes: Arc::new(Vec::new()) };
		let codes = values
			.iter()
			.map(|value| {
				if value.is_undefined() {
					return Ok(ValueId::INVALID);
				}
				// Every encoded value is in the dictionary, so the
				// lower bound is its exact code.
				segment.lower_bound(&value.cast_to(ty)?)
			})
			.collect::<crate::Result<Vec<_>>>()?;
		segment.codes = Arc::new(codes);
		Ok(segment)
	}

	pub fn ty(&self) -> Type {
		self.dictionary.ty()
	}

	/// Number of rows in the segment.
	pub fn len(&self) -> usize {
		self.codes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.codes.is_empty()
	}

	/// Number of distinct values in the dictionary.
	pub fn unique_values_count(&self) -> usize {
		self.dictionary.len()
	}

	pub fn codes(&self) -> &Arc<Vec<ValueId>> {
		&self.codes
	}

	/// The id of the first dictionary entry `>= value`, or
	/// `ValueId::INVALID` when every entry is smaller.
	pub fn lower_bound(&self, value: &Value) -> crate::Result<ValueId> {
		let index = self.partition_point(value, false)?;
		Ok(self.bound_to_id(index))
	}

	/// The id of the first dictionary entry `> value`, or
	/// `ValueId::INVALID` when every entry is smaller or equal.
	pub fn upper_bound(&self, value: &Value) -> crate::Result<ValueId> {
		let index = self.partition_point(value, true)?;
		Ok(self.bound_to_id(index))
	}

	/// The dictionary entry behind `id`, if `id` is a real code.
	pub fn value_of(&self, id: ValueId) -> Option<Value> {
		if id.is_invalid() || id.0 as usize >= self.dictionary.len() {
			return None;
		}
		Some(self.dictionary.value(id.0 as usize))
	}

	pub fn get(&self, offset: usize) -> crate::Result<Value> {
		if offset >= self.len() {
			return Err(StorageError::OffsetOutOfBounds { offset, len: self.len() });
		}
		Ok(self.value_of(self.codes[offset]).unwrap_or(Value::Undefined))
	}

	fn bound_to_id(&self, index: usize) -> ValueId {
		if index >= self.dictionary.len() {
			ValueId::INVALID
		} else {
			ValueId(index as u32)
		}
	}

	fn partition_point(&self, value: &Value, inclusive: bool) -> crate::Result<usize> {
		macro_rules! bound {
			($entries:expr, $probe:expr) => {
				if inclusive {
					$entries.partition_point(|entry| entry <= $probe)
				} else {
					$entries.partition_point(|entry| entry < $probe)
				}
			};
		}
		let index = match (&self.dictionary, value) {
			(SegmentData::Bool(entries), Value::Bool(probe)) => bound!(entries, probe),
			(SegmentData::Int4(entries), Value::Int4(probe)) => bound!(entries, probe),
			(SegmentData::Int8(entries), Value::Int8(probe)) => bound!(entries, probe),
			(SegmentData::Float4(entries), Value::Float4(probe)) => {
				if inclusive {
					entries.partition_point(|entry| entry.total_cmp(probe).is_le())
				} else {
					entries.partition_point(|entry| entry.total_cmp(probe).is_lt())
				}
			}
			(SegmentData::Float8(entries), Value::Float8(probe)) => {
				if inclusive {
					entries.partition_point(|entry| entry.total_cmp(probe).is_le())
				} else {
					entries.partition_point(|entry| entry.total_cmp(probe).is_lt())
				}
			}
			(SegmentData::Utf8(entries), Value::Utf8(probe)) => bound!(entries, probe),
			_ => return Err(StorageError::TypeMismatch { expected: self.ty(), actual: value.ty() }),
		};
		Ok(index)
	}
}

fn sort_values(ty: Type, values: &mut [Value]) -> crate::Result<()> {
	match ty {
		Type::Bool => values.sort_by_key(|value| matches!(value, Value::Bool(true))),
		Type::Int4 => values.sort_by_key(|value| match value {
			Value::Int4(v) => *v,
			_ => i32::MAX,
		}),
		Type::Int8 => values.sort_by_key(|value| match value {
			Value::Int8(v) => *v,
			_ => i64::MAX,
		}),
		Type::Float4 => values.sort_by(|left, right| match (left, right) {
			(Value::Float4(l), Value::Float4(r)) => l.total_cmp(r),
			_ => std::cmp::Ordering::Equal,
		}),
		Type::Float8 => values.sort_by(|left, right| match (left, right) {
			(Value::Float8(l), Value::Float8(r)) => l.total_cmp(r),
			_ => std::cmp::Ordering::Equal,
		}),
		Type::Utf8 => values.sort_by(|left, right| match (left, right) {
			(Value::Utf8(l), Value::Utf8(r)) => l.cmp(r),
			_ => std::cmp::Ordering::Equal,
		}),
		other => return Err(StorageError::TypeMismatch { expected: other, actual: other }),
	}
	Ok(())
}
