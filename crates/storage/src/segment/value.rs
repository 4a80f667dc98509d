// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::Arc;

use forgedb_type::{Type, Value};

use crate::StorageError;

/// Typed payload of a value segment or of a dictionary. Payloads are
/// shared through `Arc` so per-chunk readers can hold a cheap handle and
/// keep their per-row access monomorphic.
#[derive(Debug, Clone)]
pub enum SegmentData {
	Bool(Arc<Vec<bool>>),
	Int4(Arc<Vec<i32>>),
	Int8(Arc<Vec<i64>>),
	Float4(Arc<Vec<f32>>),
	Float8(Arc<Vec<f64>>),
	Utf8(Arc<Vec<String>>),
}

impl SegmentData {
	pub fn ty(&self) -> Type {
		match self {
			SegmentData::Bool(_) => Type::Bool,
			SegmentData::Int4(_) => Type::Int4,
			SegmentData::Int8(_) => Type::Int8,
			SegmentData::Float4(_) => Type::Float4,
			SegmentData::Float8(_) => Type::Float8,
			SegmentData::Utf8(_) => Type::Utf8,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			SegmentData::Bool(values) => values.len(),
			SegmentData::Int4(values) => values.len(),
			SegmentData::Int8(values) => values.len(),
			SegmentData::Float4(values) => values.len(),
			SegmentData::Float8(values) => values.len(),
			SegmentData::Utf8(values) => values.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn value(&self, offset: usize) -> Value {
		match self {
			SegmentData::Bool(values) => Value::Bool(values[offset]),
			SegmentData::Int4(values) => Value::Int4(values[offset]),
			SegmentData::Int8(values) => Value::Int8(values[offset]),
			SegmentData::Float4(values) => Value::Float4(values[offset]),
			SegmentData::Float8(values) => Value::Float8(values[offset]),
			SegmentData::Utf8(values) => Value::Utf8(values[offset].clone()),
		}
	}

	/// Collect `values` into a typed payload, substituting the type's
	/// default at undefined positions (the caller tracks validity).
	pub fn from_values(ty: Type, values: &[Value]) -> crate::Result<Self> {
		fn collect<T: Default>(
			values: &[Value],
			ty: Type,
			extract: impl Fn(&Value) -> Option<T>,
		) -> crate::Result<Vec<T>> {
			values
				.iter()
				.map(|value| {
					if value.is_undefined() {
						return Ok(T::default());
					}
					let casted = value.cast_to(ty)?;
					extract(&casted).ok_or(StorageError::TypeMismatch { expected: ty, actual: value.ty() })
				})
				.collect()
		}

		let data = match ty {
			Type::Bool => SegmentData::Bool(Arc::new(collect(values, ty, |v| match v {
				Value::Bool(v) => Some(*v),
				_ => None,
			})?)),
			Type::Int4 => SegmentData::Int4(Arc::new(collect(values, ty, |v| match v {
				Value::Int4(v) => Some(*v),
				_ => None,
			})?)),
			Type::Int8 => SegmentData::Int8(Arc::new(collect(values, ty, |v| match v {
				Value::Int8(v) => Some(*v),
				_ => None,
			})?)),
			Type::Float4 => SegmentData::Float4(Arc::new(collect(values, ty, |v| match v {
				Value::Float4(v) => Some(*v),
				_ => None,
			})?)),
			Type::Float8 => SegmentData::Float8(Arc::new(collect(values, ty, |v| match v {
				Value::Float8(v) => Some(*v),
				_ => None,
			})?)),
			Type::Utf8 => SegmentData::Utf8(Arc::new(collect(values, ty, |v| match v {
				Value::Utf8(v) => Some(v.clone()),
				_ => None,
			})?)),
			other => return Err(StorageError::TypeMismatch { expected: other, actual: other }),
		};
		Ok(data)
	}
}

/// An uncompressed, materialized column segment with optional validity.
#[derive(Debug, Clone)]
pub struct ValueSegment {
	data: SegmentData,
	validity: Option<Arc<Vec<bool>>>,
}

impl ValueSegment {
	pub fn new(data: SegmentData, validity: Option<Arc<Vec<bool>>>) -> Self {
		if let Some(validity) = &validity {
			debug_assert_eq!(validity.len(), data.len());
		}
		Self { data, validity }
	}

	pub fn from_values(ty: Type, nullable: bool, values: &[Value]) -> crate::Result<Self> {
		let data = SegmentData::from_values(ty, values)?;
		let validity = nullable.then(|| Arc::new(values.iter().map(|value| !value.is_undefined()).collect()));
		Ok(Self { data, validity })
	}

	pub fn ty(&self) -> Type {
		self.data.ty()
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn data(&self) -> &SegmentData {
		&self.data
	}

	pub fn validity(&self) -> Option<&Arc<Vec<bool>>> {
		self.validity.as_ref()
	}

	pub fn is_valid(&self, offset: usize) -> bool {
		self.validity.as_ref().map_or(true, |validity| validity[offset])
	}

	pub fn get(&self, offset: usize) -> crate::Result<Value> {
		if offset >= self.len() {
			return Err(StorageError::OffsetOutOfBounds { offset, len: self.len() });
		}
		if !self.is_valid(offset) {
			return Ok(Value::Undefined);
		}
		Ok(self.data.value(offset))
	}
}
