// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{TypeError, ValueId};

/// The closed set of column types the execution core understands.
///
/// `ValueId` is synthetic: it never appears in a table schema and is only
/// used for tuple slots holding dictionary codes after a predicate has
/// been rewritten to compare value ids. `Undefined` is the placeholder
/// type of untyped literals (`NULL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
	Bool,
	Int4,
	Int8,
	Float4,
	Float8,
	Utf8,
	ValueId,
	Undefined,
}

impl Type {
	pub fn is_numeric(&self) -> bool {
		matches!(self, Type::Int4 | Type::Int8 | Type::Float4 | Type::Float8)
	}

	pub fn is_string(&self) -> bool {
		matches!(self, Type::Utf8)
	}

	/// Numeric promotion used by arithmetic expressions: the wider of the
	/// two operand types, with floats dominating integers.
	pub fn promote(self, other: Type) -> Option<Type> {
		fn rank(ty: Type) -> Option<u8> {
			match ty {
				Type::Int4 => Some(0),
				Type::Int8 => Some(1),
				Type::Float4 => Some(2),
				Type::Float8 => Some(3),
				_ => None,
			}
		}
		let (left, right) = (rank(self)?, rank(other)?);
		let merged = if left >= right { self } else { other };
		Some(merged)
	}
}

impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Type::Bool => f.write_str("bool"),
			Type::Int4 => f.write_str("int4"),
			Type::Int8 => f.write_str("int8"),
			Type::Float4 => f.write_str("float4"),
			Type::Float8 => f.write_str("float8"),
			Type::Utf8 => f.write_str("utf8"),
			Type::ValueId => f.write_str("value_id"),
			Type::Undefined => f.write_str("undefined"),
		}
	}
}

/// An owning value of any column type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	Bool(bool),
	Int4(i32),
	Int8(i64),
	Float4(f32),
	Float8(f64),
	Utf8(String),
	ValueId(ValueId),
	Undefined,
}

impl Value {
	pub fn ty(&self) -> Type {
		match self {
			Value::Bool(_) => Type::Bool,
			Value::Int4(_) => Type::Int4,
			Value::Int8(_) => Type::Int8,
			Value::Float4(_) => Type::Float4,
			Value::Float8(_) => Type::Float8,
			Value::Utf8(_) => Type::Utf8,
			Value::ValueId(_) => Type::ValueId,
			Value::Undefined => Type::Undefined,
		}
	}

	pub fn is_undefined(&self) -> bool {
		matches!(self, Value::Undefined)
	}

	/// Cast into another column type. Numeric values convert freely
	/// (narrowing goes through `as`, matching storage semantics); strings
	/// and booleans only cast to themselves. `Undefined` survives every
	/// cast unchanged.
	pub fn cast_to(&self, target: Type) -> crate::Result<Value> {
		if self.is_undefined() || self.ty() == target {
			return Ok(self.clone());
		}
		let out = match (self, target) {
			(Value::Int4(v), Type::Int8) => Value::Int8(*v as i64),
			(Value::Int4(v), Type::Float4) => Value::Float4(*v as f32),
			(Value::Int4(v), Type::Float8) => Value::Float8(*v as f64),
			(Value::Int8(v), Type::Int4) => Value::Int4(*v as i32),
			(Value::Int8(v), Type::Float4) => Value::Float4(*v as f32),
			(Value::Int8(v), Type::Float8) => Value::Float8(*v as f64),
			(Value::Float4(v), Type::Int4) => Value::Int4(*v as i32),
			(Value::Float4(v), Type::Int8) => Value::Int8(*v as i64),
			(Value::Float4(v), Type::Float8) => Value::Float8(*v as f64),
			(Value::Float8(v), Type::Int4) => Value::Int4(*v as i32),
			(Value::Float8(v), Type::Int8) => Value::Int8(*v as i64),
			(Value::Float8(v), Type::Float4) => Value::Float4(*v as f32),
			_ => return Err(TypeError::UnsupportedCast { from: self.ty(), to: target }),
		};
		Ok(out)
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Bool(v) => write!(f, "{v}"),
			Value::Int4(v) => write!(f, "{v}"),
			Value::Int8(v) => write!(f, "{v}"),
			Value::Float4(v) => write!(f, "{v}"),
			Value::Float8(v) => write!(f, "{v}"),
			Value::Utf8(v) => write!(f, "{v}"),
			Value::ValueId(v) => write!(f, "{v}"),
			Value::Undefined => f.write_str("undefined"),
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Int4(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int8(v)
	}
}

impl From<f32> for Value {
	fn from(v: f32) -> Self {
		Value::Float4(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float8(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Utf8(v.to_string())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Utf8(v)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn numeric_promotion_prefers_the_wider_type() {
		assert_eq!(Type::Int4.promote(Type::Int8), Some(Type::Int8));
		assert_eq!(Type::Int8.promote(Type::Float4), Some(Type::Float4));
		assert_eq!(Type::Float4.promote(Type::Float8), Some(Type::Float8));
		assert_eq!(Type::Int4.promote(Type::Int4), Some(Type::Int4));
		assert_eq!(Type::Utf8.promote(Type::Int4), None);
		assert_eq!(Type::Bool.promote(Type::Bool), None);
	}

	#[test]
	fn cast_between_numeric_types() {
		assert_eq!(Value::Int4(42).cast_to(Type::Int8).unwrap(), Value::Int8(42));
		assert_eq!(Value::Int8(7).cast_to(Type::Float8).unwrap(), Value::Float8(7.0));
		assert_eq!(Value::Float8(1.5).cast_to(Type::Int4).unwrap(), Value::Int4(1));
	}

	#[test]
	fn cast_to_same_type_is_identity() {
		let v = Value::Utf8("abc".into());
		assert_eq!(v.cast_to(Type::Utf8).unwrap(), v);
	}

	#[test]
	fn undefined_survives_casts() {
		assert_eq!(Value::Undefined.cast_to(Type::Int8).unwrap(), Value::Undefined);
	}

	#[test]
	fn string_to_number_cast_is_rejected() {
		let err = Value::Utf8("12".into()).cast_to(Type::Int4).unwrap_err();
		assert!(matches!(err, TypeError::UnsupportedCast { .. }));
	}
}
