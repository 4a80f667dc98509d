// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use crate::value::Type;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TypeError {
	#[error("cannot cast {from} to {to}")]
	UnsupportedCast {
		from: Type,
		to: Type,
	},

	#[error("value id {value} exceeds the encodable maximum of {max}")]
	ValueIdCapacityExceeded {
		value: u64,
		max: u32,
	},
}
