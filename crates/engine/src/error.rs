// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_storage::StorageError;
use forgedb_type::{ParameterId, TypeError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
	#[error("LIMIT row count must not be null")]
	LimitRowCountNull,

	#[error("cannot LIMIT to a negative number of rows ({rows})")]
	LimitRowCountNegative {
		rows: i64,
	},

	#[error("COUNT(DISTINCT) is not supported by the fused aggregate")]
	CountDistinctUnsupported,

	#[error("no value bound for prepared-statement placeholder {parameter}")]
	UnboundParameter {
		parameter: ParameterId,
	},

	#[error("prepared-statement placeholder {parameter} has no known type")]
	UnknownParameterType {
		parameter: ParameterId,
	},

	#[error("dictionary with {unique_values} entries exceeds the value id domain")]
	ValueIdOverflow {
		unique_values: usize,
	},

	#[error("plan invariant violated: {reason}")]
	InvalidPlan {
		reason: String,
	},

	#[error("mvcc structure violated: {reason}")]
	Mvcc {
		reason: String,
	},

	#[error(transparent)]
	Storage(#[from] StorageError),

	#[error(transparent)]
	Type(#[from] TypeError),
}

impl EngineError {
	pub(crate) fn invalid_plan(reason: impl Into<String>) -> Self {
		EngineError::InvalidPlan { reason: reason.into() }
	}

	pub(crate) fn mvcc(reason: impl Into<String>) -> Self {
		EngineError::Mvcc { reason: reason.into() }
	}
}
