// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use serde::{Deserialize, Serialize};

/// Immutable execution knobs, passed to the translator and the operator
/// wrapper at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
	/// Enable the jit-aware translator. When false, `translate_node`
	/// always reports "not jittable".
	pub jit: bool,
	/// Treat validate nodes as jittable.
	pub jit_validate: bool,
	/// Allow union nodes to be fused into a disjunctive filter.
	pub jit_predicate: bool,
	/// Load input columns as late as possible, embedding single-consumer
	/// loads into the consuming compute or filter.
	pub lazy_load: bool,
	/// Skip specialization and always run the interpreted hot loop.
	pub interpret: bool,
	/// Read row transaction ids through atomics. When false, the ids are
	/// materialized into a plain vector once per chunk.
	pub use_load_atomic: bool,
	/// Collect per-operator timing counters into the execution metrics.
	pub measure: bool,
}

impl Default for ExecutionConfig {
	fn default() -> Self {
		Self {
			jit: false,
			jit_validate: true,
			jit_predicate: true,
			lazy_load: true,
			interpret: false,
			use_load_atomic: true,
			measure: false,
		}
	}
}
