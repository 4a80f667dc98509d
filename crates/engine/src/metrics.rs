// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::time::Duration;

use crate::operators::OperatorKind;

/// Wall-clock accounting for one execution of a fused chain, returned
/// alongside the output table.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
	pub before_query: Duration,
	pub before_chunk: Duration,
	/// Time spent inside the per-tuple loop, specialized or interpreted.
	pub function: Duration,
	pub after_chunk: Duration,
	pub after_query: Duration,
	/// Inclusive per-operator time, only collected when
	/// `ExecutionConfig::measure` is set.
	operator_times: [Duration; OperatorKind::COUNT],
}

impl Metrics {
	pub fn operator_time(&self, kind: OperatorKind) -> Duration {
		self.operator_times[kind as usize]
	}

	pub(crate) fn add_operator_time(&mut self, kind: OperatorKind, elapsed: Duration) {
		self.operator_times[kind as usize] += elapsed;
	}
}
