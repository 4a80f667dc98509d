// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::{
	OnceLock,
	atomic::{AtomicUsize, Ordering},
};

use parking_lot::{Mutex, RwLock};

use crate::{context::RuntimeContext, operators::OperatorChain};

/// Entry point of a fused chain's per-tuple loop: either the generic
/// interpreted source loop, or a specialized version of it with the
/// chain burned in as a compile-time constant.
pub type ExecuteFn = fn(&OperatorChain, &mut RuntimeContext) -> crate::Result<()>;

/// Symbol the code-generation service specializes.
pub const READ_TUPLES_ENTRY: &str = "forgedb_engine::operators::read_tuples::ReadTuples::execute";

/// Black-box code-generation service: given the entry symbol and the
/// chain as a fixed root object, return an equivalent function with the
/// constant folded in. `None` means specialization failed; the caller
/// silently falls back to interpretation.
pub trait CodeGenerator: Send + Sync {
	fn specialize(&self, entry_symbol: &str, chain: &OperatorChain, passes: usize) -> Option<ExecuteFn>;
}

/// The in-process provider: "specializes" by handing back the generic
/// entry function, which is trivially equivalent.
#[derive(Debug, Default)]
pub struct InterpretingCodeGenerator;

impl CodeGenerator for InterpretingCodeGenerator {
	fn specialize(&self, _entry_symbol: &str, _chain: &OperatorChain, _passes: usize) -> Option<ExecuteFn> {
		Some(interpreted_entry)
	}
}

pub(crate) fn interpreted_entry(chain: &OperatorChain, ctx: &mut RuntimeContext) -> crate::Result<()> {
	chain.execute(ctx)
}

/// The chain and its chosen execute function, shared between deep copies
/// of the wrapper so concurrent first executions specialize only once
/// and later copies reuse the cached function pointer.
pub(crate) struct SpecializedFunction {
	pub(crate) chain: RwLock<OperatorChain>,
	pub(crate) prepare_lock: Mutex<()>,
	pub(crate) function: OnceLock<ExecuteFn>,
	pub(crate) passes: AtomicUsize,
}

impl SpecializedFunction {
	pub(crate) fn new(chain: OperatorChain) -> Self {
		Self {
			chain: RwLock::new(chain),
			prepare_lock: Mutex::new(()),
			function: OnceLock::new(),
			passes: AtomicUsize::new(0),
		}
	}

	pub(crate) fn record_passes(&self, passes: usize) {
		self.passes.store(passes, Ordering::Release);
	}

	pub(crate) fn passes(&self) -> usize {
		self.passes.load(Ordering::Acquire)
	}
}
