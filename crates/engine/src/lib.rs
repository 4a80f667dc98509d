// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! The JIT-aware query execution core: translates a contiguous jittable
//! subtree of a logical plan into a fused tuple-at-a-time operator chain
//! and executes it, interpreted or specialized at prepare time.
//!
//! Entry points: [`JitAwareTranslator::translate_node`] to fuse a plan,
//! [`JitOperatorWrapper::execute`] to run the fused chain over a table.

pub mod config;
pub mod context;
pub mod error;
pub mod expression;
pub mod metrics;
pub mod mvcc;
pub mod operators;
pub mod reader;
pub mod specialize;
pub mod test_utils;
pub mod translate;
pub mod tuple;
pub mod wrapper;

pub use config::ExecutionConfig;
pub use error::EngineError;
pub use metrics::Metrics;
pub use specialize::{CodeGenerator, ExecuteFn, InterpretingCodeGenerator};
pub use translate::JitAwareTranslator;
pub use wrapper::{ExecutionOutput, JitOperatorWrapper};

pub type Result<T> = std::result::Result<T, EngineError>;
