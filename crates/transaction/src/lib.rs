// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

//! The read-side view of a transaction that the execution core consumes:
//! the executing transaction's id, its snapshot, and an aborted flag.
//! Transaction lifecycle management itself lives outside the core.

use std::sync::atomic::{AtomicBool, Ordering};

use forgedb_type::{CommitId, TransactionId};
use tracing::trace;

#[derive(Debug)]
pub struct TransactionContext {
	tid: TransactionId,
	snapshot_cid: CommitId,
	aborted: AtomicBool,
}

impl TransactionContext {
	pub fn new(tid: TransactionId, snapshot_cid: CommitId) -> Self {
		Self { tid, snapshot_cid, aborted: AtomicBool::new(false) }
	}

	/// The id rows inserted or deleted by this transaction carry.
	pub fn own_tid(&self) -> TransactionId {
		self.tid
	}

	/// The newest commit visible to this transaction.
	pub fn snapshot_cid(&self) -> CommitId {
		self.snapshot_cid
	}

	pub fn is_aborted(&self) -> bool {
		self.aborted.load(Ordering::Acquire)
	}

	pub fn abort(&self) {
		self.aborted.store(true, Ordering::Release);
	}

	pub fn on_operator_started(&self, description: &str) {
		trace!(tid = self.tid.0, operator = description, "operator started");
	}

	pub fn on_operator_finished(&self, description: &str) {
		trace!(tid = self.tid.0, operator = description, "operator finished");
	}
}
