// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::sync::atomic::{AtomicU64, Ordering};

use forgedb_type::{CommitId, TransactionId};

/// Per-chunk MVCC bookkeeping: one begin/end commit id and one owning
/// transaction id per row. The transaction ids are written concurrently
/// by writers claiming rows, so they are atomic; begin/end commit ids are
/// only written under the chunk's MVCC lock.
#[derive(Debug)]
pub struct MvccColumns {
	begin_cids: Vec<CommitId>,
	end_cids: Vec<CommitId>,
	tids: Vec<AtomicU64>,
}

impl MvccColumns {
	/// Fresh bookkeeping for `len` committed-from-the-start rows.
	pub fn new(len: usize) -> Self {
		Self {
			begin_cids: vec![CommitId(0); len],
			end_cids: vec![CommitId::MAX; len],
			tids: (0..len).map(|_| AtomicU64::new(TransactionId::NONE.0)).collect(),
		}
	}

	pub fn len(&self) -> usize {
		self.begin_cids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.begin_cids.is_empty()
	}

	pub fn begin_cid(&self, offset: usize) -> CommitId {
		self.begin_cids[offset]
	}

	pub fn end_cid(&self, offset: usize) -> CommitId {
		self.end_cids[offset]
	}

	pub fn tid(&self, offset: usize) -> TransactionId {
		TransactionId(self.tids[offset].load(Ordering::Acquire))
	}

	pub fn set_begin_cid(&mut self, offset: usize, cid: CommitId) {
		self.begin_cids[offset] = cid;
	}

	pub fn set_end_cid(&mut self, offset: usize, cid: CommitId) {
		self.end_cids[offset] = cid;
	}

	pub fn set_tid(&self, offset: usize, tid: TransactionId) {
		self.tids[offset].store(tid.0, Ordering::Release);
	}

	/// Copy the atomic transaction ids into a plain vector, so a hot loop
	/// that cannot tolerate atomics reads the snapshot instead.
	pub fn materialize_tids(&self, out: &mut Vec<TransactionId>) {
		out.clear();
		out.extend(self.tids.iter().map(|tid| TransactionId(tid.load(Ordering::Acquire))));
	}
}
