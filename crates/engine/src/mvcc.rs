// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use forgedb_type::{CommitId, TransactionId};

/// Whether one row version is visible to a transaction.
///
/// A row is visible when its insert is covered by the snapshot or is the
/// executing transaction's own (still uncommitted, or committed after
/// the snapshot) insert, and it is hidden again by the transaction's own
/// delete or by a delete that committed within the snapshot.
pub fn is_row_visible(
	own_tid: TransactionId,
	snapshot_cid: CommitId,
	begin_cid: CommitId,
	end_cid: CommitId,
	row_tid: TransactionId,
) -> bool {
	let own_insert = row_tid == own_tid && (begin_cid > snapshot_cid || begin_cid == CommitId::MAX);
	let own_delete = row_tid == own_tid && end_cid != CommitId::MAX;
	let others_delete = row_tid != own_tid && end_cid != CommitId::MAX && end_cid <= snapshot_cid;

	(begin_cid <= snapshot_cid || own_insert) && !own_delete && !others_delete
}

#[cfg(test)]
mod tests {
	use super::*;

	const OWN: TransactionId = TransactionId(5);
	const SNAPSHOT: CommitId = CommitId(3);

	fn visible(begin: CommitId, end: CommitId, tid: u64) -> bool {
		is_row_visible(OWN, SNAPSHOT, begin, end, TransactionId(tid))
	}

	#[test]
	fn committed_delete_within_snapshot_hides_the_row() {
		assert!(!visible(CommitId(1), CommitId(2), 0));
	}

	#[test]
	fn committed_insert_is_visible() {
		assert!(visible(CommitId(1), CommitId::MAX, 0));
	}

	#[test]
	fn insert_committed_after_the_snapshot_is_hidden() {
		assert!(!visible(CommitId(10), CommitId::MAX, 0));
	}

	#[test]
	fn pending_insert_of_another_transaction_is_hidden() {
		assert!(!visible(CommitId(4), CommitId::MAX, 4));
	}

	#[test]
	fn own_insert_is_visible() {
		assert!(visible(CommitId(5), CommitId::MAX, 5));
		assert!(visible(CommitId::MAX, CommitId::MAX, 5));
	}

	#[test]
	fn own_delete_hides_the_row() {
		assert!(!visible(CommitId(3), CommitId(5), 5));
	}

	#[test]
	fn uncommitted_delete_of_another_transaction_keeps_the_row() {
		assert!(visible(CommitId(1), CommitId(4), 4));
	}

	#[test]
	fn delete_committed_after_the_snapshot_keeps_the_row() {
		assert!(visible(CommitId(1), CommitId(9), 0));
	}
}
