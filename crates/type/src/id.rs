// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::TypeError;

/// Index of a horizontal table partition. Chunks are the unit of MVCC
/// bookkeeping and of fused-pipeline iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

impl Display for ChunkId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Chunk#{}", self.0)
	}
}

/// Row offset within a chunk.
pub type ChunkOffset = u32;

/// Position of a column within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u16);

impl ColumnId {
	pub fn as_usize(&self) -> usize {
		self.0 as usize
	}
}

impl Display for ColumnId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Column#{}", self.0)
	}
}

/// Integer code indexing a dictionary segment's sorted dictionary.
///
/// `INVALID` doubles as the not-found sentinel of dictionary lookups and
/// as the null encoding inside attribute vectors. `MAX_ENCODABLE` is the
/// largest id a tuple slot carries: real codes stay strictly below it,
/// and the per-chunk rewrite substitutes it for literals missing from
/// the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl ValueId {
	pub const INVALID: ValueId = ValueId(u32::MAX);
	pub const MAX_ENCODABLE: ValueId = ValueId(u32::MAX - 1);

	/// The code of the dictionary entry at `index`. Fails when the index
	/// does not fit below the not-found substitute, which caps how many
	/// distinct values one dictionary may encode.
	pub fn from_index(index: usize) -> crate::Result<ValueId> {
		if index >= Self::MAX_ENCODABLE.0 as usize {
			return Err(TypeError::ValueIdCapacityExceeded {
				value: index as u64,
				max: Self::MAX_ENCODABLE.0,
			});
		}
		Ok(ValueId(index as u32))
	}

	pub fn is_invalid(&self) -> bool {
		*self == Self::INVALID
	}
}

impl Display for ValueId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if self.is_invalid() {
			f.write_str("ValueId(invalid)")
		} else {
			write!(f, "ValueId({})", self.0)
		}
	}
}

/// Identifier of a running transaction. `TransactionId(0)` means "no
/// transaction owns this row".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl TransactionId {
	pub const NONE: TransactionId = TransactionId(0);
}

impl Display for TransactionId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Tx#{}", self.0)
	}
}

/// Commit timestamp. `CommitId::MAX` marks a row version that has not
/// been committed (for `begin`) or not been deleted (for `end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommitId(pub u64);

impl CommitId {
	pub const MAX: CommitId = CommitId(u64::MAX);
}

impl Display for CommitId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if *self == Self::MAX {
			f.write_str("Cid(max)")
		} else {
			write!(f, "Cid({})", self.0)
		}
	}
}

/// Identifier of a prepared-statement placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParameterId(pub u16);

impl Display for ParameterId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "Par#{}", self.0)
	}
}

/// Fully qualified row position: chunk plus offset within the chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId {
	pub chunk_id: ChunkId,
	pub chunk_offset: ChunkOffset,
}

impl RowId {
	pub fn new(chunk_id: ChunkId, chunk_offset: ChunkOffset) -> Self {
		Self { chunk_id, chunk_offset }
	}
}

impl Display for RowId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.chunk_id, self.chunk_offset)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn value_ids_fit_below_the_not_found_substitute() {
		assert_eq!(ValueId::from_index(3).unwrap(), ValueId(3));
		let err = ValueId::from_index(ValueId::MAX_ENCODABLE.0 as usize).unwrap_err();
		assert!(matches!(err, TypeError::ValueIdCapacityExceeded { max, .. } if max == ValueId::MAX_ENCODABLE.0));
	}
}
