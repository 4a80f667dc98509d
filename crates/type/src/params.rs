// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ForgeDB

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{ParameterId, Value};

/// Values bound to prepared-statement placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params(HashMap<ParameterId, Value>);

impl Params {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn bind(mut self, id: ParameterId, value: impl Into<Value>) -> Self {
		self.0.insert(id, value.into());
		self
	}

	pub fn get(&self, id: ParameterId) -> Option<&Value> {
		self.0.get(&id)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromIterator<(ParameterId, Value)> for Params {
	fn from_iter<I: IntoIterator<Item = (ParameterId, Value)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}
