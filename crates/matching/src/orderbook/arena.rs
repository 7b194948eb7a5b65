// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use aeromatch_sdk::types::Order;

/// Index of an order slot inside the arena
pub(crate) type SlotId = usize;

/// Slot arena holding every resting order of one book
///
/// Side indexes refer to orders by slot id instead of owning them, so an
/// order can be unlinked from the middle of a side without shifting its
/// neighbours. Freed slots are recycled.
#[derive(Debug, Default)]
pub(crate) struct OrderArena {
	slots: Vec<Option<Order>>,
	free: Vec<SlotId>,
	len: usize,
}

impl OrderArena {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn insert(&mut self, order: Order) -> SlotId {
		self.len += 1;
		match self.free.pop() {
			Some(slot) => {
				self.slots[slot] = Some(order);
				slot
			}
			None => {
				self.slots.push(Some(order));
				self.slots.len() - 1
			}
		}
	}

	pub(crate) fn get(&self, slot: SlotId) -> Option<&Order> {
		self.slots.get(slot).and_then(Option::as_ref)
	}

	pub(crate) fn get_mut(&mut self, slot: SlotId) -> Option<&mut Order> {
		self.slots.get_mut(slot).and_then(Option::as_mut)
	}

	pub(crate) fn remove(&mut self, slot: SlotId) -> Option<Order> {
		let order = self.slots.get_mut(slot)?.take()?;
		self.free.push(slot);
		self.len -= 1;
		Some(order)
	}

	pub(crate) fn len(&self) -> usize {
		self.len
	}
}
