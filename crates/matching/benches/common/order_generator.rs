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

use aeromatch_sdk::types::{Order, Side};

pub const INSTRUMENT: &str = "BTC-USD";

#[derive(Clone, Copy)]
pub enum Scenario {
	/// Two separated bands, nothing ever trades
	NoCross,
	/// Alternating sides at one price, almost every order trades
	CrossHeavy,
	/// Many resting makers with an occasional market order sweeping levels
	DeepBook,
}

pub struct OrderGenerator {
	next_id: u64,
	counter: u64,
	scenario: Scenario,
}

impl OrderGenerator {
	/// Ids are drawn from a per-generator range so producers never collide
	pub fn new(thread_id: usize, scenario: Scenario) -> Self {
		Self {
			next_id: (thread_id as u64 + 1) << 40,
			counter: 0,
			scenario,
		}
	}

	pub fn next_order(&mut self) -> Order {
		self.counter += 1;
		self.next_id += 1;
		let id = self.next_id;
		let side = if self.counter.is_multiple_of(2) {
			Side::Buy
		} else {
			Side::Sell
		};

		match self.scenario {
			Scenario::NoCross => {
				let offset = (self.counter % 1_000) as f64 * 0.5;
				let price = match side {
					Side::Buy => 44_000.0 + offset,
					Side::Sell => 56_000.0 + offset,
				};
				Order::limit(id, INSTRUMENT, side, price, 1.0)
			}
			Scenario::CrossHeavy => Order::limit(id, INSTRUMENT, side, 50_000.0, 10.0),
			Scenario::DeepBook => {
				if self.counter.is_multiple_of(100) {
					// Sweeps across many levels; the unfilled rest is cancelled.
					Order::market(id, INSTRUMENT, side, 50_000.0)
				} else {
					let level = (self.counter % 1_000) as f64;
					let price = match side {
						Side::Buy => 49_999.0 - level,
						Side::Sell => 50_001.0 + level,
					};
					Order::limit(id, INSTRUMENT, side, price, 1_000.0)
				}
			}
		}
	}

	/// Two-sided resting depth around 50 000 that never crosses itself
	pub fn warmup_orders(&self, count: usize) -> Vec<Order> {
		(0..count as u64)
			.map(|i| {
				let side = if i.is_multiple_of(2) { Side::Buy } else { Side::Sell };
				let level = ((i / 2) % 1_000) as f64;
				let price = match side {
					Side::Buy => 49_999.0 - level,
					Side::Sell => 50_001.0 + level,
				};
				Order::limit(i + 1, INSTRUMENT, side, price, 1_000.0)
			})
			.collect()
	}
}
