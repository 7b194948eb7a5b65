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

use std::{
	cmp::Reverse,
	collections::BTreeMap,
	sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use aeromatch_sdk::types::Side;
use serde::{Deserialize, Serialize};

use super::PriceKey;

/// Aggregated resting interest at one price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
	pub price: f64,
	/// Sum of remaining quantity of all orders at this price
	pub quantity: f64,
	pub order_count: usize,
}

/// Top price levels of both sides, best price first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketDepth {
	pub bids: Vec<PriceLevel>,
	pub asks: Vec<PriceLevel>,
}

#[derive(Debug, Clone, Copy, Default)]
struct LevelTotals {
	quantity: f64,
	order_count: usize,
}

#[derive(Debug, Default)]
struct Ladder {
	/// Buy side: price (high to low) -> totals
	bids: BTreeMap<Reverse<PriceKey>, LevelTotals>,
	/// Sell side: price (low to high) -> totals
	asks: BTreeMap<PriceKey, LevelTotals>,
}

impl Ladder {
	fn level_mut(&mut self, side: Side, price: f64) -> &mut LevelTotals {
		match side {
			Side::Buy => self.bids.entry(Reverse(PriceKey(price))).or_default(),
			Side::Sell => self.asks.entry(PriceKey(price)).or_default(),
		}
	}

	fn remove_level(&mut self, side: Side, price: f64) {
		match side {
			Side::Buy => self.bids.remove(&Reverse(PriceKey(price))),
			Side::Sell => self.asks.remove(&PriceKey(price)),
		};
	}

	fn level(&self, price: f64) -> LevelTotals {
		let bid = self.bids.get(&Reverse(PriceKey(price))).copied();
		let ask = self.asks.get(&PriceKey(price)).copied();
		let mut totals = LevelTotals::default();
		for level in bid.into_iter().chain(ask) {
			totals.quantity += level.quantity;
			totals.order_count += level.order_count;
		}
		totals
	}
}

/// Read-only, shareable view of one book's price levels
///
/// The book's single writer keeps the view in step with its resting orders
/// (one short write per insertion, fill, or cancel). Readers such as the
/// snapshot manager query it from any thread without going through the
/// book's ingress queue, so a busy book never stalls them and they never
/// stall matching. A reader may observe state that lags by one fill.
#[derive(Debug, Clone)]
pub struct BookView {
	instrument: Arc<str>,
	ladder: Arc<RwLock<Ladder>>,
}

impl BookView {
	pub(crate) fn new(instrument: &str) -> Self {
		Self {
			instrument: Arc::from(instrument),
			ladder: Arc::new(RwLock::new(Ladder::default())),
		}
	}

	pub fn instrument(&self) -> &str {
		&self.instrument
	}

	/// Highest resting bid price
	pub fn best_bid(&self) -> Option<f64> {
		self.read().bids.keys().next().map(|key| key.0.0)
	}

	/// Lowest resting ask price
	pub fn best_ask(&self) -> Option<f64> {
		self.read().asks.keys().next().map(|key| key.0)
	}

	/// Number of resting orders at exactly `price`
	pub fn depth(&self, price: f64) -> usize {
		self.read().level(price).order_count
	}

	/// Aggregate resting quantity at exactly `price`
	pub fn total_volume(&self, price: f64) -> f64 {
		self.read().level(price).quantity
	}

	/// Up to `levels` aggregated price levels per side, best first
	pub fn market_depth(&self, levels: usize) -> MarketDepth {
		let ladder = self.read();
		MarketDepth {
			bids: ladder
				.bids
				.iter()
				.take(levels)
				.map(|(key, totals)| to_level(key.0.0, totals))
				.collect(),
			asks: ladder
				.asks
				.iter()
				.take(levels)
				.map(|(key, totals)| to_level(key.0, totals))
				.collect(),
		}
	}

	/// Number of distinct price levels on a side
	pub fn level_count(&self, side: Side) -> usize {
		let ladder = self.read();
		match side {
			Side::Buy => ladder.bids.len(),
			Side::Sell => ladder.asks.len(),
		}
	}

	/// Record a newly resting order
	pub(crate) fn add(&self, side: Side, price: f64, quantity: f64) {
		let mut ladder = self.write();
		let level = ladder.level_mut(side, price);
		level.quantity += quantity;
		level.order_count += 1;
	}

	/// Record a fill or removal against a resting order
	///
	/// `order_removed` is set when the order left the book (fully filled or
	/// cancelled); the level disappears with its last order.
	pub(crate) fn reduce(&self, side: Side, price: f64, quantity: f64, order_removed: bool) {
		let mut ladder = self.write();
		let level = ladder.level_mut(side, price);
		level.quantity -= quantity;
		if order_removed {
			level.order_count = level.order_count.saturating_sub(1);
		}
		if level.order_count == 0 {
			ladder.remove_level(side, price);
		}
	}

	// Every write leaves the ladder consistent, so a poisoned lock is still safe to read.
	fn read(&self) -> RwLockReadGuard<'_, Ladder> {
		self.ladder.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write(&self) -> RwLockWriteGuard<'_, Ladder> {
		self.ladder.write().unwrap_or_else(PoisonError::into_inner)
	}
}

fn to_level(price: f64, totals: &LevelTotals) -> PriceLevel {
	PriceLevel {
		price,
		quantity: totals.quantity,
		order_count: totals.order_count,
	}
}
