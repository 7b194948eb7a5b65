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

mod arena;
mod view;

pub use view::{BookView, MarketDepth, PriceLevel};

use std::{
	cmp::{Ordering, Reverse},
	collections::{BTreeMap, HashMap},
	fmt,
	sync::Arc,
};

use aeromatch_sdk::types::{
	Order, OrderId, OrderStatus, OrderType, Side, Trade, unix_timestamp_nanos,
};
use tracing::debug;

use crate::{
	ids::{IdGenerator, SequentialIds},
	types::{MatchingError, SubmitReport},
};
use arena::{OrderArena, SlotId};

/// Totally ordered price used as a map key
///
/// Prices reaching the book have been validated as finite, so
/// `total_cmp` agrees with numeric order.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PriceKey(pub(crate) f64);

impl PartialEq for PriceKey {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for PriceKey {}

impl PartialOrd for PriceKey {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for PriceKey {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.total_cmp(&other.0)
	}
}

/// Remaining quantities at or below this are treated as fully filled
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Buy side key: price descending, then arrival ascending
type BidKey = (Reverse<PriceKey>, u64);
/// Sell side key: price ascending, then arrival ascending
type AskKey = (PriceKey, u64);

/// Limit order book for one instrument
///
/// The book is the unit of sequential consistency: every mutation goes
/// through `submit` or `cancel` and must come from a single writer (the
/// instrument's worker in the engine). Nothing inside is locked except the
/// shared [`BookView`], which readers use instead of the book itself.
///
/// Layout:
/// - Resting orders live in a slot arena
/// - Each side is a `BTreeMap` from (price, arrival) to slot, best first
/// - An id index maps order ids to slots for cancellation
pub struct OrderBook {
	instrument: String,
	orders: OrderArena,
	bids: BTreeMap<BidKey, SlotId>,
	asks: BTreeMap<AskKey, SlotId>,
	index: HashMap<OrderId, SlotId>,
	view: BookView,
	ids: Arc<dyn IdGenerator>,
	/// Last arrival sequence handed out
	sequence: u64,
}

impl OrderBook {
	/// Create a new order book with its own id generator
	pub fn new(instrument: impl Into<String>) -> Self {
		Self::with_id_generator(instrument, Arc::new(SequentialIds::new()))
	}

	pub fn with_id_generator(instrument: impl Into<String>, ids: Arc<dyn IdGenerator>) -> Self {
		let instrument = instrument.into();
		Self {
			view: BookView::new(&instrument),
			instrument,
			orders: OrderArena::new(),
			bids: BTreeMap::new(),
			asks: BTreeMap::new(),
			index: HashMap::new(),
			ids,
			sequence: 0,
		}
	}

	/// Get the instrument identifier
	pub fn instrument(&self) -> &str {
		&self.instrument
	}

	/// Shared read-only view of this book's levels
	pub fn view(&self) -> BookView {
		self.view.clone()
	}

	/// Replace the id source, e.g. with the engine-wide one on registration
	pub(crate) fn set_id_generator(&mut self, ids: Arc<dyn IdGenerator>) {
		self.ids = ids;
	}

	/// Match an incoming order against the book
	///
	/// Applies price-time priority: the best opposite price fills first,
	/// earliest arrival first within a price, always at the maker's price.
	/// Afterwards the taker's remainder rests or is cancelled according to
	/// its type. Rejections leave the book untouched.
	pub fn submit(&mut self, mut order: Order) -> Result<SubmitReport, MatchingError> {
		if order.instrument != self.instrument {
			return Err(MatchingError::InstrumentMismatch {
				expected: self.instrument.clone(),
				actual: order.instrument,
			});
		}
		order.validate()?;
		if self.index.contains_key(&order.id) {
			return Err(MatchingError::DuplicateOrderId {
				instrument: self.instrument.clone(),
				order_id: order.id,
			});
		}

		order.remaining = order.quantity;
		order.status = OrderStatus::New;

		match order.order_type {
			OrderType::PostOnly => {
				if let Some(best) = self.best_price(order.side.opposite())
					&& order.crosses(best)
				{
					return Err(MatchingError::PostOnlyWouldCross {
						order_id: order.id,
						price: order.price,
						best,
					});
				}
			}
			OrderType::Fok => {
				// Feasibility is checked before any fill so a kill leaves no trace.
				let available = self.crossable_quantity(&order);
				if available < order.remaining - QUANTITY_EPSILON {
					return Err(MatchingError::FokInfeasible {
						order_id: order.id,
						requested: order.remaining,
						available,
					});
				}
			}
			_ => {}
		}

		self.sequence += 1;
		order.sequence = self.sequence;

		let trades = self.match_order(&mut order);
		let traded = !trades.is_empty();
		let mut resting = false;
		let mut cancelled_quantity = 0.0;

		if order.remaining <= 0.0 {
			order.remaining = 0.0;
			order.status = OrderStatus::Filled;
		} else if order.order_type.rests() {
			order.status = if traded {
				OrderStatus::Partial
			} else {
				OrderStatus::New
			};
			self.insert_resting(order.clone());
			resting = true;
		} else {
			cancelled_quantity = order.remaining;
			order.status = if traded {
				OrderStatus::Partial
			} else {
				OrderStatus::Cancelled
			};
		}

		debug!(
			target: "book",
			instrument = %self.instrument,
			order_id = order.id,
			order_type = ?order.order_type,
			side = ?order.side,
			trades = trades.len(),
			status = ?order.status,
			resting,
			"Order processed"
		);

		Ok(SubmitReport {
			order,
			trades,
			resting,
			cancelled_quantity,
		})
	}

	/// Remove a resting order from the book
	pub fn cancel(&mut self, order_id: OrderId) -> Result<Order, MatchingError> {
		let mut order = self
			.index
			.get(&order_id)
			.copied()
			.and_then(|slot| self.unlink(slot))
			.ok_or_else(|| MatchingError::OrderNotFound {
				instrument: self.instrument.clone(),
				order_id,
			})?;

		self.view
			.reduce(order.side, order.price, order.remaining, true);
		order.status = OrderStatus::Cancelled;

		debug!(
			target: "book",
			instrument = %self.instrument,
			order_id,
			remaining = order.remaining,
			"Order cancelled"
		);

		Ok(order)
	}

	/// Look up a resting order
	pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
		self.index
			.get(&order_id)
			.and_then(|slot| self.orders.get(*slot))
	}

	/// Get the best bid price
	pub fn best_bid(&self) -> Option<f64> {
		self.bids.keys().next().map(|(price, _)| price.0.0)
	}

	/// Get the best ask price
	pub fn best_ask(&self) -> Option<f64> {
		self.asks.keys().next().map(|(price, _)| price.0)
	}

	/// Number of resting orders at exactly `price`
	pub fn depth(&self, price: f64) -> usize {
		self.view.depth(price)
	}

	/// Aggregate resting quantity at exactly `price`
	pub fn total_volume(&self, price: f64) -> f64 {
		self.view.total_volume(price)
	}

	/// Top `levels` aggregated price levels per side
	pub fn market_depth(&self, levels: usize) -> MarketDepth {
		self.view.market_depth(levels)
	}

	/// Get total number of orders in the book
	pub fn order_count(&self) -> usize {
		self.orders.len()
	}

	pub fn bid_count(&self) -> usize {
		self.bids.len()
	}

	pub fn ask_count(&self) -> usize {
		self.asks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.len() == 0
	}

	fn best_price(&self, side: Side) -> Option<f64> {
		match side {
			Side::Buy => self.best_bid(),
			Side::Sell => self.best_ask(),
		}
	}

	/// Slots of one side in priority order
	fn priority_slots(&self, side: Side) -> impl Iterator<Item = SlotId> + '_ {
		let (bids, asks) = match side {
			Side::Buy => (Some(self.bids.values()), None),
			Side::Sell => (None, Some(self.asks.values())),
		};
		bids.into_iter()
			.flatten()
			.chain(asks.into_iter().flatten())
			.copied()
	}

	/// Opposite-side quantity the taker could trade right now
	///
	/// Stops scanning once the taker's remaining quantity is covered.
	fn crossable_quantity(&self, taker: &Order) -> f64 {
		let mut available = 0.0;
		for slot in self.priority_slots(taker.side.opposite()) {
			let Some(maker) = self.orders.get(slot) else {
				continue;
			};
			if !taker.crosses(maker.price) {
				break;
			}
			available += maker.remaining;
			if available >= taker.remaining - QUANTITY_EPSILON {
				break;
			}
		}
		available
	}

	fn match_order(&mut self, taker: &mut Order) -> Vec<Trade> {
		let maker_side = taker.side.opposite();
		let mut trades = Vec::new();

		while taker.remaining > 0.0 {
			let Some(slot) = self.priority_slots(maker_side).next() else {
				break;
			};
			let Some(maker) = self.orders.get_mut(slot) else {
				break;
			};
			if !taker.crosses(maker.price) {
				break;
			}

			let fill = taker.remaining.min(maker.remaining);
			let before = maker.remaining;
			maker.remaining -= fill;
			let maker_done = maker.remaining <= QUANTITY_EPSILON;
			if maker_done {
				maker.remaining = 0.0;
				maker.status = OrderStatus::Filled;
			} else {
				maker.status = OrderStatus::Partial;
			}
			let (price, maker_id) = (maker.price, maker.id);

			taker.remaining -= fill;
			if taker.remaining <= QUANTITY_EPSILON {
				taker.remaining = 0.0;
			}
			// A filled maker takes its dust out of the level too.
			let reduced = if maker_done { before } else { fill };
			self.view.reduce(maker_side, price, reduced, maker_done);
			if maker_done {
				self.unlink(slot);
			}

			trades.push(self.create_trade(maker_id, taker, price, fill));

			if taker.order_type == OrderType::Ioc && taker.remaining > 0.0 {
				break;
			}
		}

		trades
	}

	fn create_trade(&self, maker_id: OrderId, taker: &Order, price: f64, quantity: f64) -> Trade {
		Trade {
			trade_id: self.ids.next_trade_id(),
			execution_id: self.ids.next_execution_id(),
			instrument: self.instrument.clone(),
			price,
			quantity,
			side: taker.side,
			timestamp: unix_timestamp_nanos(),
			maker_order_id: maker_id,
			taker_order_id: taker.id,
		}
	}

	fn insert_resting(&mut self, order: Order) {
		let (id, side, price, sequence, remaining) = (
			order.id,
			order.side,
			order.price,
			order.sequence,
			order.remaining,
		);
		let slot = self.orders.insert(order);
		match side {
			Side::Buy => {
				self.bids.insert((Reverse(PriceKey(price)), sequence), slot);
			}
			Side::Sell => {
				self.asks.insert((PriceKey(price), sequence), slot);
			}
		}
		self.index.insert(id, slot);
		self.view.add(side, price, remaining);
	}

	/// Detach an order from every index; the view is left to the caller
	fn unlink(&mut self, slot: SlotId) -> Option<Order> {
		let order = self.orders.remove(slot)?;
		match order.side {
			Side::Buy => {
				self.bids
					.remove(&(Reverse(PriceKey(order.price)), order.sequence));
			}
			Side::Sell => {
				self.asks.remove(&(PriceKey(order.price), order.sequence));
			}
		}
		self.index.remove(&order.id);
		Some(order)
	}
}

impl fmt::Debug for OrderBook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OrderBook")
			.field("instrument", &self.instrument)
			.field("bids", &self.bids.len())
			.field("asks", &self.asks.len())
			.field("sequence", &self.sequence)
			.finish()
	}
}
