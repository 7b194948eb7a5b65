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

mod manager;
mod storage;

pub use manager::{SnapshotConfig, SnapshotManager};
pub use storage::{MemorySnapshotStorage, SnapshotMetadata, SnapshotStorage, StoredSnapshot};

use aeromatch_sdk::types::{Side, unix_timestamp_nanos};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orderbook::{BookView, PriceLevel};

/// Error types for snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("Failed to encode snapshot: {0}")]
	Encode(String),
	#[error("Failed to decode snapshot: {0}")]
	Decode(String),
	#[error("No snapshot available for instrument: {0}")]
	NotFound(String),
	#[error("Snapshot storage failure: {0}")]
	Storage(String),
	#[error("Failed to start snapshot timer: {0}")]
	Timer(String),
}

/// Point-in-time depth and statistics of one book
///
/// Immutable once published. The next cycle supersedes it with a new
/// snapshot carrying a higher `sequence`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
	pub instrument: String,
	/// Drawn from one counter shared by all instruments
	pub sequence: u64,
	/// Capture time, nanoseconds since the unix epoch
	pub timestamp: u64,
	/// Best (highest) price first
	pub bids: Vec<PriceLevel>,
	/// Best (lowest) price first
	pub asks: Vec<PriceLevel>,
	pub stats: SnapshotStats,
}

/// Statistics over the published levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStats {
	pub total_bid_quantity: f64,
	pub total_ask_quantity: f64,
	pub bid_orders: usize,
	pub ask_orders: usize,
	/// Best ask minus best bid; absent unless both sides have levels
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub spread: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mid_price: Option<f64>,
}

impl SnapshotStats {
	pub fn from_levels(bids: &[PriceLevel], asks: &[PriceLevel]) -> Self {
		let mut stats = SnapshotStats::default();
		for level in bids {
			stats.total_bid_quantity += level.quantity;
			stats.bid_orders += level.order_count;
		}
		for level in asks {
			stats.total_ask_quantity += level.quantity;
			stats.ask_orders += level.order_count;
		}
		if let (Some(bid), Some(ask)) = (bids.first(), asks.first()) {
			stats.spread = Some(ask.price - bid.price);
			stats.mid_price = Some((bid.price + ask.price) / 2.0);
		}
		stats
	}
}

impl OrderBookSnapshot {
	/// Capture the top `levels` of a book view
	pub fn capture(view: &BookView, levels: usize, sequence: u64) -> Self {
		let depth = view.market_depth(levels);
		let stats = SnapshotStats::from_levels(&depth.bids, &depth.asks);
		Self {
			instrument: view.instrument().to_string(),
			sequence,
			timestamp: unix_timestamp_nanos(),
			bids: depth.bids,
			asks: depth.asks,
			stats,
		}
	}

	pub fn price_levels(&self, side: Side) -> &[PriceLevel] {
		match side {
			Side::Buy => &self.bids,
			Side::Sell => &self.asks,
		}
	}

	pub fn best_price(&self, side: Side) -> Option<f64> {
		self.price_levels(side).first().map(|level| level.price)
	}

	/// Encode to JSON bytes
	pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
		serde_json::to_vec(self).map_err(|e| SnapshotError::Encode(e.to_string()))
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
		serde_json::from_slice(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn level(price: f64, quantity: f64, order_count: usize) -> PriceLevel {
		PriceLevel {
			price,
			quantity,
			order_count,
		}
	}

	fn sample() -> OrderBookSnapshot {
		let bids = vec![level(99.0, 3.0, 2), level(98.0, 1.0, 1)];
		let asks = vec![level(101.0, 4.0, 1)];
		OrderBookSnapshot {
			instrument: "BTC-USD".to_string(),
			sequence: 7,
			timestamp: 1_000,
			stats: SnapshotStats::from_levels(&bids, &asks),
			bids,
			asks,
		}
	}

	#[test]
	fn test_stats_from_levels() {
		let stats = sample().stats;
		assert_eq!(stats.total_bid_quantity, 4.0);
		assert_eq!(stats.total_ask_quantity, 4.0);
		assert_eq!(stats.bid_orders, 3);
		assert_eq!(stats.ask_orders, 1);
		assert_eq!(stats.spread, Some(2.0));
		assert_eq!(stats.mid_price, Some(100.0));
	}

	#[test]
	fn test_one_sided_book_has_no_spread() {
		let stats = SnapshotStats::from_levels(&[level(99.0, 1.0, 1)], &[]);
		assert_eq!(stats.spread, None);
		assert_eq!(stats.mid_price, None);

		let json = serde_json::to_value(&stats).unwrap();
		assert!(json.get("spread").is_none());
		assert!(json.get("mid_price").is_none());
		assert_eq!(json["bid_orders"], 1);
	}

	#[test]
	fn test_side_helpers() {
		let snapshot = sample();
		assert_eq!(snapshot.price_levels(Side::Buy).len(), 2);
		assert_eq!(snapshot.best_price(Side::Buy), Some(99.0));
		assert_eq!(snapshot.best_price(Side::Sell), Some(101.0));
	}

	#[test]
	fn test_encode_decode() {
		let snapshot = sample();
		let bytes = snapshot.encode().unwrap();
		let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
		assert_eq!(json["bids"][0]["order_count"], 2);
		assert_eq!(json["stats"]["spread"], 2.0);

		assert_eq!(OrderBookSnapshot::decode(&bytes).unwrap(), snapshot);
		assert!(matches!(
			OrderBookSnapshot::decode(b"not json"),
			Err(SnapshotError::Decode(_))
		));
	}

	#[test]
	fn test_capture_from_view() {
		let view = BookView::new("ETH-USD");
		view.add(Side::Buy, 10.0, 2.0);
		view.add(Side::Sell, 11.0, 1.0);
		view.add(Side::Sell, 12.0, 1.0);

		let snapshot = OrderBookSnapshot::capture(&view, 1, 3);
		assert_eq!(snapshot.instrument, "ETH-USD");
		assert_eq!(snapshot.sequence, 3);
		assert_eq!(snapshot.asks.len(), 1);
		assert_eq!(snapshot.stats.total_ask_quantity, 1.0);
		assert_eq!(snapshot.stats.spread, Some(1.0));
	}
}
