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

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Order identifier, unique within an instrument
pub type OrderId = u64;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	/// The side a resting counterparty sits on
	pub fn opposite(self) -> Self {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

/// Order type
///
/// Every type except `Market` carries a limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
	/// Matches what crosses, rests the remainder
	Limit,
	/// Crosses at any price, never rests
	Market,
	/// Immediate-or-cancel: matches what crosses, cancels the remainder
	Ioc,
	/// Fill-or-kill: fills the whole quantity or nothing
	Fok,
	/// Maker-only: rejected if it would cross on arrival
	PostOnly,
}

impl OrderType {
	/// Whether an unfilled remainder of this type is added to the book
	pub fn rests(self) -> bool {
		matches!(self, OrderType::Limit | OrderType::PostOnly)
	}

	pub fn is_priced(self) -> bool {
		!matches!(self, OrderType::Market)
	}
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	New,
	Partial,
	Filled,
	Cancelled,
	Rejected,
}

/// Leverage parameters attached to an order
///
/// Carried through the engine untouched; the matching core never reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginParams {
	pub leverage: f64,
	pub is_isolated: bool,
	pub liquidation_price: f64,
	pub borrow_cost: f64,
}

/// Structural validation failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
	#[error("quantity must be positive and finite, got {0}")]
	InvalidQuantity(f64),
	#[error("invalid price {price} for {order_type:?} order")]
	InvalidPrice { order_type: OrderType, price: f64 },
	#[error("missing instrument identifier")]
	MissingInstrument,
}

/// An order as submitted to and tracked by the matching engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Order ID (unique per instrument)
	pub id: OrderId,
	/// Trading pair (e.g. "BTC-USD")
	pub instrument: String,
	pub side: Side,
	#[serde(rename = "type")]
	pub order_type: OrderType,
	/// Limit price; NaN for market orders, `null` on the wire
	#[serde(with = "price_sentinel")]
	pub price: f64,
	/// Original quantity, never modified after creation
	pub quantity: f64,
	/// Unfilled quantity, only ever decreases
	pub remaining: f64,
	pub status: OrderStatus,
	/// Creation time, nanoseconds since the unix epoch
	pub timestamp: u64,
	/// Arrival sequence assigned by the book on acceptance (time priority)
	#[serde(default)]
	pub sequence: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub account: Option<String>,
	/// Client-supplied correlation id
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_order_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub margin: Option<MarginParams>,
}

impl Order {
	pub fn new(
		id: OrderId,
		instrument: impl Into<String>,
		side: Side,
		order_type: OrderType,
		price: f64,
		quantity: f64,
	) -> Self {
		Self {
			id,
			instrument: instrument.into(),
			side,
			order_type,
			price,
			quantity,
			remaining: quantity,
			status: OrderStatus::New,
			timestamp: unix_timestamp_nanos(),
			sequence: 0,
			account: None,
			client_order_id: None,
			margin: None,
		}
	}

	/// Create a limit order
	pub fn limit(
		id: OrderId,
		instrument: impl Into<String>,
		side: Side,
		price: f64,
		quantity: f64,
	) -> Self {
		Self::new(id, instrument, side, OrderType::Limit, price, quantity)
	}

	/// Create a market order; the price is the NaN sentinel
	pub fn market(id: OrderId, instrument: impl Into<String>, side: Side, quantity: f64) -> Self {
		Self::new(id, instrument, side, OrderType::Market, f64::NAN, quantity)
	}

	pub fn with_client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
		self.client_order_id = Some(client_order_id.into());
		self
	}

	pub fn with_account(mut self, account: impl Into<String>) -> Self {
		self.account = Some(account.into());
		self
	}

	pub fn with_margin(mut self, margin: MarginParams) -> Self {
		self.margin = Some(margin);
		self
	}

	/// Check the structural invariants every order must satisfy before matching
	pub fn validate(&self) -> Result<(), OrderError> {
		if !(self.quantity.is_finite() && self.quantity > 0.0) {
			return Err(OrderError::InvalidQuantity(self.quantity));
		}
		if self.order_type.is_priced() && !(self.price.is_finite() && self.price > 0.0) {
			return Err(OrderError::InvalidPrice {
				order_type: self.order_type,
				price: self.price,
			});
		}
		if self.instrument.trim().is_empty() {
			return Err(OrderError::MissingInstrument);
		}
		Ok(())
	}

	/// Whether the order can still trade (new or partially filled)
	pub fn is_active(&self) -> bool {
		matches!(self.status, OrderStatus::New | OrderStatus::Partial)
	}

	pub fn filled_quantity(&self) -> f64 {
		self.quantity - self.remaining
	}

	/// Whether this order, as a taker, trades against a maker resting at `maker_price`
	pub fn crosses(&self, maker_price: f64) -> bool {
		match (self.order_type, self.side) {
			(OrderType::Market, _) => true,
			(_, Side::Buy) => self.price >= maker_price,
			(_, Side::Sell) => self.price <= maker_price,
		}
	}
}

/// Trade execution result
///
/// Created by the matching core at the moment of a fill and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
	pub trade_id: u64,
	pub execution_id: u64,
	pub instrument: String,
	/// Execution price (always the maker's price)
	pub price: f64,
	pub quantity: f64,
	/// Side of the trade (from taker's perspective)
	pub side: Side,
	/// Nanoseconds since the unix epoch
	pub timestamp: u64,
	pub maker_order_id: OrderId,
	pub taker_order_id: OrderId,
}

impl Trade {
	pub fn notional(&self) -> f64 {
		self.price * self.quantity
	}
}

/// Current wall-clock time in nanoseconds since the unix epoch
pub fn unix_timestamp_nanos() -> u64 {
	SystemTime::now()
		.duration_since(SystemTime::UNIX_EPOCH)
		.map(|d| d.as_nanos() as u64)
		.unwrap_or_default()
}

/// Market orders carry a NaN price, which JSON cannot represent
mod price_sentinel {
	use serde::{Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
		(!price.is_nan()).then_some(*price).serialize(serializer)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
		Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_order_starts_unfilled() {
		let order = Order::limit(1, "BTC-USD", Side::Buy, 100.0, 5.0);

		assert_eq!(order.remaining, 5.0);
		assert_eq!(order.status, OrderStatus::New);
		assert_eq!(order.sequence, 0);
		assert!(order.is_active());
		assert_eq!(order.filled_quantity(), 0.0);
	}

	#[test]
	fn test_validate_rejects_bad_quantity() {
		for qty in [0.0, -1.0, f64::NAN, f64::INFINITY] {
			let order = Order::limit(1, "BTC-USD", Side::Buy, 100.0, qty);
			assert!(matches!(
				order.validate(),
				Err(OrderError::InvalidQuantity(_))
			));
		}
	}

	#[test]
	fn test_validate_rejects_bad_limit_price() {
		for price in [0.0, -5.0, f64::NAN, f64::INFINITY] {
			let order = Order::limit(1, "BTC-USD", Side::Sell, price, 1.0);
			assert!(matches!(
				order.validate(),
				Err(OrderError::InvalidPrice { .. })
			));
		}

		let ioc = Order::new(2, "BTC-USD", Side::Buy, OrderType::Ioc, f64::NAN, 1.0);
		assert!(ioc.validate().is_err());
	}

	#[test]
	fn test_market_order_ignores_price() {
		let order = Order::market(1, "BTC-USD", Side::Buy, 2.0);
		assert!(order.price.is_nan());
		assert!(order.validate().is_ok());
		assert!(order.crosses(1_000_000.0));
	}

	#[test]
	fn test_validate_rejects_missing_instrument() {
		let order = Order::limit(1, "  ", Side::Buy, 100.0, 1.0);
		assert_eq!(order.validate(), Err(OrderError::MissingInstrument));
	}

	#[test]
	fn test_crossing_rule() {
		let buy = Order::limit(1, "BTC-USD", Side::Buy, 100.0, 1.0);
		assert!(buy.crosses(100.0));
		assert!(buy.crosses(99.5));
		assert!(!buy.crosses(100.5));

		let sell = Order::limit(2, "BTC-USD", Side::Sell, 100.0, 1.0);
		assert!(sell.crosses(100.0));
		assert!(sell.crosses(101.0));
		assert!(!sell.crosses(99.0));
	}

	#[test]
	fn test_optional_fields_are_omitted_when_absent() {
		let order = Order::limit(7, "ETH-USD", Side::Sell, 10.0, 1.0);
		let json = serde_json::to_value(&order).unwrap();

		assert_eq!(json["type"], "limit");
		assert_eq!(json["side"], "sell");
		assert!(json.get("client_order_id").is_none());
		assert!(json.get("margin").is_none());

		let tagged = order.with_client_order_id("abc-1");
		let json = serde_json::to_value(&tagged).unwrap();
		assert_eq!(json["client_order_id"], "abc-1");
	}

	#[test]
	fn test_market_order_survives_json() {
		let order = Order::market(3, "BTC-USD", Side::Sell, 1.5).with_client_order_id("m-3");
		let json = serde_json::to_value(&order).unwrap();
		assert!(json["price"].is_null());

		let decoded: Order = serde_json::from_value(json).unwrap();
		assert!(decoded.price.is_nan());
		assert_eq!(decoded.order_type, OrderType::Market);
		assert_eq!(decoded.quantity, 1.5);
		assert_eq!(decoded.client_order_id.as_deref(), Some("m-3"));
		assert!(decoded.validate().is_ok());
	}

	#[test]
	fn test_limit_price_kept_on_the_wire() {
		let order = Order::limit(4, "BTC-USD", Side::Buy, 101.25, 1.0);
		let json = serde_json::to_string(&order).unwrap();
		let decoded: Order = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, order);
	}
}
