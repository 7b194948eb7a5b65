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

use aeromatch_sdk::types::{Order, OrderError, OrderId, OrderStatus, Trade};
use serde::{Deserialize, Serialize};

/// Result of processing one order through a book
///
/// Returned for every accepted submission. Rejections are reported as
/// [`MatchingError`] instead and never mutate book state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReport {
	/// The taker after matching, carrying its final status
	pub order: Order,
	/// Trades generated, in fill order
	pub trades: Vec<Trade>,
	/// Whether an unfilled remainder was added to the book
	pub resting: bool,
	/// Quantity discarded because the order type does not rest
	pub cancelled_quantity: f64,
}

impl SubmitReport {
	pub fn status(&self) -> OrderStatus {
		self.order.status
	}

	pub fn filled_quantity(&self) -> f64 {
		self.trades.iter().map(|t| t.quantity).sum()
	}

	pub fn is_filled(&self) -> bool {
		self.order.status == OrderStatus::Filled
	}
}

/// Error types for matching operations
///
/// Every variant is local to one request: none of them stops the engine
/// or affects other instruments.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatchingError {
	#[error("Invalid order: {0}")]
	InvalidOrder(#[from] OrderError),
	#[error("Order instrument {actual} does not belong to book {expected}")]
	InstrumentMismatch { expected: String, actual: String },
	#[error("Unknown instrument: {0}")]
	UnknownInstrument(String),
	#[error("Duplicate registration for instrument: {0}")]
	DuplicateRegistration(String),
	#[error("Order {order_id} is already resting in {instrument}")]
	DuplicateOrderId { instrument: String, order_id: OrderId },
	#[error("Post-only order {order_id} at {price} would cross the best price {best}")]
	PostOnlyWouldCross {
		order_id: OrderId,
		price: f64,
		best: f64,
	},
	#[error("Fill-or-kill order {order_id} needs {requested} but only {available} is crossable")]
	FokInfeasible {
		order_id: OrderId,
		requested: f64,
		available: f64,
	},
	#[error("Order {order_id} not found in {instrument}")]
	OrderNotFound { instrument: String, order_id: OrderId },
	#[error("Ingress queue full for instrument: {0}")]
	Overloaded(String),
	#[error("Matching engine is shut down")]
	Shutdown,
	#[error("Book worker unavailable: {0}")]
	WorkerUnavailable(String),
}

impl MatchingError {
	/// Resource exhaustion rather than a rejection of the order itself
	///
	/// Callers may retry the same order later.
	pub fn is_backpressure(&self) -> bool {
		matches!(self, MatchingError::Overloaded(_))
	}
}
