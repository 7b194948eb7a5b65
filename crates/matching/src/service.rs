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

use std::{collections::HashMap, sync::Arc};

use aeromatch_sdk::types::{Order, OrderId};
use async_trait::async_trait;
use tracing::info;

use crate::{
	config::MatchingConfig,
	engine::{EngineConfig, MatchingEngine},
	ids::SequentialIds,
	orderbook::{BookView, OrderBook},
	snapshot::{OrderBookSnapshot, SnapshotConfig, SnapshotError, SnapshotManager},
	trades::TradeStream,
	types::{MatchingError, SubmitReport},
};

/// Capabilities offered to transport adapters
///
/// A gRPC, WebSocket, or FIX adapter is written against this trait and
/// never against the engine types directly. Order entry is async so
/// handlers running on a tokio runtime await the book worker instead of
/// blocking a runtime thread.
#[async_trait]
pub trait ExchangeService: Send + Sync {
	/// Submit an order and await its outcome
	async fn submit(&self, order: Order) -> Result<SubmitReport, MatchingError>;

	/// Cancel a resting order
	async fn cancel(&self, instrument: &str, order_id: OrderId) -> Result<Order, MatchingError>;

	/// Stream of trades across all instruments
	fn trades_stream(&self) -> TradeStream;

	/// Latest published snapshot of an instrument
	fn get_snapshot(&self, instrument: &str) -> Option<OrderBookSnapshot>;

	fn get_all_snapshots(&self) -> HashMap<String, OrderBookSnapshot>;
}

/// In-process exchange: one matching engine plus one snapshot manager
pub struct Exchange {
	engine: MatchingEngine,
	snapshots: SnapshotManager,
}

impl Exchange {
	pub fn new(engine_config: EngineConfig, snapshot_config: SnapshotConfig) -> Self {
		Self::from_parts(
			MatchingEngine::new(engine_config),
			SnapshotManager::new(snapshot_config),
		)
	}

	pub fn from_parts(engine: MatchingEngine, snapshots: SnapshotManager) -> Self {
		Self { engine, snapshots }
	}

	/// Build an exchange and register every configured instrument
	///
	/// The snapshot timer is not started.
	pub fn from_config(config: &MatchingConfig) -> Result<Self, MatchingError> {
		let ids = Arc::new(SequentialIds::starting_at(
			config.trade_id_start,
			config.execution_id_start,
		));
		let exchange = Self::from_parts(
			MatchingEngine::with_id_generator(config.engine_config(), ids),
			SnapshotManager::new(config.snapshot_config()),
		);
		for instrument in &config.instruments {
			exchange.register_instrument(instrument)?;
		}
		Ok(exchange)
	}

	/// Create an empty book for `instrument` and put it under management
	pub fn register_instrument(&self, instrument: &str) -> Result<BookView, MatchingError> {
		let view = self.engine.register_book(OrderBook::new(instrument))?;
		self.snapshots.register_order_book(view.clone());
		Ok(view)
	}

	pub fn engine(&self) -> &MatchingEngine {
		&self.engine
	}

	pub fn snapshots(&self) -> &SnapshotManager {
		&self.snapshots
	}

	/// Start the periodic snapshot timer
	pub fn start_snapshots(&self) -> Result<(), SnapshotError> {
		self.snapshots.start()
	}

	/// Stop snapshots first, then drain and join every book worker
	pub fn shutdown(&self) {
		info!(target: "server", "Shutting down exchange");
		self.snapshots.shutdown();
		self.engine.shutdown();
	}
}

#[async_trait]
impl ExchangeService for Exchange {
	async fn submit(&self, order: Order) -> Result<SubmitReport, MatchingError> {
		self.engine.submit_async(order).await
	}

	async fn cancel(&self, instrument: &str, order_id: OrderId) -> Result<Order, MatchingError> {
		self.engine.cancel_async(instrument, order_id).await
	}

	fn trades_stream(&self) -> TradeStream {
		self.engine.trades_stream()
	}

	fn get_snapshot(&self, instrument: &str) -> Option<OrderBookSnapshot> {
		self.snapshots.get_snapshot(instrument)
	}

	fn get_all_snapshots(&self) -> HashMap<String, OrderBookSnapshot> {
		self.snapshots.get_all_snapshots()
	}
}
