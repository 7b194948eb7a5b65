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

//! Aeromatch Matching Engine
//!
//! This crate provides a multi-instrument limit order matching engine. It
//! keeps one in-memory order book per instrument, applies price-time
//! priority, emits trades, and publishes point-in-time depth snapshots.
//!
//! Architecture:
//! - One worker thread per instrument, the only writer of its book
//! - MPSC ingress queue per instrument for concurrent submitters
//! - Engine-wide bounded trade stream
//! - Copy-on-write snapshot publication that never blocks matching

pub mod config;
pub mod engine;
pub mod ids;
pub mod logging;
pub mod orderbook;
pub mod queue;
pub mod service;
pub mod snapshot;
pub mod trades;
pub mod types;

pub use engine::{BookCommand, EngineConfig, MatchingEngine};
pub use ids::{IdGenerator, SequentialIds};
pub use orderbook::{BookView, MarketDepth, OrderBook, PriceLevel};
pub use queue::{EnqueueError, IngressQueue, QueueReceiver, QueueSender};
pub use service::{Exchange, ExchangeService};
pub use snapshot::{
	MemorySnapshotStorage, OrderBookSnapshot, SnapshotConfig, SnapshotError, SnapshotManager,
	SnapshotStats, SnapshotStorage,
};
pub use trades::{TradeBuffer, TradePublisher, TradeStream, TradeStreamError};
pub use types::*;
