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

//! Matching engine service entry point
//!
//! This binary wires up the components of the matching engine:
//! - Matching Engine (one worker thread per instrument)
//! - Ingress Queues (MPSC from submitters to each worker)
//! - Trade Stream (engine-wide, drained by a logging consumer here)
//! - Snapshot Manager (periodic copy-on-write depth snapshots)
//!
//! Transport adapters plug in through `ExchangeService`.

use std::thread;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{info, warn};

use aeromatch_matching::{Exchange, ExchangeService, TradeStream, config::MatchingConfig, logging};

#[tokio::main]
async fn main() -> Result<()> {
	// Initialize logging first
	logging::init_logging()?;

	let config = MatchingConfig::from_env().unwrap_or_else(|e| {
		warn!(target: "server", error = %e, "Using default configuration");
		MatchingConfig::default()
	});
	config.validate().context("Invalid configuration")?;

	info!(target: "server", "Starting Aeromatch Matching Engine");
	info!(target: "server", "Instruments: {}", config.instruments.join(", "));
	info!(target: "server", "Ingress queue size: {}", config.ingress_queue_size);
	info!(target: "server", "Trade buffer size: {}", config.trade_buffer_size);
	info!(target: "server", "Snapshot interval: {}ms", config.snapshot_interval_ms);

	let exchange = Exchange::from_config(&config).context("Failed to build exchange")?;

	info!(target: "server", "Starting trade consumer...");
	let consumer = spawn_trade_logger(exchange.trades_stream())?;

	info!(target: "server", "Starting snapshot manager...");
	exchange
		.start_snapshots()
		.context("Failed to start snapshot manager")?;

	info!(target: "server", "Matching engine ready, press Ctrl-C to stop");
	signal::ctrl_c()
		.await
		.context("Failed to listen for shutdown signal")?;

	info!(target: "server", "Shutting down components...");
	exchange.shutdown();
	// The stream disconnects once every worker is gone.
	if consumer.join().is_err() {
		warn!(target: "server", "Trade consumer panicked");
	}

	info!(target: "server", "Shutdown complete");
	Ok(())
}

fn spawn_trade_logger(stream: TradeStream) -> Result<thread::JoinHandle<()>> {
	thread::Builder::new()
		.name("trade-logger".to_string())
		.spawn(move || {
			let mut count: u64 = 0;
			while let Ok(trade) = stream.recv() {
				count += 1;
				info!(
					target: "server",
					trade_id = trade.trade_id,
					instrument = %trade.instrument,
					price = trade.price,
					quantity = trade.quantity,
					side = ?trade.side,
					maker_order_id = trade.maker_order_id,
					taker_order_id = trade.taker_order_id,
					"Trade"
				);
			}
			info!(target: "server", trades = count, "Trade consumer stopped");
		})
		.context("Failed to spawn trade consumer")
}
