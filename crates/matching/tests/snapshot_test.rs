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

//! Snapshot publication against live books

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread,
	time::{Duration, Instant},
};

use aeromatch_matching::{
	EngineConfig, Exchange, ExchangeService, MatchingEngine, MemorySnapshotStorage,
	OrderBookSnapshot, SnapshotConfig, SnapshotManager, SnapshotStorage,
	config::MatchingConfig,
};
use aeromatch_sdk::types::{Order, Side};

fn exchange_with(instruments: &[&str]) -> Exchange {
	let config = MatchingConfig {
		instruments: instruments.iter().map(|i| i.to_string()).collect(),
		..MatchingConfig::default()
	};
	Exchange::from_config(&config).unwrap()
}

#[test]
fn test_snapshot_reflects_book() {
	let exchange = exchange_with(&["BTC-USD"]);
	exchange
		.engine()
		.submit(Order::limit(1, "BTC-USD", Side::Buy, 99.0, 1.0))
		.unwrap();
	exchange
		.engine()
		.submit(Order::limit(2, "BTC-USD", Side::Buy, 99.0, 2.0))
		.unwrap();
	exchange
		.engine()
		.submit(Order::limit(3, "BTC-USD", Side::Sell, 101.0, 4.0))
		.unwrap();

	exchange.snapshots().take_snapshots();
	let snapshot = exchange.get_snapshot("BTC-USD").unwrap();

	assert_eq!(snapshot.bids.len(), 1);
	assert_eq!(snapshot.bids[0].quantity, 3.0);
	assert_eq!(snapshot.bids[0].order_count, 2);
	assert_eq!(snapshot.stats.bid_orders, 2);
	assert_eq!(snapshot.stats.total_ask_quantity, 4.0);
	assert_eq!(snapshot.stats.spread, Some(2.0));
	assert_eq!(snapshot.stats.mid_price, Some(100.0));
}

#[test]
fn test_snapshot_idempotence() {
	let exchange = exchange_with(&["BTC-USD"]);
	exchange
		.engine()
		.submit(Order::limit(1, "BTC-USD", Side::Sell, 101.0, 4.0))
		.unwrap();

	exchange.snapshots().take_snapshots();
	let first = exchange.get_snapshot("BTC-USD").unwrap();
	exchange.snapshots().take_snapshots();
	let second = exchange.get_snapshot("BTC-USD").unwrap();

	assert!(second.sequence > first.sequence);
	assert_eq!(first.bids, second.bids);
	assert_eq!(first.asks, second.asks);
	assert_eq!(first.stats, second.stats);
}

#[test]
fn test_sequence_totally_orders_all_instruments() {
	let exchange = exchange_with(&["BTC-USD", "ETH-USD", "SOL-USD"]);
	let mut seen = Vec::new();
	for _ in 0..3 {
		exchange.snapshots().take_snapshots();
		let mut cycle: Vec<u64> = exchange
			.get_all_snapshots()
			.values()
			.map(|s| s.sequence)
			.collect();
		cycle.sort();
		if let Some(last) = seen.last() {
			assert!(cycle[0] > *last);
		}
		seen.extend(cycle);
	}

	let mut deduped = seen.clone();
	deduped.dedup();
	assert_eq!(deduped.len(), 9);
}

#[test]
fn test_snapshots_while_matching() {
	let exchange = Arc::new(exchange_with(&["BTC-USD"]));
	let config = SnapshotConfig {
		interval: Duration::from_millis(1),
		..SnapshotConfig::default()
	};
	let manager = Arc::new(SnapshotManager::new(config));
	manager.register_order_book(exchange.engine().book_view("BTC-USD").unwrap());
	manager.start().unwrap();

	let done = Arc::new(AtomicBool::new(false));
	let reader = {
		let manager = manager.clone();
		let done = done.clone();
		thread::spawn(move || {
			let mut last_sequence = 0;
			while !done.load(Ordering::Acquire) {
				if let Some(snapshot) = manager.get_snapshot("BTC-USD") {
					assert!(snapshot.sequence >= last_sequence);
					last_sequence = snapshot.sequence;
					if let (Some(bid), Some(ask)) = (
						snapshot.best_price(Side::Buy),
						snapshot.best_price(Side::Sell),
					) {
						assert!(bid < ask);
					}
				}
			}
			last_sequence
		})
	};

	let started = Instant::now();
	for id in 0..2_000u64 {
		let (side, price) = if id % 2 == 0 {
			(Side::Buy, 99.0 + (id % 7) as f64 * 0.1)
		} else {
			(Side::Sell, 100.0 + (id % 5) as f64 * 0.1)
		};
		exchange
			.engine()
			.submit(Order::limit(id + 1, "BTC-USD", side, price, 1.0))
			.unwrap();
	}
	assert!(started.elapsed() < Duration::from_secs(30));

	done.store(true, Ordering::Release);
	let last_sequence = reader.join().unwrap();
	manager.shutdown();
	assert!(manager.last_sequence() >= last_sequence);
}

#[test]
fn test_published_snapshot_survives_encoding_and_storage() {
	let engine = MatchingEngine::new(EngineConfig::default());
	let btc = engine
		.register_book(aeromatch_matching::OrderBook::new("BTC-USD"))
		.unwrap();

	let config = SnapshotConfig {
		max_snapshots_to_keep: 3,
		..SnapshotConfig::default()
	};
	let manager = SnapshotManager::with_storage(config, Box::new(MemorySnapshotStorage::new()));
	manager.register_order_book(btc);

	engine
		.submit(Order::limit(1, "BTC-USD", Side::Buy, 10.0, 1.0))
		.unwrap();
	for _ in 0..5 {
		manager.take_snapshots();
	}

	let published = manager.get_snapshot("BTC-USD").unwrap();
	let encoded = published.encode().unwrap();
	assert_eq!(OrderBookSnapshot::decode(&encoded).unwrap(), published);

	let mut storage = MemorySnapshotStorage::new();
	storage.save(&published).unwrap();
	assert_eq!(storage.load_latest("BTC-USD").unwrap(), published);
}
