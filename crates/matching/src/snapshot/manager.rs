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
	collections::HashMap,
	sync::{
		Arc, Mutex, PoisonError, RwLock,
		atomic::{AtomicU64, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use crossbeam::channel::{Sender, bounded, select, tick};
use tracing::{debug, info, warn};

use super::{OrderBookSnapshot, SnapshotError, SnapshotStorage};
use crate::orderbook::BookView;

/// Configuration for the SnapshotManager
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
	/// Interval between snapshot cycles
	pub interval: Duration,
	/// Price levels captured per side
	pub depth_levels: usize,
	/// Snapshots kept per instrument by the storage sink
	pub max_snapshots_to_keep: usize,
}

impl Default for SnapshotConfig {
	fn default() -> Self {
		Self {
			interval: Duration::from_millis(100),
			depth_levels: 100,
			max_snapshots_to_keep: 10,
		}
	}
}

type BookMap = HashMap<String, BookView>;
type SnapshotMap = HashMap<String, Arc<OrderBookSnapshot>>;

/// Copy-on-write cell
///
/// Writers build a whole new map and swap it in; readers clone the `Arc`
/// under a momentary read lock and then work on a map nobody mutates.
struct Published<T> {
	current: RwLock<Arc<T>>,
}

impl<T> Published<T> {
	fn new(value: T) -> Self {
		Self {
			current: RwLock::new(Arc::new(value)),
		}
	}

	fn load(&self) -> Arc<T> {
		self.current
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}

	fn store(&self, value: T) {
		*self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(value);
	}
}

struct Inner {
	config: SnapshotConfig,
	books: Published<BookMap>,
	snapshots: Published<SnapshotMap>,
	sequence: AtomicU64,
	/// Serializes registrations against each other
	registration: Mutex<()>,
	/// Serializes cycles so an older cycle never overwrites a newer one
	cycle: Mutex<()>,
	storage: Option<Mutex<Box<dyn SnapshotStorage>>>,
}

struct Timer {
	shutdown: Sender<()>,
	handle: JoinHandle<()>,
}

/// SnapshotManager - periodically publishes depth snapshots of every book
///
/// Each cycle reads every registered book through its [`BookView`], never
/// through the book's ingress queue, so a cycle neither waits for nor delays
/// matching. The resulting per-instrument snapshots are published together
/// by swapping in a new map: readers see either the previous set or the new
/// one, never a mix.
///
/// Design principles:
/// - Non-blocking: matching never waits for a cycle
/// - Eventually consistent: a snapshot may lag its book by one fill
/// - Totally ordered: every snapshot takes the next value of one counter
/// - Bounded history: the optional storage sink keeps the newest few per
///   instrument
pub struct SnapshotManager {
	inner: Arc<Inner>,
	timer: Mutex<Option<Timer>>,
}

impl SnapshotManager {
	pub fn new(config: SnapshotConfig) -> Self {
		Self::build(config, None)
	}

	/// Create a manager that also hands every snapshot to a storage sink
	pub fn with_storage(config: SnapshotConfig, storage: Box<dyn SnapshotStorage>) -> Self {
		Self::build(config, Some(Mutex::new(storage)))
	}

	fn build(config: SnapshotConfig, storage: Option<Mutex<Box<dyn SnapshotStorage>>>) -> Self {
		Self {
			inner: Arc::new(Inner {
				config,
				books: Published::new(HashMap::new()),
				snapshots: Published::new(HashMap::new()),
				sequence: AtomicU64::new(0),
				registration: Mutex::new(()),
				cycle: Mutex::new(()),
				storage,
			}),
			timer: Mutex::new(None),
		}
	}

	/// Add a book to management
	///
	/// The book shows up in snapshots from the next cycle on. Registering
	/// the same instrument again replaces its view.
	pub fn register_order_book(&self, view: BookView) {
		let _guard = self
			.inner
			.registration
			.lock()
			.unwrap_or_else(PoisonError::into_inner);
		let mut books = BookMap::clone(&self.inner.books.load());
		let instrument = view.instrument().to_string();
		books.insert(instrument.clone(), view);
		self.inner.books.store(books);
		debug!(target: "snapshot", instrument = %instrument, "Order book registered for snapshots");
	}

	/// Run one snapshot cycle now
	///
	/// Returns the number of snapshots published.
	pub fn take_snapshots(&self) -> usize {
		self.inner.take_snapshots()
	}

	/// Latest published snapshot of an instrument
	///
	/// The caller gets its own copy.
	pub fn get_snapshot(&self, instrument: &str) -> Option<OrderBookSnapshot> {
		self.inner
			.snapshots
			.load()
			.get(instrument)
			.map(|snapshot| OrderBookSnapshot::clone(snapshot))
	}

	/// Latest published snapshot of every instrument
	pub fn get_all_snapshots(&self) -> HashMap<String, OrderBookSnapshot> {
		self.inner
			.snapshots
			.load()
			.iter()
			.map(|(instrument, snapshot)| (instrument.clone(), OrderBookSnapshot::clone(snapshot)))
			.collect()
	}

	/// Instruments under management, sorted
	pub fn instruments(&self) -> Vec<String> {
		let mut instruments: Vec<String> = self.inner.books.load().keys().cloned().collect();
		instruments.sort();
		instruments
	}

	/// Last sequence number handed out (0 before the first snapshot)
	pub fn last_sequence(&self) -> u64 {
		self.inner.sequence.load(Ordering::Acquire)
	}

	/// Start the periodic snapshot timer
	///
	/// Does nothing if the timer is already running.
	pub fn start(&self) -> Result<(), SnapshotError> {
		let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
		if timer.is_some() {
			return Ok(());
		}

		let (shutdown, shutdown_rx) = bounded::<()>(0);
		let inner = self.inner.clone();
		let handle = thread::Builder::new()
			.name("snapshot-manager".to_string())
			.spawn(move || {
				let interval = inner.config.interval;
				info!(target: "snapshot", interval_ms = interval.as_millis() as u64, "Snapshot manager started");
				let ticker = tick(interval);
				loop {
					select! {
						recv(ticker) -> _ => {
							inner.take_snapshots();
						},
						recv(shutdown_rx) -> _ => break,
					}
				}
				info!(target: "snapshot", "Snapshot manager stopped");
			})
			.map_err(|e| SnapshotError::Timer(e.to_string()))?;

		*timer = Some(Timer { shutdown, handle });
		Ok(())
	}

	/// Stop the timer and wait for a running cycle to finish
	pub fn shutdown(&self) {
		let timer = self
			.timer
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		let Some(Timer { shutdown, handle }) = timer else {
			return;
		};

		info!(target: "snapshot", "Shutting down snapshot manager");
		// Disconnecting the channel wakes the timer thread.
		drop(shutdown);
		if let Err(e) = handle.join() {
			warn!(target: "snapshot", error = ?e, "Snapshot manager thread panicked");
		}
	}
}

impl Default for SnapshotManager {
	fn default() -> Self {
		Self::new(SnapshotConfig::default())
	}
}

impl Drop for SnapshotManager {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl Inner {
	fn take_snapshots(&self) -> usize {
		let _cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
		let start = Instant::now();
		let books = self.books.load();

		let mut instruments: Vec<&String> = books.keys().collect();
		instruments.sort();

		let mut snapshots = SnapshotMap::with_capacity(books.len());
		for instrument in instruments {
			let Some(view) = books.get(instrument) else {
				continue;
			};
			let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
			let snapshot = OrderBookSnapshot::capture(view, self.config.depth_levels, sequence);
			snapshots.insert(instrument.clone(), Arc::new(snapshot));
		}

		let published = snapshots.len();
		if let Some(storage) = &self.storage {
			self.persist(storage, &snapshots);
		}
		self.snapshots.store(snapshots);

		debug!(
			target: "snapshot",
			published,
			last_sequence = self.sequence.load(Ordering::Acquire),
			elapsed_us = start.elapsed().as_micros() as u64,
			"Snapshot cycle complete"
		);
		published
	}

	fn persist(&self, storage: &Mutex<Box<dyn SnapshotStorage>>, snapshots: &SnapshotMap) {
		let mut storage = storage.lock().unwrap_or_else(PoisonError::into_inner);
		for (instrument, snapshot) in snapshots {
			if let Err(e) = storage.save(snapshot) {
				warn!(
					target: "snapshot",
					instrument = %instrument,
					sequence = snapshot.sequence,
					error = %e,
					"Failed to save snapshot"
				);
				continue;
			}
			match storage.cleanup(instrument, self.config.max_snapshots_to_keep) {
				Ok(0) => {}
				Ok(deleted) => {
					debug!(
						target: "snapshot",
						instrument = %instrument,
						deleted,
						retained = self.config.max_snapshots_to_keep,
						"Old snapshots cleaned up"
					);
				}
				Err(e) => {
					warn!(
						target: "snapshot",
						instrument = %instrument,
						error = %e,
						"Failed to cleanup old snapshots"
					);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use aeromatch_sdk::types::Side;

	use super::*;
	use crate::snapshot::MemorySnapshotStorage;

	fn view_with(instrument: &str, bids: &[(f64, f64)], asks: &[(f64, f64)]) -> BookView {
		let view = BookView::new(instrument);
		for (price, qty) in bids {
			view.add(Side::Buy, *price, *qty);
		}
		for (price, qty) in asks {
			view.add(Side::Sell, *price, *qty);
		}
		view
	}

	#[test]
	fn test_no_snapshot_before_first_cycle() {
		let manager = SnapshotManager::default();
		manager.register_order_book(view_with("BTC-USD", &[(99.0, 1.0)], &[]));

		assert!(manager.get_snapshot("BTC-USD").is_none());
		assert!(manager.get_all_snapshots().is_empty());
		assert_eq!(manager.instruments(), vec!["BTC-USD".to_string()]);
	}

	#[test]
	fn test_cycle_publishes_every_book() {
		let manager = SnapshotManager::default();
		manager.register_order_book(view_with("BTC-USD", &[(99.0, 1.0)], &[(101.0, 2.0)]));
		manager.register_order_book(view_with("ETH-USD", &[], &[(10.0, 5.0)]));

		assert_eq!(manager.take_snapshots(), 2);

		let all = manager.get_all_snapshots();
		assert_eq!(all.len(), 2);
		let btc = &all["BTC-USD"];
		assert_eq!(btc.stats.spread, Some(2.0));
		assert_eq!(btc.stats.mid_price, Some(100.0));
		let eth = manager.get_snapshot("ETH-USD").unwrap();
		assert_eq!(eth.stats.spread, None);
		assert_eq!(eth.stats.total_ask_quantity, 5.0);

		let mut sequences = vec![btc.sequence, eth.sequence];
		sequences.sort();
		assert_eq!(sequences, vec![1, 2]);
	}

	#[test]
	fn test_repeated_cycles_are_idempotent_except_sequence() {
		let manager = SnapshotManager::default();
		manager.register_order_book(view_with("BTC-USD", &[(99.0, 1.0)], &[(101.0, 2.0)]));

		manager.take_snapshots();
		let first = manager.get_snapshot("BTC-USD").unwrap();
		manager.take_snapshots();
		let second = manager.get_snapshot("BTC-USD").unwrap();

		assert!(second.sequence > first.sequence);
		assert_eq!(first.bids, second.bids);
		assert_eq!(first.asks, second.asks);
		assert_eq!(first.stats, second.stats);
	}

	#[test]
	fn test_returned_snapshots_are_copies() {
		let manager = SnapshotManager::default();
		manager.register_order_book(view_with("BTC-USD", &[(99.0, 1.0)], &[]));
		manager.take_snapshots();

		let mut copy = manager.get_snapshot("BTC-USD").unwrap();
		copy.bids.clear();
		copy.stats.bid_orders = 42;

		let fresh = manager.get_snapshot("BTC-USD").unwrap();
		assert_eq!(fresh.bids.len(), 1);
		assert_eq!(fresh.stats.bid_orders, 1);
	}

	#[test]
	fn test_depth_levels_bound_snapshot() {
		let config = SnapshotConfig {
			depth_levels: 3,
			..SnapshotConfig::default()
		};
		let manager = SnapshotManager::new(config);
		let bids: Vec<(f64, f64)> = (0..10).map(|i| (100.0 - i as f64, 1.0)).collect();
		manager.register_order_book(view_with("BTC-USD", &bids, &[]));
		manager.take_snapshots();

		let snapshot = manager.get_snapshot("BTC-USD").unwrap();
		assert_eq!(snapshot.bids.len(), 3);
		assert_eq!(snapshot.stats.total_bid_quantity, 3.0);
	}

	#[test]
	fn test_storage_sink_retains_newest() {
		let config = SnapshotConfig {
			max_snapshots_to_keep: 2,
			..SnapshotConfig::default()
		};
		let manager = SnapshotManager::with_storage(config, Box::new(MemorySnapshotStorage::new()));
		manager.register_order_book(view_with("BTC-USD", &[(99.0, 1.0)], &[]));
		for _ in 0..4 {
			manager.take_snapshots();
		}

		let storage = manager
			.inner
			.storage
			.as_ref()
			.unwrap()
			.lock()
			.unwrap();
		let sequences: Vec<u64> = storage.list("BTC-USD").iter().map(|m| m.sequence).collect();
		assert_eq!(sequences, vec![3, 4]);
		assert_eq!(storage.load_latest("BTC-USD").unwrap().sequence, 4);
	}

	#[test]
	fn test_timer_publishes_and_stops() {
		let config = SnapshotConfig {
			interval: Duration::from_millis(5),
			..SnapshotConfig::default()
		};
		let manager = SnapshotManager::new(config);
		manager.register_order_book(view_with("BTC-USD", &[(99.0, 1.0)], &[]));
		manager.start().unwrap();
		manager.start().unwrap();

		let deadline = Instant::now() + Duration::from_secs(2);
		while manager.get_snapshot("BTC-USD").is_none() && Instant::now() < deadline {
			thread::sleep(Duration::from_millis(5));
		}
		manager.shutdown();

		assert!(manager.get_snapshot("BTC-USD").is_some());
		let stopped_at = manager.last_sequence();
		thread::sleep(Duration::from_millis(30));
		assert_eq!(manager.last_sequence(), stopped_at);
	}
}
