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

mod control;
mod worker;

pub use control::BookCommand;

use std::{
	sync::{
		Arc, Mutex, PoisonError,
		atomic::{AtomicBool, Ordering},
	},
	thread::JoinHandle,
};

use aeromatch_sdk::types::{Order, OrderId};
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::{
	ids::{IdGenerator, SequentialIds},
	orderbook::{BookView, OrderBook},
	queue::{EnqueueError, IngressQueue, QueueSender},
	trades::{TradeBuffer, TradePublisher, TradeStream},
	types::{MatchingError, SubmitReport},
};
use worker::BookWorker;

/// Configuration for the matching engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
	/// Capacity of each instrument's ingress queue
	pub ingress_queue_size: usize,
	/// Capacity of the engine-wide trade buffer
	pub trade_buffer_size: usize,
	pub verbose_logging: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			ingress_queue_size: 10_000,
			trade_buffer_size: 20_000,
			verbose_logging: false,
		}
	}
}

struct BookHandle {
	sender: QueueSender,
	view: BookView,
	thread: Option<JoinHandle<()>>,
}

/// Routes orders to per-instrument books
///
/// Each registered book is owned by a dedicated worker thread fed through a
/// bounded ingress queue, so one instrument is strictly sequential while
/// different instruments match in parallel. All workers share one id
/// generator and publish into one trade stream.
///
/// Architecture:
/// - Registry: instrument -> queue sender + book view (concurrent map)
/// - Workers: one thread per instrument, the only writer of its book
/// - Replies: each command carries a oneshot channel for its outcome
/// - Trades: bounded engine-wide buffer, published before the reply
pub struct MatchingEngine {
	books: DashMap<String, BookHandle>,
	ids: Arc<dyn IdGenerator>,
	publisher: Mutex<Option<TradePublisher>>,
	/// Kept until shutdown so trades published before anyone subscribes are not lost
	stream: Mutex<Option<TradeStream>>,
	config: EngineConfig,
	accepting: AtomicBool,
}

impl MatchingEngine {
	/// Create an engine with trade and execution ids starting at 1
	pub fn new(config: EngineConfig) -> Self {
		Self::with_id_generator(config, Arc::new(SequentialIds::new()))
	}

	pub fn with_id_generator(config: EngineConfig, ids: Arc<dyn IdGenerator>) -> Self {
		let (publisher, stream) = TradeBuffer::new(config.trade_buffer_size).split();
		Self {
			books: DashMap::new(),
			ids,
			publisher: Mutex::new(Some(publisher)),
			stream: Mutex::new(Some(stream)),
			config,
			accepting: AtomicBool::new(true),
		}
	}

	/// Register a book and start its worker
	///
	/// The book is switched to the engine's id generator. Returns a view
	/// of the book for readers such as the snapshot manager.
	pub fn register_book(&self, mut book: OrderBook) -> Result<BookView, MatchingError> {
		if !self.accepting.load(Ordering::Acquire) {
			return Err(MatchingError::Shutdown);
		}
		let publisher = self
			.publisher
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
			.ok_or(MatchingError::Shutdown)?;

		let instrument = book.instrument().to_string();
		let Entry::Vacant(slot) = self.books.entry(instrument.clone()) else {
			return Err(MatchingError::DuplicateRegistration(instrument));
		};

		book.set_id_generator(self.ids.clone());
		let view = book.view();
		let (sender, receiver) = IngressQueue::new(self.config.ingress_queue_size).split();
		let thread = BookWorker::new(book, receiver, publisher, self.config.verbose_logging)
			.spawn()
			.map_err(|e| MatchingError::WorkerUnavailable(format!("{instrument}: {e}")))?;

		slot.insert(BookHandle {
			sender,
			view: view.clone(),
			thread: Some(thread),
		});
		info!(
			target: "engine",
			instrument = %instrument,
			queue_size = self.config.ingress_queue_size,
			"Order book registered"
		);
		Ok(view)
	}

	/// Submit an order and wait for the outcome
	///
	/// Blocks the calling thread until the instrument's worker has
	/// processed the order. Must not be called from inside an async
	/// runtime; use [`MatchingEngine::submit_async`] there.
	pub fn submit(&self, order: Order) -> Result<SubmitReport, MatchingError> {
		let instrument = order.instrument.clone();
		let reply = self.enqueue_submit(order)?;
		reply
			.blocking_recv()
			.map_err(|_| MatchingError::WorkerUnavailable(instrument))?
	}

	/// Submit an order and await the outcome
	pub async fn submit_async(&self, order: Order) -> Result<SubmitReport, MatchingError> {
		let instrument = order.instrument.clone();
		let reply = self.enqueue_submit(order)?;
		reply
			.await
			.map_err(|_| MatchingError::WorkerUnavailable(instrument))?
	}

	/// Cancel a resting order and wait for the outcome
	///
	/// Blocking like [`MatchingEngine::submit`]; async callers use
	/// [`MatchingEngine::cancel_async`].
	pub fn cancel(&self, instrument: &str, order_id: OrderId) -> Result<Order, MatchingError> {
		self.enqueue_cancel(instrument, order_id)?
			.blocking_recv()
			.map_err(|_| MatchingError::WorkerUnavailable(instrument.to_string()))?
	}

	/// Cancel a resting order and await the outcome
	pub async fn cancel_async(
		&self,
		instrument: &str,
		order_id: OrderId,
	) -> Result<Order, MatchingError> {
		self.enqueue_cancel(instrument, order_id)?
			.await
			.map_err(|_| MatchingError::WorkerUnavailable(instrument.to_string()))?
	}

	/// Handle on the engine-wide trade stream
	///
	/// After shutdown the returned stream is already disconnected.
	pub fn trades_stream(&self) -> TradeStream {
		self.stream
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
			.unwrap_or_else(TradeStream::closed)
	}

	pub fn book_view(&self, instrument: &str) -> Option<BookView> {
		self.books.get(instrument).map(|handle| handle.view.clone())
	}

	/// Registered instruments, sorted
	pub fn instruments(&self) -> Vec<String> {
		let mut instruments: Vec<String> = self.books.iter().map(|e| e.key().clone()).collect();
		instruments.sort();
		instruments
	}

	/// Commands waiting in an instrument's ingress queue
	pub fn queue_depth(&self, instrument: &str) -> Option<usize> {
		self.books.get(instrument).map(|handle| handle.sender.len())
	}

	/// Stop accepting orders and join every worker
	///
	/// Commands already queued are still processed and answered. The
	/// engine releases its own stream handle first, so a worker blocked on
	/// a full buffer is released once no outside consumer remains. Once the
	/// workers are gone the trade stream reports `Disconnected` after its
	/// buffered trades have been consumed. Calling it again is a no-op.
	pub fn shutdown(&self) {
		if !self.accepting.swap(false, Ordering::AcqRel) {
			return;
		}
		info!(target: "engine", books = self.books.len(), "Shutting down matching engine");

		self.stream
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();
		self.publisher
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take();

		for instrument in self.instruments() {
			let Some((_, mut handle)) = self.books.remove(&instrument) else {
				continue;
			};
			let thread = handle.thread.take();
			// Dropping the last sender lets the worker drain and exit.
			drop(handle);
			if let Some(thread) = thread
				&& let Err(e) = thread.join()
			{
				warn!(target: "engine", instrument = %instrument, error = ?e, "Book worker panicked");
			}
		}
	}

	fn enqueue_submit(
		&self,
		order: Order,
	) -> Result<oneshot::Receiver<Result<SubmitReport, MatchingError>>, MatchingError> {
		// Malformed orders never take a queue slot.
		order.validate()?;
		let instrument = order.instrument.clone();
		let (respond_to, reply) = oneshot::channel();
		self.dispatch(&instrument, BookCommand::Submit { order, respond_to })?;
		Ok(reply)
	}

	fn enqueue_cancel(
		&self,
		instrument: &str,
		order_id: OrderId,
	) -> Result<oneshot::Receiver<Result<Order, MatchingError>>, MatchingError> {
		let (respond_to, reply) = oneshot::channel();
		self.dispatch(
			instrument,
			BookCommand::Cancel {
				order_id,
				respond_to,
			},
		)?;
		Ok(reply)
	}

	fn dispatch(&self, instrument: &str, cmd: BookCommand) -> Result<(), MatchingError> {
		if !self.accepting.load(Ordering::Acquire) {
			return Err(MatchingError::Shutdown);
		}
		// Clone the sender so no registry lock is held while enqueueing.
		let sender = self
			.books
			.get(instrument)
			.map(|handle| handle.sender.clone())
			.ok_or_else(|| MatchingError::UnknownInstrument(instrument.to_string()))?;

		sender.try_enqueue(cmd).map_err(|e| match e {
			EnqueueError::Full(cmd) => {
				warn!(
					target: "engine",
					instrument = %instrument,
					order_id = cmd.order_id(),
					"Ingress queue full, rejecting command"
				);
				MatchingError::Overloaded(instrument.to_string())
			}
			EnqueueError::Disconnected(_) => MatchingError::WorkerUnavailable(instrument.to_string()),
		})
	}
}

impl Default for MatchingEngine {
	fn default() -> Self {
		Self::new(EngineConfig::default())
	}
}

impl Drop for MatchingEngine {
	fn drop(&mut self) {
		self.shutdown();
	}
}
