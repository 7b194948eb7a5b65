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

use std::time::Duration;

use aeromatch_sdk::types::Trade;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};

/// Engine-wide buffer carrying trades from book workers to consumers
///
/// Every book worker publishes into the same buffer, so consumers see one
/// stream for all instruments. Trades of one instrument keep their fill
/// order; trades of different instruments interleave arbitrarily.
///
/// Properties:
/// - Multiple Producers (one per book worker)
/// - Multiple Consumers (each trade goes to exactly one of them)
/// - Bounded capacity; a full buffer slows the workers down instead of
///   dropping trades
pub struct TradeBuffer {
	sender: Sender<Trade>,
	receiver: Receiver<Trade>,
}

impl TradeBuffer {
	/// Create a new trade buffer with the specified capacity
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split the buffer into publisher and stream ends
	pub fn split(self) -> (TradePublisher, TradeStream) {
		(
			TradePublisher {
				sender: self.sender,
			},
			TradeStream {
				receiver: self.receiver,
			},
		)
	}
}

/// Publishing end of the trade buffer (used by book workers)
#[derive(Clone)]
pub struct TradePublisher {
	sender: Sender<Trade>,
}

impl TradePublisher {
	/// Publish a trade, waiting for room if the buffer is full
	///
	/// Only fails once every stream handle has been dropped.
	pub fn publish(&self, trade: Trade) -> Result<(), TradeStreamError> {
		self.sender
			.send(trade)
			.map_err(|_| TradeStreamError::Disconnected)
	}

	/// Number of trades not yet consumed
	pub fn pending(&self) -> usize {
		self.sender.len()
	}
}

/// Consuming end of the trade buffer
///
/// Handles are cheap to clone. Clones compete for trades rather than each
/// receiving a copy.
#[derive(Clone)]
pub struct TradeStream {
	receiver: Receiver<Trade>,
}

impl TradeStream {
	/// A stream with no publisher that reports `Disconnected` right away
	pub fn closed() -> Self {
		let (_, receiver) = bounded(0);
		Self { receiver }
	}

	/// Receive a trade (blocking)
	///
	/// Returns `Disconnected` after the engine has shut down and every
	/// buffered trade has been consumed.
	pub fn recv(&self) -> Result<Trade, TradeStreamError> {
		self.receiver
			.recv()
			.map_err(|_| TradeStreamError::Disconnected)
	}

	/// Try to receive a trade (non-blocking)
	pub fn try_recv(&self) -> Result<Trade, TradeStreamError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => TradeStreamError::Empty,
			TryRecvError::Disconnected => TradeStreamError::Disconnected,
		})
	}

	/// Receive a trade, giving up after `timeout`
	pub fn recv_timeout(&self, timeout: Duration) -> Result<Trade, TradeStreamError> {
		self.receiver.recv_timeout(timeout).map_err(|e| match e {
			RecvTimeoutError::Timeout => TradeStreamError::Timeout,
			RecvTimeoutError::Disconnected => TradeStreamError::Disconnected,
		})
	}

	/// Drain up to `max_count` trades without blocking
	pub fn drain(&self, max_count: usize) -> Vec<Trade> {
		self.receiver.try_iter().take(max_count).collect()
	}

	pub fn len(&self) -> usize {
		self.receiver.len()
	}

	pub fn is_empty(&self) -> bool {
		self.receiver.is_empty()
	}
}

/// Errors that can occur when consuming the trade stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeStreamError {
	#[error("Trade stream is empty")]
	Empty,
	#[error("Timed out waiting for a trade")]
	Timeout,
	#[error("Trade stream disconnected")]
	Disconnected,
}
