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
	io,
	thread::{self, JoinHandle},
};

use tracing::{debug, info, warn};

use super::BookCommand;
use crate::{orderbook::OrderBook, queue::QueueReceiver, trades::TradePublisher};

/// Single writer of one instrument's book
///
/// The worker owns the book outright. It blocks on the ingress queue,
/// applies each command in arrival order, publishes the resulting trades,
/// and only then answers the submitter. It exits once every queue sender
/// has been dropped and the remaining commands are processed.
pub(crate) struct BookWorker {
	book: OrderBook,
	receiver: QueueReceiver,
	trades: TradePublisher,
	verbose_logging: bool,
}

impl BookWorker {
	pub(crate) fn new(
		book: OrderBook,
		receiver: QueueReceiver,
		trades: TradePublisher,
		verbose_logging: bool,
	) -> Self {
		Self {
			book,
			receiver,
			trades,
			verbose_logging,
		}
	}

	/// Move the worker onto its own named thread
	pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
		thread::Builder::new()
			.name(format!("matching-{}", self.book.instrument()))
			.spawn(move || self.run())
	}

	fn run(mut self) {
		info!(target: "engine", instrument = %self.book.instrument(), "Book worker started");

		let mut processed: u64 = 0;
		while let Some(cmd) = self.receiver.recv() {
			self.process(cmd);
			processed += 1;
		}

		info!(
			target: "engine",
			instrument = %self.book.instrument(),
			processed,
			resting = self.book.order_count(),
			"Book worker stopped"
		);
	}

	fn process(&mut self, cmd: BookCommand) {
		match cmd {
			BookCommand::Submit { order, respond_to } => {
				if self.verbose_logging {
					debug!(
						target: "engine",
						order_id = order.id,
						side = ?order.side,
						order_type = ?order.order_type,
						price = order.price,
						quantity = order.quantity,
						"Processing order"
					);
				}

				let result = self.book.submit(order);
				match &result {
					Ok(report) => {
						for trade in &report.trades {
							if let Err(e) = self.trades.publish(trade.clone()) {
								warn!(
									target: "engine",
									trade_id = trade.trade_id,
									error = %e,
									"No trade consumer left, trade not published"
								);
							}
						}
					}
					Err(e) => {
						debug!(
							target: "engine",
							instrument = %self.book.instrument(),
							error = %e,
							"Order rejected"
						);
					}
				}

				if respond_to.send(result).is_err() {
					debug!(target: "engine", "Submitter dropped before the reply");
				}
			}
			BookCommand::Cancel {
				order_id,
				respond_to,
			} => {
				let result = self.book.cancel(order_id);
				if respond_to.send(result).is_err() {
					debug!(target: "engine", order_id, "Canceller dropped before the reply");
				}
			}
		}
	}
}
