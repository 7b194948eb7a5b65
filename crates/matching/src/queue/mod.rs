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

use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};

use crate::engine::BookCommand;

/// Bounded per-instrument command queue
///
/// Any number of submitters push commands; exactly one book worker pops
/// them. The arrival order at the queue is the order in which the book
/// sees them. Pushing never blocks: a full queue rejects the command and
/// hands it back so the caller can report backpressure.
pub struct IngressQueue {
	sender: Sender<BookCommand>,
	receiver: Receiver<BookCommand>,
}

impl IngressQueue {
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Separate the submitting end from the worker's end
	pub fn split(self) -> (QueueSender, QueueReceiver) {
		(
			QueueSender {
				sender: self.sender,
			},
			QueueReceiver {
				receiver: self.receiver,
			},
		)
	}
}

/// Submitting end, cloned into every caller of the engine
#[derive(Clone)]
pub struct QueueSender {
	sender: Sender<BookCommand>,
}

impl QueueSender {
	/// Push a command without waiting
	///
	/// On failure the command comes back inside the error untouched.
	pub fn try_enqueue(&self, cmd: BookCommand) -> Result<(), EnqueueError> {
		self.sender.try_send(cmd).map_err(|e| match e {
			TrySendError::Full(cmd) => EnqueueError::Full(cmd),
			TrySendError::Disconnected(cmd) => EnqueueError::Disconnected(cmd),
		})
	}

	/// Commands waiting for the worker
	pub fn len(&self) -> usize {
		self.sender.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sender.is_empty()
	}
}

/// Worker end; owned by exactly one book worker
pub struct QueueReceiver {
	receiver: Receiver<BookCommand>,
}

impl QueueReceiver {
	/// Wait for the next command
	///
	/// `None` once every sender is gone and nothing is left queued.
	pub fn recv(&self) -> Option<BookCommand> {
		self.receiver.recv().ok()
	}
}

/// A command the queue refused
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
	#[error("ingress queue is full")]
	Full(BookCommand),
	#[error("book worker has stopped")]
	Disconnected(BookCommand),
}

impl EnqueueError {
	pub fn into_command(self) -> BookCommand {
		match self {
			EnqueueError::Full(cmd) | EnqueueError::Disconnected(cmd) => cmd,
		}
	}
}
