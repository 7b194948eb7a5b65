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

use aeromatch_sdk::types::{Order, OrderId};
use tokio::sync::oneshot;

use crate::types::{MatchingError, SubmitReport};

/// Commands processed by a book worker
///
/// These messages are the only way to mutate a registered book. The worker
/// applies them one at a time in arrival order, which is what makes the
/// fill sequence of an instrument deterministic.
#[derive(Debug)]
pub enum BookCommand {
	/// Match an order and reply with the outcome
	Submit {
		order: Order,
		respond_to: oneshot::Sender<Result<SubmitReport, MatchingError>>,
	},

	/// Remove a resting order and reply with it
	Cancel {
		order_id: OrderId,
		respond_to: oneshot::Sender<Result<Order, MatchingError>>,
	},
}

impl BookCommand {
	pub fn order_id(&self) -> OrderId {
		match self {
			BookCommand::Submit { order, .. } => order.id,
			BookCommand::Cancel { order_id, .. } => *order_id,
		}
	}
}
