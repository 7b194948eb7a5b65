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

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{OrderBookSnapshot, SnapshotError};

/// Metadata about a stored snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
	pub instrument: String,
	pub sequence: u64,
	/// Capture time, nanoseconds since the unix epoch
	pub timestamp: u64,
	/// Size of the encoded snapshot in bytes
	pub size_bytes: usize,
}

/// Encoded snapshot with its metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
	pub metadata: SnapshotMetadata,
	pub data: Vec<u8>,
}

impl StoredSnapshot {
	pub fn encode(snapshot: &OrderBookSnapshot) -> Result<Self, SnapshotError> {
		let data = snapshot.encode()?;
		Ok(Self {
			metadata: SnapshotMetadata {
				instrument: snapshot.instrument.clone(),
				sequence: snapshot.sequence,
				timestamp: snapshot.timestamp,
				size_bytes: data.len(),
			},
			data,
		})
	}

	pub fn decode(&self) -> Result<OrderBookSnapshot, SnapshotError> {
		OrderBookSnapshot::decode(&self.data)
	}
}

/// Snapshot Storage trait - sink for published snapshots
///
/// The snapshot manager hands every snapshot it publishes to the sink and
/// trims each instrument's history afterwards. Implementations keep
/// snapshots per instrument, ordered by sequence.
///
/// This abstraction allows different backing stores:
/// - In-memory (testing, single-process deployments)
/// - Local filesystem
/// - Object storage or a database
pub trait SnapshotStorage: Send {
	/// Save a snapshot
	fn save(&mut self, snapshot: &OrderBookSnapshot) -> Result<(), SnapshotError>;

	/// Load the latest snapshot of an instrument
	fn load_latest(&self, instrument: &str) -> Result<OrderBookSnapshot, SnapshotError>;

	/// List the stored snapshots of an instrument, oldest first
	fn list(&self, instrument: &str) -> Vec<SnapshotMetadata>;

	/// Keep only the newest `keep` snapshots of an instrument
	///
	/// Returns how many were deleted.
	fn cleanup(&mut self, instrument: &str, keep: usize) -> Result<usize, SnapshotError>;
}

/// In-memory snapshot storage
///
/// Holds encoded snapshots, so loading exercises the same decode path a
/// persistent store would.
#[derive(Debug, Default)]
pub struct MemorySnapshotStorage {
	snapshots: HashMap<String, Vec<StoredSnapshot>>,
}

impl MemorySnapshotStorage {
	pub fn new() -> Self {
		Self::default()
	}
}

impl SnapshotStorage for MemorySnapshotStorage {
	fn save(&mut self, snapshot: &OrderBookSnapshot) -> Result<(), SnapshotError> {
		let stored = StoredSnapshot::encode(snapshot)?;
		let history = self
			.snapshots
			.entry(snapshot.instrument.clone())
			.or_default();
		history.push(stored);

		// Keep snapshots sorted by sequence number
		history.sort_by_key(|s| s.metadata.sequence);
		Ok(())
	}

	fn load_latest(&self, instrument: &str) -> Result<OrderBookSnapshot, SnapshotError> {
		self.snapshots
			.get(instrument)
			.and_then(|history| history.last())
			.ok_or_else(|| SnapshotError::NotFound(instrument.to_string()))?
			.decode()
	}

	fn list(&self, instrument: &str) -> Vec<SnapshotMetadata> {
		self.snapshots
			.get(instrument)
			.map(|history| history.iter().map(|s| s.metadata.clone()).collect())
			.unwrap_or_default()
	}

	fn cleanup(&mut self, instrument: &str, keep: usize) -> Result<usize, SnapshotError> {
		let Some(history) = self.snapshots.get_mut(instrument) else {
			return Ok(0);
		};
		let excess = history.len().saturating_sub(keep);
		history.drain(..excess);
		Ok(excess)
	}
}
