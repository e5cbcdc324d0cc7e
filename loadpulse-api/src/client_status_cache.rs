// Copyright 2024 The LoadPulse Authors. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use loadpulse_util::status_messages::ClientStatusRecord;
use parking_lot::RwLock;

/// Seconds of silence after which a worker is reported offline when the
/// config leaves it unset.
pub const DEFAULT_CLIENT_STATUS_EXPIRY_S: u64 = 60;

/// Latest known status per worker, shared between the change-feed leases
/// that update it and the query side that reads it.
///
/// `apply` is idempotent and monotone on `last_updated`, so leases may
/// redeliver documents in any interleaving without corrupting the
/// projection. Entries are never removed: a `Terminating` record stays
/// visible so operators can see the terminal state.
#[derive(Debug, Default)]
pub struct ClientStatusCache {
    clients: RwLock<HashMap<String, ClientStatusRecord>>,
}

impl ClientStatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one record. Inserts if the worker is unknown; replaces only if
    /// the record is strictly newer than the cached one. Returns whether the
    /// cache changed (stale and duplicate records return `false`).
    pub fn apply(&self, record: ClientStatusRecord) -> bool {
        let mut clients = self.clients.write();
        match clients.entry(record.id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(record);
                true
            }
            Entry::Occupied(mut entry) => {
                if record.last_updated > entry.get().last_updated {
                    entry.insert(record);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn get(&self, client_status_id: &str) -> Option<ClientStatusRecord> {
        self.clients.read().get(client_status_id).cloned()
    }

    /// Snapshot of every known worker, ordered by id for stable output.
    pub fn list(&self) -> Vec<ClientStatusRecord> {
        let mut records: Vec<_> = self.clients.read().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}
