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

use core::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle phase of a load worker. The conventional order is
/// Starting -> Ready -> (Testing <-> Ready)* -> Terminating, but no component
/// enforces it; the persisted timeline is whatever the worker reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientStatusType {
    Starting,
    Ready,
    Testing,
    Terminating,
}

impl ClientStatusType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Ready => "Ready",
            Self::Testing => "Testing",
            Self::Terminating => "Terminating",
        }
    }
}

impl core::fmt::Display for ClientStatusType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator identifying which logical record type a stored document
/// represents. Documents of classes this service does not track decode to
/// `Unassigned` and are skipped by the consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Client,
    ClientStatus,
    LoadTestConfig,
    TestRun,
    LoadClient,
    Unassigned,
}

impl EntityType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::ClientStatus => "ClientStatus",
            Self::LoadTestConfig => "LoadTestConfig",
            Self::TestRun => "TestRun",
            Self::LoadClient => "LoadClient",
            Self::Unassigned => "Unassigned",
        }
    }

    /// Classifies a discriminator string. Classes this service has never
    /// heard of map to `Unassigned` rather than an error, since the shared
    /// store carries documents owned by other services too.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Client" => Self::Client,
            "ClientStatus" => Self::ClientStatus,
            "LoadTestConfig" => Self::LoadTestConfig,
            "TestRun" => Self::TestRun,
            "LoadClient" => Self::LoadClient,
            _ => Self::Unassigned,
        }
    }
}

/// Immutable descriptor of one load worker process, reported alongside every
/// status update so operators can tell where a worker runs and how it was
/// started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadClient {
    pub id: String,
    pub version: String,
    pub region: String,
    pub zone: String,
    pub prometheus: bool,
    pub startup_args: String,
    pub start_time: DateTime<Utc>,
}

/// One worker's latest reported lifecycle state, in the exact shape it is
/// persisted and replayed through the change feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatusRecord {
    /// Stable identifier of this status record (and therefore of the worker)
    /// for the worker process lifetime.
    pub id: String,

    /// All status records share one partition so a single change-feed lease
    /// observes them in order.
    pub partition_key: String,

    pub entity_type: EntityType,

    /// When this status was reported. Per worker, consumers never apply a
    /// record whose timestamp does not advance past the one already seen.
    pub last_updated: DateTime<Utc>,

    /// Seconds spent in the current status.
    pub state_duration: i64,

    pub status: ClientStatusType,

    pub message: String,

    pub load_client: LoadClient,
}

impl ClientStatusRecord {
    /// A fresh `Starting` record for a newly launched worker.
    pub fn new(load_client: LoadClient, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            partition_key: EntityType::ClientStatus.as_str().to_string(),
            entity_type: EntityType::ClientStatus,
            last_updated: now,
            state_duration: 0,
            status: ClientStatusType::Starting,
            message: String::new(),
            load_client,
        }
    }

    /// Whether this record has gone silent for longer than `expiry`. The
    /// expiry must exceed the heartbeat interval so a single missed send does
    /// not flip a live worker to offline.
    pub fn is_stale(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        let expiry_s = i64::try_from(expiry.as_secs()).unwrap_or(i64::MAX);
        (now - self.last_updated).num_seconds() > expiry_s
    }
}
