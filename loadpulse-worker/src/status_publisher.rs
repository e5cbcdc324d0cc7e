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

use std::sync::Arc;

use async_lock::Mutex;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loadpulse_error::{Error, ResultExt};
use loadpulse_util::shutdown::ShutdownSignal;
use loadpulse_util::status_messages::{ClientStatusRecord, ClientStatusType, LoadClient};
use loadpulse_util::store_trait::StatusSink;
use tracing::warn;

use crate::status_event_bus::{StatusEvent, StatusEventSubscriber};

/// Consecutive persistence failures tolerated before the whole worker is
/// aborted. There is no retry within one attempt; the heartbeat interval is
/// the retry cadence.
pub const MAX_STATUS_UPDATE_ATTEMPTS: u32 = 3;

struct PublisherState {
    record: ClientStatusRecord,
    /// When the worker last entered a different status; `state_duration` is
    /// measured from here.
    last_status_change: DateTime<Utc>,
    consecutive_failures: u32,
}

fn apply_event(state: &mut PublisherState, event: &StatusEvent) {
    if state.record.status != event.status {
        state.last_status_change = event.last_updated;
    }
    state.record.status = event.status;
    state.record.message.clone_from(&event.message);
    state.record.last_updated = event.last_updated;
    state.record.state_duration = (event.last_updated - state.last_status_change)
        .num_seconds()
        .max(0);
}

/// Sole owner of this worker's mutable status record. Subscribes to the
/// status event bus and turns every delivered event into one durable write.
/// Transient write failures are absorbed until `MAX_STATUS_UPDATE_ATTEMPTS`
/// consecutive ones, at which point the shared shutdown signal is tripped:
/// a worker whose status cannot be persisted must stop generating load
/// rather than run on invisibly.
pub struct StatusPublisher {
    sink: Arc<dyn StatusSink>,
    shutdown: ShutdownSignal,
    state: Mutex<PublisherState>,
}

impl core::fmt::Debug for StatusPublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StatusPublisher").finish_non_exhaustive()
    }
}

impl StatusPublisher {
    pub fn new(
        load_client: LoadClient,
        now: DateTime<Utc>,
        sink: Arc<dyn StatusSink>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            sink,
            shutdown,
            state: Mutex::new(PublisherState {
                record: ClientStatusRecord::new(load_client, now),
                last_status_change: now,
                consecutive_failures: 0,
            }),
        }
    }

    pub async fn client_status_id(&self) -> String {
        self.state.lock().await.record.id.clone()
    }

    /// Current state of the owned record.
    pub async fn snapshot(&self) -> ClientStatusRecord {
        self.state.lock().await.record.clone()
    }

    /// Direct write of the terminal status, for use after the event bus has
    /// been torn down so no heartbeat can overwrite it.
    pub async fn write_terminal(&self, message: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let mut state = self.state.lock().await;
        apply_event(
            &mut state,
            &StatusEvent {
                status: ClientStatusType::Terminating,
                message: message.to_string(),
                last_updated: now,
            },
        );
        let record = state.record.clone();
        self.sink
            .upsert_status(&record)
            .await
            .err_tip(|| "Failed to persist terminal client status")
    }
}

#[async_trait]
impl StatusEventSubscriber for StatusPublisher {
    async fn on_status_update(&self, event: StatusEvent) {
        let mut state = self.state.lock().await;
        apply_event(&mut state, &event);
        let record = state.record.clone();
        match self.sink.upsert_status(&record).await {
            Ok(()) => state.consecutive_failures = 0,
            Err(err) => {
                state.consecutive_failures += 1;
                warn!(
                    ?err,
                    failures = state.consecutive_failures,
                    "Failed to persist client status"
                );
                if state.consecutive_failures == MAX_STATUS_UPDATE_ATTEMPTS {
                    self.shutdown.fatal(format!(
                        "Unable to update client status after {} attempts, aborting worker",
                        state.consecutive_failures
                    ));
                }
            }
        }
    }
}
