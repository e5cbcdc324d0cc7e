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

use core::marker::PhantomData;
use core::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loadpulse_util::instant_wrapper::InstantWrapper;
use loadpulse_util::spawn;
use loadpulse_util::status_messages::ClientStatusType;
use loadpulse_util::task::JoinHandleDropGuard;
use tokio::sync::watch;

/// Interval between heartbeat re-emissions when the config leaves it unset.
pub const DEFAULT_STATUS_UPDATE_INTERVAL: Duration = Duration::from_millis(5000);

/// One status announcement as seen by bus subscribers. Heartbeat re-emissions
/// carry the original status and message with `last_updated` refreshed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEvent {
    pub status: ClientStatusType,
    pub message: String,
    pub last_updated: DateTime<Utc>,
}

#[async_trait]
pub trait StatusEventSubscriber: Send + Sync {
    async fn on_status_update(&self, event: StatusEvent);
}

/// Ordered status timeline of one worker process.
///
/// `publish` records the call as the last known event and a dedicated pump
/// task delivers it to the subscriber, so delivery is always serialized no
/// matter which thread publishes. While no new status arrives, the pump
/// re-delivers the last known event every `interval` with its timestamp
/// refreshed to now, turning silence into an explicit liveness signal.
///
/// Rapid consecutive publishes may collapse: the subscriber is guaranteed to
/// observe the most recent event, never an older one.
///
/// Dropping the bus stops the heartbeat and releases the last event.
pub struct StatusEventBus<I: InstantWrapper> {
    tx: watch::Sender<Option<StatusEvent>>,
    _pump: JoinHandleDropGuard<()>,
    _instant: PhantomData<I>,
}

impl<I: InstantWrapper> core::fmt::Debug for StatusEventBus<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StatusEventBus")
            .field("last_event", &*self.tx.borrow())
            .finish_non_exhaustive()
    }
}

impl<I: InstantWrapper> StatusEventBus<I> {
    pub fn new(interval: Duration, subscriber: Arc<dyn StatusEventSubscriber>) -> Self {
        let (tx, rx) = watch::channel(None);
        let pump = spawn!(
            "status_event_pump",
            Self::pump(rx, interval, subscriber)
        );
        Self {
            tx,
            _pump: pump,
            _instant: PhantomData,
        }
    }

    /// Publishes a status change, timestamped now, and re-arms the heartbeat.
    pub fn publish(&self, status: ClientStatusType, message: impl Into<String>) {
        let event = StatusEvent {
            status,
            message: message.into(),
            last_updated: I::from_secs(0).utc_now(),
        };
        // The receiver lives in the pump task; a send error means the pump
        // exited, which only happens when the bus is being torn down.
        drop(self.tx.send(Some(event)));
    }

    async fn pump(
        mut rx: watch::Receiver<Option<StatusEvent>>,
        interval: Duration,
        subscriber: Arc<dyn StatusEventSubscriber>,
    ) {
        let mut last_event: Option<StatusEvent> = None;
        loop {
            // The sleep is re-created on every iteration, so a delivery of
            // either kind pushes the next heartbeat a full interval out.
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let Some(event) = rx.borrow_and_update().clone() else {
                        continue;
                    };
                    last_event = Some(event.clone());
                    subscriber.on_status_update(event).await;
                }
                () = I::from_secs(0).sleep(interval) => {
                    let Some(event) = &mut last_event else {
                        continue;
                    };
                    event.last_updated = I::from_secs(0).utc_now();
                    subscriber.on_status_update(event.clone()).await;
                }
            }
        }
    }
}
