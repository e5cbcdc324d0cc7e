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
use std::sync::Arc;

use chrono::{DateTime, Utc};
use loadpulse_config::worker::WorkerConfig;
use loadpulse_error::{Code, Error, make_err};
use loadpulse_util::instant_wrapper::InstantWrapper;
use loadpulse_util::shutdown::ShutdownSignal;
use loadpulse_util::status_messages::{ClientStatusType, LoadClient};
use loadpulse_util::store_trait::StatusSink;
use tracing::{error, info};
use uuid::Uuid;

use crate::status_event_bus::{DEFAULT_STATUS_UPDATE_INTERVAL, StatusEventBus};
use crate::status_publisher::StatusPublisher;

const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

// Note: If these defaults change the documentation in
// `loadpulse-config/src/worker.rs` must also be updated.
const DEFAULT_REGION: &str = "Central";
const DEFAULT_ZONE: &str = "az-central-us";

fn make_load_client(config: &WorkerConfig, start_time: DateTime<Utc>) -> LoadClient {
    let region = config
        .region
        .as_deref()
        .filter(|region| !region.trim().is_empty())
        .unwrap_or(DEFAULT_REGION)
        .to_string();
    let zone = config
        .zone
        .as_deref()
        .filter(|zone| !zone.trim().is_empty())
        .unwrap_or(DEFAULT_ZONE)
        .to_string();
    let startup_args = format!(
        "--delay-start {} --region {region} --zone {zone}",
        config.delay_start_s
    );
    LoadClient {
        id: Uuid::new_v4().to_string(),
        version: CLIENT_VERSION.to_string(),
        region,
        zone,
        prometheus: config.prometheus,
        startup_args,
        start_time,
    }
}

/// Ties one worker's status pipeline together: builds the worker descriptor
/// from config, owns the event bus and the publisher, and walks the
/// conventional lifecycle until shutdown is requested.
pub struct LoadWorkerService<I: InstantWrapper> {
    publisher: Arc<StatusPublisher>,
    bus: StatusEventBus<I>,
    shutdown: ShutdownSignal,
    delay_start: Duration,
}

impl<I: InstantWrapper> core::fmt::Debug for LoadWorkerService<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoadWorkerService")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

impl<I: InstantWrapper> LoadWorkerService<I> {
    pub fn new(config: &WorkerConfig, sink: Arc<dyn StatusSink>, shutdown: ShutdownSignal) -> Self {
        let start_time = I::from_secs(0).utc_now();
        let load_client = make_load_client(config, start_time);
        let publisher = Arc::new(StatusPublisher::new(
            load_client,
            start_time,
            sink,
            shutdown.clone(),
        ));
        let interval = if config.status_update_interval_ms == 0 {
            DEFAULT_STATUS_UPDATE_INTERVAL
        } else {
            Duration::from_millis(config.status_update_interval_ms)
        };
        let bus = StatusEventBus::new(interval, publisher.clone());
        Self {
            publisher,
            bus,
            shutdown,
            delay_start: Duration::from_secs(config.delay_start_s),
        }
    }

    /// The bus carrying this worker's status timeline. Test-execution code
    /// publishes `Testing`/`Ready` transitions through it.
    pub const fn bus(&self) -> &StatusEventBus<I> {
        &self.bus
    }

    pub async fn client_status_id(&self) -> String {
        self.publisher.client_status_id().await
    }

    /// Runs the worker lifecycle: report `Starting`, wait out the configured
    /// startup delay, report `Ready`, then hold until shutdown is requested
    /// and report `Terminating`. A fatal shutdown (repeated status
    /// persistence failure) aborts the run with an error.
    pub async fn run(self) -> Result<(), Error> {
        let Self {
            publisher,
            bus,
            shutdown,
            delay_start,
        } = self;

        bus.publish(ClientStatusType::Starting, "Load client starting");
        if !delay_start.is_zero() {
            I::from_secs(0).sleep(delay_start).await;
        }
        bus.publish(
            ClientStatusType::Ready,
            "Load client ready to receive test runs",
        );

        let mut listener = shutdown.subscribe();
        let reason = listener.requested().await;
        info!(
            fatal = reason.fatal,
            message = %reason.message,
            "Worker shutting down"
        );

        bus.publish(ClientStatusType::Terminating, reason.message.clone());
        // Stop heartbeats before the terminal write so nothing re-publishes a
        // stale status after it.
        drop(bus);

        if let Err(err) = publisher
            .write_terminal(&reason.message, I::from_secs(0).utc_now())
            .await
        {
            // Best effort: the worker is going away either way.
            error!(?err, "Failed to persist terminal client status");
        }

        if reason.fatal {
            return Err(make_err!(
                Code::Unavailable,
                "Load test run aborted : {}",
                reason.message
            ));
        }
        Ok(())
    }
}
