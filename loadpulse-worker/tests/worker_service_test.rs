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

use loadpulse_config::worker::WorkerConfig;
use loadpulse_macro::loadpulse_test;
use loadpulse_util::instant_wrapper::MockInstantWrapped;
use loadpulse_util::shutdown::ShutdownSignal;
use loadpulse_util::status_messages::ClientStatusType;
use loadpulse_worker::worker_service::LoadWorkerService;
use mock_instant::thread_local::MockClock;
use pretty_assertions::assert_eq;
use tokio::task::yield_now;
use utils::mock_status_sink::MockStatusSink;

mod utils {
    pub(crate) mod mock_status_sink;
}

fn make_config() -> WorkerConfig {
    WorkerConfig {
        name: "test-worker".to_string(),
        region: Some("WestEurope".to_string()),
        zone: Some("az-west-eu-1".to_string()),
        prometheus: false,
        delay_start_s: 0,
        status_update_interval_ms: 5000,
    }
}

async fn settle() {
    for _ in 0..50 {
        yield_now().await;
    }
}

#[loadpulse_test]
async fn graceful_shutdown_reports_terminating() {
    let sink = MockStatusSink::new();
    let shutdown = ShutdownSignal::new();
    let service =
        LoadWorkerService::<MockInstantWrapped>::new(&make_config(), sink.clone(), shutdown.clone());

    let run = tokio::spawn(service.run());

    // Wait for the worker to come up and persist Ready.
    for _ in 0..100 {
        if sink
            .writes()
            .iter()
            .any(|record| record.status == ClientStatusType::Ready)
        {
            break;
        }
        yield_now().await;
    }

    shutdown.graceful("Operator requested shutdown");
    let result = run.await.unwrap();
    assert_eq!(result, Ok(()));

    let writes = sink.writes();
    let last = writes.last().unwrap();
    assert_eq!(last.status, ClientStatusType::Terminating);
    assert_eq!(last.message, "Operator requested shutdown");
    assert_eq!(last.load_client.region, "WestEurope");
    assert_eq!(last.load_client.zone, "az-west-eu-1");
}

#[loadpulse_test]
async fn heartbeats_keep_the_status_fresh_without_publishes() {
    let sink = MockStatusSink::new();
    let shutdown = ShutdownSignal::new();
    let service =
        LoadWorkerService::<MockInstantWrapped>::new(&make_config(), sink.clone(), shutdown.clone());

    let run = tokio::spawn(service.run());
    settle().await;

    let before = sink.writes().len();
    assert!(before >= 1, "Startup must have persisted at least one status");

    MockClock::advance(Duration::from_millis(5000));
    settle().await;
    MockClock::advance(Duration::from_millis(5000));
    settle().await;

    let writes = sink.writes();
    assert_eq!(writes.len(), before + 2);
    let first_heartbeat = &writes[before];
    let second_heartbeat = &writes[before + 1];
    assert_eq!(first_heartbeat.status, ClientStatusType::Ready);
    assert_eq!(second_heartbeat.status, ClientStatusType::Ready);
    assert_eq!(
        second_heartbeat.last_updated,
        first_heartbeat.last_updated + chrono::Duration::milliseconds(5000)
    );

    shutdown.graceful("Done");
    run.await.unwrap().unwrap();
}

#[loadpulse_test]
async fn repeated_persistence_failures_abort_the_run() {
    let sink = MockStatusSink::new();
    let shutdown = ShutdownSignal::new();
    let service =
        LoadWorkerService::<MockInstantWrapped>::new(&make_config(), sink.clone(), shutdown.clone());

    // Every write fails, including the terminal one.
    sink.script_failures(100);

    let run = tokio::spawn(service.run());

    // Heartbeats provide the retry cadence; drive the clock until the
    // publisher gives up.
    for _ in 0..100 {
        if shutdown.is_requested() {
            break;
        }
        MockClock::advance(Duration::from_millis(5000));
        settle().await;
    }
    assert!(shutdown.is_requested());

    let result = run.await.unwrap();
    let err = result.unwrap_err();
    assert!(
        err.message_string().contains("aborted"),
        "{}",
        err.message_string()
    );
    assert!(sink.writes().is_empty());
}
