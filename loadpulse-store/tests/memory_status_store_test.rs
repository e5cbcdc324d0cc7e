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

use chrono::{DateTime, Utc};
use loadpulse_error::Code;
use loadpulse_macro::loadpulse_test;
use loadpulse_store::memory_status_store::MemoryStatusStore;
use loadpulse_util::status_messages::{
    ClientStatusRecord, ClientStatusType, EntityType, LoadClient,
};
use loadpulse_util::store_trait::{ChangeFeedLease, StatusSink};
use pretty_assertions::assert_eq;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

fn make_record(id: &str, status: ClientStatusType, secs: i64) -> ClientStatusRecord {
    ClientStatusRecord {
        id: id.to_string(),
        partition_key: "ClientStatus".to_string(),
        entity_type: EntityType::ClientStatus,
        last_updated: at(secs),
        state_duration: 0,
        status,
        message: String::new(),
        load_client: LoadClient {
            id: format!("load-client-{id}"),
            version: "0.1.0".to_string(),
            region: "Central".to_string(),
            zone: "az-central-us".to_string(),
            prometheus: false,
            startup_args: "--delay-start 0".to_string(),
            start_time: at(0),
        },
    }
}

#[loadpulse_test]
async fn feed_delivers_documents_in_write_order() {
    let store = MemoryStatusStore::new();

    store
        .upsert_status(&make_record("a", ClientStatusType::Starting, 100))
        .await
        .unwrap();
    store
        .upsert_status(&make_record("a", ClientStatusType::Ready, 105))
        .await
        .unwrap();

    let mut lease = store.lease();
    let batch = lease.next_batch().await.unwrap().unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0]["status"], "Starting");
    assert_eq!(batch[1]["status"], "Ready");
}

#[loadpulse_test]
async fn unacknowledged_documents_are_redelivered_to_the_next_lease() {
    let store = MemoryStatusStore::new();

    store
        .upsert_status(&make_record("a", ClientStatusType::Ready, 100))
        .await
        .unwrap();

    // First lease consumes the batch but dies before checkpointing.
    {
        let mut lease = store.lease();
        let batch = lease.next_batch().await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
    }

    // A replacement lease sees the same documents again.
    let mut lease = store.lease();
    let batch = lease.next_batch().await.unwrap().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0]["status"], "Ready");
}

#[loadpulse_test]
async fn checkpointed_documents_are_not_redelivered() {
    let store = MemoryStatusStore::new();

    store
        .upsert_status(&make_record("a", ClientStatusType::Ready, 100))
        .await
        .unwrap();

    {
        let mut lease = store.lease();
        lease.next_batch().await.unwrap().unwrap();
        lease.checkpoint().await.unwrap();
    }
    assert_eq!(store.checkpoint(), 1);

    store
        .upsert_status(&make_record("a", ClientStatusType::Testing, 105))
        .await
        .unwrap();

    let mut lease = store.lease();
    let batch = lease.next_batch().await.unwrap().unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0]["status"], "Testing");
}

#[loadpulse_test]
async fn closed_store_ends_the_feed_after_draining() {
    let store = MemoryStatusStore::new();

    store
        .upsert_status(&make_record("a", ClientStatusType::Ready, 100))
        .await
        .unwrap();
    store.close();

    let mut lease = store.lease();
    assert!(lease.next_batch().await.unwrap().is_some());
    assert!(lease.next_batch().await.unwrap().is_none());
}

#[loadpulse_test]
async fn writes_to_a_closed_store_are_rejected() {
    let store = MemoryStatusStore::new();
    store.close();

    let err = store
        .upsert_status(&make_record("a", ClientStatusType::Ready, 100))
        .await
        .unwrap_err();
    assert_eq!(err.code, Code::FailedPrecondition);
}

#[loadpulse_test]
async fn feed_wakes_a_waiting_lease_on_append() {
    let store = MemoryStatusStore::new();
    let mut lease = store.lease();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .upsert_status(&make_record("a", ClientStatusType::Ready, 100))
                .await
                .unwrap();
        })
    };

    let batch = lease.next_batch().await.unwrap().unwrap();
    assert_eq!(batch.len(), 1);
    writer.await.unwrap();
}
