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
use loadpulse_util::status_messages::{
    ClientStatusRecord, ClientStatusType, EntityType, LoadClient,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

#[test]
fn status_document_wire_shape() {
    let record = ClientStatusRecord {
        id: "status-1".to_string(),
        partition_key: "ClientStatus".to_string(),
        entity_type: EntityType::ClientStatus,
        last_updated: at(1700000000),
        state_duration: 42,
        status: ClientStatusType::Testing,
        message: "Executing load test".to_string(),
        load_client: LoadClient {
            id: "client-1".to_string(),
            version: "0.1.0".to_string(),
            region: "Central".to_string(),
            zone: "az-central-us".to_string(),
            prometheus: true,
            startup_args: "--delay-start 5".to_string(),
            start_time: at(1699999000),
        },
    };

    let document = serde_json::to_value(&record).unwrap();
    assert_eq!(
        document,
        json!({
            "id": "status-1",
            "partitionKey": "ClientStatus",
            "entityType": "ClientStatus",
            "lastUpdated": "2023-11-14T22:13:20Z",
            "stateDuration": 42,
            "status": "Testing",
            "message": "Executing load test",
            "loadClient": {
                "id": "client-1",
                "version": "0.1.0",
                "region": "Central",
                "zone": "az-central-us",
                "prometheus": true,
                "startupArgs": "--delay-start 5",
                "startTime": "2023-11-14T21:56:40Z",
            },
        })
    );

    let decoded: ClientStatusRecord = serde_json::from_value(document).unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn new_records_start_in_starting_state() {
    let load_client = LoadClient {
        id: "client-1".to_string(),
        version: "0.1.0".to_string(),
        region: "Central".to_string(),
        zone: "az-central-us".to_string(),
        prometheus: false,
        startup_args: String::new(),
        start_time: at(100),
    };
    let record = ClientStatusRecord::new(load_client, at(100));

    assert_eq!(record.status, ClientStatusType::Starting);
    assert_eq!(record.entity_type, EntityType::ClientStatus);
    assert_eq!(record.partition_key, "ClientStatus");
    assert_eq!(record.state_duration, 0);
    assert_eq!(record.last_updated, at(100));
    assert!(!record.id.is_empty());
}

#[test]
fn unknown_entity_classes_classify_as_unassigned() {
    assert_eq!(
        EntityType::from_name("SomeFutureClass"),
        EntityType::Unassigned
    );
    assert_eq!(EntityType::from_name("TestRun"), EntityType::TestRun);
    assert_eq!(
        EntityType::from_name("ClientStatus"),
        EntityType::ClientStatus
    );
}
