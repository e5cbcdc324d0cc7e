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

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use loadpulse_error::{Code, Error, make_err};
use loadpulse_util::status_messages::ClientStatusRecord;
use loadpulse_util::store_trait::StatusSink;
use parking_lot::Mutex;

/// Scripted status sink: write attempts consume scripted results in order and
/// fall back to success once the script runs out. Only successful writes are
/// recorded.
#[derive(Debug, Default)]
pub struct MockStatusSink {
    scripted_results: Mutex<VecDeque<Result<(), Error>>>,
    writes: Mutex<Vec<ClientStatusRecord>>,
}

impl MockStatusSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_result(&self, result: Result<(), Error>) {
        self.scripted_results.lock().push_back(result);
    }

    pub fn script_failures(&self, count: usize) {
        for _ in 0..count {
            self.script_result(Err(make_err!(
                Code::Unavailable,
                "Simulated status write failure"
            )));
        }
    }

    pub fn writes(&self) -> Vec<ClientStatusRecord> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl StatusSink for MockStatusSink {
    async fn upsert_status(&self, record: &ClientStatusRecord) -> Result<(), Error> {
        let result = self
            .scripted_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.writes.lock().push(record.clone());
        }
        result
    }
}
