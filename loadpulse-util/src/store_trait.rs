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

use async_trait::async_trait;
use loadpulse_error::Error;

use crate::status_messages::ClientStatusRecord;

/// Durable write side of the status store. Upserts need not be idempotent on
/// the store side; duplicate writes of the same record are tolerated by every
/// downstream consumer.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn upsert_status(&self, record: &ClientStatusRecord) -> Result<(), Error>;
}

/// One lease over the store's change feed.
///
/// Delivery is at-least-once: batches are redelivered from the last
/// checkpoint after a consumer restart, so callers must only `checkpoint`
/// after fully processing the batch, and must apply documents idempotently.
/// Within a lease, documents sharing a partition key arrive in write order;
/// no ordering holds across partitions.
#[async_trait]
pub trait ChangeFeedLease: Send {
    /// Next batch of raw documents, or `None` once the feed has ended.
    /// Documents of every entity class are interleaved; filtering is the
    /// consumer's job.
    async fn next_batch(&mut self) -> Result<Option<Vec<serde_json::Value>>, Error>;

    /// Acknowledges everything delivered so far as durably processed.
    async fn checkpoint(&mut self) -> Result<(), Error>;
}
