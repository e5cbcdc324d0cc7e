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

use async_trait::async_trait;
use loadpulse_error::{Code, Error, make_err};
use loadpulse_util::status_messages::ClientStatusRecord;
use loadpulse_util::store_trait::{ChangeFeedLease, StatusSink};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

/// Maximum documents delivered per change feed batch.
const MAX_BATCH_SIZE: usize = 64;

#[derive(Debug, Default)]
struct StoreInner {
    /// Append-only document log. Upserts of the same record append again, so
    /// the feed naturally carries every intermediate version in write order.
    documents: Vec<Value>,
    /// Index up to which lease progress has been acknowledged.
    checkpoint: usize,
    closed: bool,
}

/// In-memory stand-in for the durable status store and its change feed.
///
/// Writes land on an append-only log; leases created from [`Self::lease`]
/// deliver the log in order starting from the last acknowledged checkpoint,
/// which gives restarted leases the at-least-once redelivery the real store
/// provides.
#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    inner: Mutex<StoreInner>,
    change_notify: Notify,
}

impl MemoryStatusStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends a raw document to the log. Used by tests to interleave
    /// documents of other entity classes the way the shared store does.
    pub fn append_document(&self, document: Value) -> Result<(), Error> {
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(make_err!(
                    Code::FailedPrecondition,
                    "Cannot append to a closed status store"
                ));
            }
            inner.documents.push(document);
        }
        self.change_notify.notify_waiters();
        Ok(())
    }

    /// Ends the feed: leases drain whatever remains and then observe EOF.
    pub fn close(&self) {
        self.inner.lock().closed = true;
        self.change_notify.notify_waiters();
    }

    pub fn document_count(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn checkpoint(&self) -> usize {
        self.inner.lock().checkpoint
    }

    /// A lease over the change feed, resuming from the last checkpoint any
    /// previous lease acknowledged.
    pub fn lease(self: &Arc<Self>) -> MemoryChangeFeedLease {
        let cursor = self.inner.lock().checkpoint;
        MemoryChangeFeedLease {
            store: self.clone(),
            cursor,
        }
    }
}

#[async_trait]
impl StatusSink for MemoryStatusStore {
    async fn upsert_status(&self, record: &ClientStatusRecord) -> Result<(), Error> {
        let document = serde_json::to_value(record)?;
        self.append_document(document)
    }
}

/// Single consumer of the store's log. Not cloneable: within a lease,
/// delivery order is the log order.
#[derive(Debug)]
pub struct MemoryChangeFeedLease {
    store: Arc<MemoryStatusStore>,
    cursor: usize,
}

#[async_trait]
impl ChangeFeedLease for MemoryChangeFeedLease {
    async fn next_batch(&mut self) -> Result<Option<Vec<Value>>, Error> {
        loop {
            let notified = self.store.change_notify.notified();
            tokio::pin!(notified);
            // Register for wakeups before inspecting the log so an append
            // between the check and the await cannot be missed.
            notified.as_mut().enable();
            {
                let inner = self.store.inner.lock();
                if self.cursor < inner.documents.len() {
                    let end = inner.documents.len().min(self.cursor + MAX_BATCH_SIZE);
                    let batch = inner.documents[self.cursor..end].to_vec();
                    self.cursor = end;
                    return Ok(Some(batch));
                }
                if inner.closed {
                    return Ok(None);
                }
            }
            notified.await;
        }
    }

    async fn checkpoint(&mut self) -> Result<(), Error> {
        self.store.inner.lock().checkpoint = self.cursor;
        Ok(())
    }
}
