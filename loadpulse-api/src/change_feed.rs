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

use loadpulse_error::{Error, ResultExt};
use loadpulse_util::status_messages::{ClientStatusRecord, EntityType};
use loadpulse_util::store_trait::ChangeFeedLease;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client_status_cache::ClientStatusCache;

fn entity_type_of(document: &Value) -> EntityType {
    document
        .get("entityType")
        .and_then(Value::as_str)
        .map_or(EntityType::Unassigned, EntityType::from_name)
}

/// Consumes the store's ordered change stream and projects status-class
/// documents into the cache. Each lease is pumped single-threaded with
/// respect to itself; many leases may feed the same cache concurrently.
#[derive(Clone, Debug)]
pub struct ChangeFeedProcessor {
    cache: Arc<ClientStatusCache>,
}

impl ChangeFeedProcessor {
    pub const fn new(cache: Arc<ClientStatusCache>) -> Self {
        Self { cache }
    }

    /// Pumps one lease until its feed ends. Progress is only checkpointed
    /// after the whole batch has been applied to the cache, so a crash
    /// mid-batch redelivers (at-least-once) rather than loses documents.
    pub async fn run_lease<L: ChangeFeedLease>(&self, mut lease: L) -> Result<(), Error> {
        while let Some(batch) = lease
            .next_batch()
            .await
            .err_tip(|| "Failed to receive change feed batch")?
        {
            self.process_batch(&batch);
            lease
                .checkpoint()
                .await
                .err_tip(|| "Failed to checkpoint change feed progress")?;
        }
        Ok(())
    }

    pub fn process_batch(&self, documents: &[Value]) {
        for document in documents {
            self.process_document(document);
        }
    }

    /// A document of a foreign entity class is expected and skipped without
    /// error. A status document that does not decode is logged and skipped so
    /// one bad document cannot stall progress for every other worker.
    fn process_document(&self, document: &Value) {
        match entity_type_of(document) {
            EntityType::ClientStatus => {
                match serde_json::from_value::<ClientStatusRecord>(document.clone()) {
                    Ok(record) => {
                        let client_status_id = record.id.clone();
                        let applied = self.cache.apply(record);
                        debug!(
                            client_status_id = %client_status_id,
                            applied,
                            "Processed client status change"
                        );
                    }
                    Err(err) => {
                        warn!(?err, "Skipping undecodable client status document");
                    }
                }
            }
            entity_type => {
                debug!(?entity_type, "Skipping change of untracked entity type");
            }
        }
    }
}
