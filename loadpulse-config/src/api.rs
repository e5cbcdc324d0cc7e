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

use serde::Deserialize;

use crate::serde_utils::convert_numeric_with_shellexpand;

/// Configuration of the backend consumer that projects worker statuses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Seconds of silence after which a worker is reported offline. Must
    /// exceed the worker heartbeat interval by a comfortable margin so one
    /// missed heartbeat does not flip a worker to offline.
    ///
    /// Default: 60
    #[serde(default, deserialize_with = "convert_numeric_with_shellexpand")]
    pub client_status_expiry_s: u64,
}
