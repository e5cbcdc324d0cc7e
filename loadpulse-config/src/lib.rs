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

pub mod api;
pub mod serde_utils;
pub mod worker;

use serde::Deserialize;

/// Top level configuration consumed by the `loadpulse` binary.
///
/// Both halves of the pipeline are optional so a deployment can run the
/// worker and the backend consumer in separate processes from the same
/// configuration schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadPulseConfig {
    /// Worker (load client) side configuration.
    pub worker: Option<worker::WorkerConfig>,

    /// Backend (API) side configuration.
    pub api: Option<api::ApiConfig>,
}
