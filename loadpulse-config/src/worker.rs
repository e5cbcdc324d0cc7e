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

use crate::serde_utils::{
    convert_numeric_with_shellexpand, convert_optional_string_with_shellexpand,
    convert_string_with_shellexpand,
};

/// Configuration of one load worker process.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Friendly name of this worker, used for logging only.
    #[serde(default, deserialize_with = "convert_string_with_shellexpand")]
    pub name: String,

    /// Deployment region reported in the worker descriptor.
    ///
    /// Default: "Central"
    #[serde(default, deserialize_with = "convert_optional_string_with_shellexpand")]
    pub region: Option<String>,

    /// Deployment zone reported in the worker descriptor.
    ///
    /// Default: "az-central-us"
    #[serde(default, deserialize_with = "convert_optional_string_with_shellexpand")]
    pub zone: Option<String>,

    /// Whether this worker exposes a prometheus scrape endpoint. Carried in
    /// the worker descriptor so operators can tell scrapeable workers apart.
    #[serde(default)]
    pub prometheus: bool,

    /// Seconds to wait after startup before reporting `Ready`.
    #[serde(default, deserialize_with = "convert_numeric_with_shellexpand")]
    pub delay_start_s: u64,

    /// Interval between status heartbeats in milliseconds. Every interval the
    /// last known status is re-published with a refreshed timestamp so
    /// downstream consumers can tell "idle" apart from "dead".
    ///
    /// Default: 5000 (5 seconds)
    #[serde(default, deserialize_with = "convert_numeric_with_shellexpand")]
    pub status_update_interval_ms: u64,
}
