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
use std::sync::Arc;
use std::time::SystemTime;

use clap::Parser;
use loadpulse_api::change_feed::ChangeFeedProcessor;
use loadpulse_api::client_status_cache::{ClientStatusCache, DEFAULT_CLIENT_STATUS_EXPIRY_S};
use loadpulse_config::LoadPulseConfig;
use loadpulse_error::{Error, ResultExt};
use loadpulse_store::memory_status_store::MemoryStatusStore;
use loadpulse_util::instant_wrapper::InstantWrapper;
use loadpulse_util::shutdown::ShutdownSignal;
use loadpulse_util::{init_tracing, spawn};
use loadpulse_worker::worker_service::LoadWorkerService;
use mimalloc::MiMalloc;
use tokio::signal;
use tracing::{Level, event, info};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Load testing harness worker with its status propagation pipeline.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Config file to use.
    #[clap(value_parser)]
    config_file: String,
}

fn get_config() -> Result<LoadPulseConfig, Box<dyn std::error::Error>> {
    let args = Args::parse();
    let json_contents = String::from_utf8(
        std::fs::read(&args.config_file)
            .err_tip(|| format!("Could not open config file {}", args.config_file))?,
    )?;
    Ok(serde_json5::from_str(&json_contents)?)
}

async fn inner_main(cfg: LoadPulseConfig, shutdown: ShutdownSignal) -> Result<(), Error> {
    let worker_cfg = cfg
        .worker
        .err_tip(|| "Config is missing a `worker` section")?;
    let api_cfg = cfg.api.unwrap_or_default();

    // Wire the whole pipeline in-process: the worker publishes into the
    // store, the change feed pump projects the store into the cache.
    let store = MemoryStatusStore::new();
    let cache = Arc::new(ClientStatusCache::new());
    let processor = ChangeFeedProcessor::new(cache.clone());
    let lease = store.lease();
    let feed_pump = spawn!("change_feed_pump", async move {
        processor.run_lease(lease).await
    });

    let worker =
        LoadWorkerService::<SystemTime>::new(&worker_cfg, store.clone(), shutdown.clone());
    let client_status_id = worker.client_status_id().await;
    info!(client_status_id = %client_status_id, "Worker status pipeline started");
    let run_result = worker.run().await;

    // Let the pump drain whatever the worker wrote, then report the final
    // projection.
    store.close();
    feed_pump
        .await
        .err_tip(|| "Change feed pump failed to join")??;

    let expiry_s = if api_cfg.client_status_expiry_s == 0 {
        DEFAULT_CLIENT_STATUS_EXPIRY_S
    } else {
        api_cfg.client_status_expiry_s
    };
    let now = SystemTime::now().utc_now();
    for record in cache.list() {
        info!(
            client_status_id = %record.id,
            status = %record.status,
            online = !record.is_stale(now, Duration::from_secs(expiry_s)),
            message = %record.message,
            "Final worker status"
        );
    }

    run_result
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cfg = get_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        runtime.spawn(async move {
            signal::ctrl_c().await.expect("Failed to listen to SIGINT");
            event!(Level::WARN, "Process interrupted via SIGINT");
            shutdown.graceful("Operator requested shutdown via SIGINT");
        });
    }

    #[cfg(target_family = "unix")]
    {
        let shutdown = shutdown.clone();
        runtime.spawn(async move {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("Failed to listen to SIGTERM")
                .recv()
                .await;
            event!(Level::WARN, "Process terminated via SIGTERM");
            shutdown.graceful("Operator requested shutdown via SIGTERM");
        });
    }

    runtime
        .block_on(inner_main(cfg, shutdown))
        .err_tip(|| "main() function failed")?;
    Ok(())
}
