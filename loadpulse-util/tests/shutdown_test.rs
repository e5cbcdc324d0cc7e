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

use loadpulse_util::shutdown::{ShutdownReason, ShutdownSignal};
use pretty_assertions::assert_eq;
use tokio::task::yield_now;

#[tokio::test]
async fn first_request_wins() {
    let signal = ShutdownSignal::new();

    assert!(signal.fatal("Persistent storage failure"));
    assert!(!signal.graceful("Operator requested shutdown"));

    let mut listener = signal.subscribe();
    assert_eq!(
        listener.requested().await,
        ShutdownReason {
            fatal: true,
            message: "Persistent storage failure".to_string(),
        }
    );
}

#[tokio::test]
async fn listener_waits_until_requested() {
    let signal = ShutdownSignal::new();
    let mut listener = signal.subscribe();
    assert!(!signal.is_requested());

    let waiter = tokio::spawn(async move { listener.requested().await });
    yield_now().await;
    assert!(!waiter.is_finished());

    signal.graceful("Done");
    let reason = waiter.await.unwrap();
    assert!(!reason.fatal);
    assert_eq!(reason.message, "Done");
    assert!(signal.is_requested());
}

#[tokio::test]
async fn listener_subscribed_after_the_request_still_observes_it() {
    let signal = ShutdownSignal::new();
    signal.graceful("Done");

    let mut listener = signal.subscribe();
    assert_eq!(listener.requested().await.message, "Done");
}

#[tokio::test]
async fn dropped_signal_resolves_listeners_gracefully() {
    let signal = ShutdownSignal::new();
    let mut listener = signal.subscribe();
    drop(signal);

    let reason = listener.requested().await;
    assert!(!reason.fatal);
}
