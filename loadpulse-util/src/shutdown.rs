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

use tokio::sync::watch;

/// Why the process is being asked to stop. `fatal` marks errors escalated
/// from a component that decided the whole worker must not continue, as
/// opposed to an operator-requested stop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShutdownReason {
    pub fatal: bool,
    pub message: String,
}

/// Process-wide shutdown intent. Cloning shares the same underlying signal.
/// The first request wins; later requests are ignored so listeners observe
/// exactly one reason.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(None),
        }
    }

    /// Requests an orderly stop. Returns whether this call was the one that
    /// triggered shutdown.
    pub fn graceful(&self, message: impl Into<String>) -> bool {
        self.request(ShutdownReason {
            fatal: false,
            message: message.into(),
        })
    }

    /// Escalates a local failure into whole-process shutdown intent. Returns
    /// whether this call was the one that triggered shutdown.
    pub fn fatal(&self, message: impl Into<String>) -> bool {
        self.request(ShutdownReason {
            fatal: true,
            message: message.into(),
        })
    }

    fn request(&self, reason: ShutdownReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn is_requested(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<Option<ShutdownReason>>,
}

impl ShutdownListener {
    /// Waits until shutdown has been requested and returns the reason. If
    /// every `ShutdownSignal` was dropped without a request, resolves to a
    /// non-fatal reason so callers can still unwind.
    pub async fn requested(&mut self) -> ShutdownReason {
        loop {
            if let Some(reason) = self.rx.borrow_and_update().as_ref() {
                return reason.clone();
            }
            if self.rx.changed().await.is_err() {
                return ShutdownReason {
                    fatal: false,
                    message: "Shutdown signal dropped".to_string(),
                };
            }
        }
    }
}
