//! Publisher: owns the published reading, applies the unavailable policy, notifies observers.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error};

use crate::pipeline::ReadingObserver;
use crate::sensor::types::{AggregatedReading, PublishedReading};

/// What to serve after a tick in which no source produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    /// Keep the last value as-is, no notification
    HoldLast,
    /// Keep the last value, flag it stale and notify once
    #[default]
    MarkStale,
    /// Replace the value with `unavailable` and notify once
    PublishUnavailable,
}

pub struct Publisher {
    state: watch::Sender<PublishedReading>,
    observers: RwLock<Vec<Arc<dyn ReadingObserver>>>,
    unavailable_policy: UnavailablePolicy,
    change_epsilon: f64,
}

impl Publisher {
    pub fn new(unavailable_policy: UnavailablePolicy, change_epsilon: f64) -> Self {
        let (state, _) = watch::channel(PublishedReading::initial(Utc::now()));
        Self {
            state,
            observers: RwLock::new(Vec::new()),
            unavailable_policy,
            change_epsilon,
        }
    }

    pub async fn register_observer(&self, observer: Arc<dyn ReadingObserver>) {
        debug!("Registered observer: {}", observer.name());
        self.observers.write().await.push(observer);
    }

    /// Latest published state. Never blocks on a tick in progress.
    pub fn current_value(&self) -> PublishedReading {
        self.state.borrow().clone()
    }

    /// Receiver woken on every change notification.
    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<PublishedReading> {
        self.state.subscribe()
    }

    /// Apply a tick's reading. Returns true if observers were notified.
    pub async fn publish(&self, reading: AggregatedReading) -> bool {
        let policy = self.unavailable_policy;
        let epsilon = self.change_epsilon;
        let mut notified = None;

        self.state.send_if_modified(|current| {
            let changed = match &reading {
                AggregatedReading::Available { value, .. } => {
                    // Compared against the last notified value, so slow drift still crosses epsilon
                    let changed = match current.reading.value() {
                        Some(previous) => current.stale || (value - previous).abs() > epsilon,
                        None => true,
                    };
                    if changed {
                        current.reading = reading.clone();
                        current.stale = false;
                    }
                    changed
                }
                AggregatedReading::Unavailable { .. } => match policy {
                    UnavailablePolicy::HoldLast => false,
                    UnavailablePolicy::MarkStale => {
                        if current.reading.is_available() && !current.stale {
                            current.stale = true;
                            true
                        } else {
                            false
                        }
                    }
                    UnavailablePolicy::PublishUnavailable => {
                        let was_available = current.reading.is_available();
                        current.reading = reading.clone();
                        current.stale = false;
                        was_available
                    }
                },
            };

            if changed {
                current.sequence += 1;
                notified = Some(current.clone());
            }
            changed
        });

        match notified {
            Some(snapshot) => {
                self.notify_observers(&snapshot).await;
                true
            }
            None => false,
        }
    }

    async fn notify_observers(&self, snapshot: &PublishedReading) {
        let observers = self.observers.read().await;
        for observer in observers.iter() {
            if let Err(e) = observer.on_change(snapshot).await {
                error!("Observer {} failed: {:#}", observer.name(), e);
            }
        }
    }
}
