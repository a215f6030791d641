//! Event fan-out to connected subscribers.
//!
//! Each subscriber owns a bounded channel. `publish` serialises the event
//! once, offers it to a snapshot of the subscriber set, and afterwards
//! removes every subscriber whose channel was closed or full.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::engine::{OpportunityHandler, SummaryHandler};
use crate::types::{Opportunity, StreamEvent, TickerSummary};

/// Per-subscriber buffer. A subscriber this far behind is dropped.
pub const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Default)]
pub struct Publisher {
    subscribers: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. Events arrive as serialised JSON text.
    pub async fn subscribe(&self) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = Uuid::new_v4();
        let mut subs = self.subscribers.write().await;
        subs.insert(id, tx);
        info!(subscriber = %id, total = subs.len(), "Subscriber added");
        (id, rx)
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub async fn unsubscribe(&self, id: Uuid) {
        let mut subs = self.subscribers.write().await;
        if subs.remove(&id).is_some() {
            info!(subscriber = %id, total = subs.len(), "Subscriber removed");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Never fails: serialisation errors are logged and subscribers that
    /// cannot receive are pruned. Returns the number of successful deliveries.
    pub async fn publish(&self, event: &StreamEvent) -> usize {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!(kind = event.kind(), error = %e, "Failed to serialise event");
                return 0;
            }
        };

        let snapshot: Vec<(Uuid, mpsc::Sender<String>)> = self
            .subscribers
            .read()
            .await
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut failed = Vec::new();
        for (id, tx) in &snapshot {
            if let Err(e) = tx.try_send(payload.clone()) {
                debug!(subscriber = %id, error = %e, "Delivery failed");
                failed.push(*id);
            }
        }

        if !failed.is_empty() {
            let mut subs = self.subscribers.write().await;
            for id in &failed {
                subs.remove(id);
            }
            info!(pruned = failed.len(), total = subs.len(), "Pruned dead subscribers");
        }

        snapshot.len() - failed.len()
    }
}

#[async_trait]
impl OpportunityHandler for Publisher {
    async fn on_opportunity(&self, opportunity: &Opportunity) -> Result<()> {
        info!(opportunity = %opportunity, "Opportunity found");
        self.publish(&StreamEvent::Opportunity(opportunity.clone())).await;
        Ok(())
    }
}

#[async_trait]
impl SummaryHandler for Publisher {
    async fn on_summary(&self, summaries: &BTreeMap<String, TickerSummary>) -> Result<()> {
        self.publish(&StreamEvent::TickerSummary(summaries.clone())).await;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
