//! Possession notifications.
//!
//! Listeners are told about every completed transition. Delivery is
//! fire-and-forget: a failing listener is logged and skipped, and never
//! undoes the transition that produced the event.

use crate::error::Result;
use crate::principal::PrincipalRef;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// A completed possession transition, carrying resolved principals.
#[derive(Debug, Clone)]
pub enum PossessionEvent {
    Started {
        admin: PrincipalRef,
        target: PrincipalRef,
    },
    Ended {
        admin: PrincipalRef,
        target: PrincipalRef,
    },
}

impl PossessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "possession_started",
            Self::Ended { .. } => "possession_ended",
        }
    }

    pub fn admin(&self) -> &PrincipalRef {
        match self {
            Self::Started { admin, .. } | Self::Ended { admin, .. } => admin,
        }
    }

    pub fn target(&self) -> &PrincipalRef {
        match self {
            Self::Started { target, .. } | Self::Ended { target, .. } => target,
        }
    }
}

/// Receives possession events.
#[async_trait]
pub trait PossessionListener: Send + Sync {
    async fn on_event(&self, event: &PossessionEvent) -> Result<()>;
}

/// Forwards events to a `tokio::sync::broadcast` channel.
///
/// Events sent while nobody is subscribed are dropped.
#[derive(Clone)]
pub struct BroadcastListener {
    sender: broadcast::Sender<PossessionEvent>,
}

impl BroadcastListener {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PossessionEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl PossessionListener for BroadcastListener {
    async fn on_event(&self, event: &PossessionEvent) -> Result<()> {
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}
