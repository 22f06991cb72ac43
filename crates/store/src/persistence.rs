//! Background writer that persists committed cart snapshots.
//!
//! The store enqueues one [`PersistJob::Write`] per committed mutation on an
//! unbounded, ordered channel. A single task drains it, so writes reach
//! storage in mutation order. When several writes are already queued only
//! the newest snapshot is written: the older ones are superseded and must
//! never land after it.
//!
//! Failures are logged and captured to Sentry. They never reach the caller
//! that made the mutation; the in-memory cart stays authoritative.

use std::sync::Arc;

use pocket_cart_core::CartState;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, error, info_span, trace};

use crate::codec;
use crate::storage::KeyValueStore;

/// Work item for the writer task.
#[derive(Debug)]
pub(crate) enum PersistJob {
    /// Persist this post-mutation snapshot.
    Write {
        revision: u64,
        snapshot: Arc<CartState>,
    },
    /// Reply once every job queued before this one has been attempted.
    Flush(oneshot::Sender<()>),
}

pub(crate) type JobSender = mpsc::UnboundedSender<PersistJob>;

/// Spawn the writer task on the current Tokio runtime.
///
/// The task runs until every [`JobSender`] clone has been dropped.
pub(crate) fn spawn_writer(storage: Arc<dyn KeyValueStore>, key: String) -> JobSender {
    let (tx, rx) = mpsc::unbounded_channel();
    let span = info_span!("cart_writer", key = %key);
    tokio::spawn(run_writer(storage, key, rx).instrument(span));
    tx
}

async fn run_writer(
    storage: Arc<dyn KeyValueStore>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<PersistJob>,
) {
    debug!("Cart writer started");

    while let Some(job) = rx.recv().await {
        let mut latest = None;
        let mut flushes = Vec::new();
        absorb(job, &mut latest, &mut flushes);

        // Coalesce whatever else is already queued.
        while let Ok(job) = rx.try_recv() {
            absorb(job, &mut latest, &mut flushes);
        }

        if let Some((revision, snapshot)) = latest {
            write_snapshot(storage.as_ref(), &key, revision, &snapshot).await;
        }

        for reply in flushes {
            // The flusher may have given up waiting; nothing to do then.
            let _ = reply.send(());
        }
    }

    debug!("Cart writer stopped");
}

fn absorb(
    job: PersistJob,
    latest: &mut Option<(u64, Arc<CartState>)>,
    flushes: &mut Vec<oneshot::Sender<()>>,
) {
    match job {
        PersistJob::Write { revision, snapshot } => {
            if let Some((superseded, _)) = latest.replace((revision, snapshot)) {
                trace!(superseded, revision, "Skipping superseded cart snapshot");
            }
        }
        PersistJob::Flush(reply) => flushes.push(reply),
    }
}

async fn write_snapshot(storage: &dyn KeyValueStore, key: &str, revision: u64, state: &CartState) {
    let payload = match codec::encode(state) {
        Ok(payload) => payload,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            error!(
                error = %e,
                revision,
                sentry_event_id = %event_id,
                "Failed to encode cart snapshot"
            );
            return;
        }
    };

    match storage.set(key, payload).await {
        Ok(()) => debug!(revision, items = state.len(), "Persisted cart snapshot"),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            error!(
                error = %e,
                revision,
                sentry_event_id = %event_id,
                "Failed to persist cart snapshot"
            );
        }
    }
}
