//! Remote peer reconciliation for Peerlink.
//!
//! Turns the inbound event stream into a consistent local picture of who
//! else is connected and where they are, and keeps the presentation layer
//! in step with it.
//!
//! # Key types
//!
//! - [`PeerPresenter`] — the trait the presentation layer implements
//! - [`PeerReconciler`] — the per-peer state machine and record map
//! - [`PeerRecord`] — what the reconciler holds for one peer
//! - [`Reconciled`] — what a single event did

mod presenter;
mod reconciler;

pub use presenter::PeerPresenter;
pub use reconciler::{PeerReconciler, PeerRecord, Reconciled};
