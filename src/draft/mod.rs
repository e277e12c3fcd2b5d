//! Drafts, updaters and the commit-time reconciliation.
//!
//! An update hands its recipe a [`Draft`]. When the recipe is done the
//! draft is reconciled against the snapshot it came from so that only
//! genuinely changed nodes are new allocations.

mod draft;
mod reconcile;
mod updater;

pub use draft::Draft;
pub(crate) use reconcile::reconcile;
pub use updater::Updater;
