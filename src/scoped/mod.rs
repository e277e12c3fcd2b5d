//! Projections of a store onto a sub-path.

mod scoped;

pub use scoped::ScopedStore;
