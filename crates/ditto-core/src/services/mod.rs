//! Services shared by every ditto front-end.

mod slot;
mod store;

pub use slot::StoreSlot;
pub use store::{ReconcileSummary, TaskStore};
