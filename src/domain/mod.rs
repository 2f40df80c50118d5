pub mod dedup;
pub mod listing;

pub use dedup::{DedupIndex, DedupScope};
pub use listing::{Listing, FIELDNAMES};
