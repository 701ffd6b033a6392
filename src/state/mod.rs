//! State module for tracking listing parse progress
//!
//! # Components
//!
//! - `ListingState`: the detail-parse state machine (fetching, removed, absent, extracting, done)

mod listing_state;

pub use listing_state::ListingState;
