pub mod api;
pub mod config;
pub mod controller;
pub mod dates;
pub mod edit;
pub mod error;
pub mod flag;
pub mod merge;
pub mod mutation;
pub mod search;
pub mod sequencer;
pub mod store;
pub mod sync;

// Test utilities are exported so the dashboard crate can drive the store and
// controller without a live synchronizer.
pub mod test_utils;
