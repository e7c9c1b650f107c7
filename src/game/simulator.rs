//! Balance simulator for the worker tree.
//! Run with: cargo test simulate_ -- --nocapture
