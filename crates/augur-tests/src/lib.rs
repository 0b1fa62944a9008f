//! End-to-end test suite for Augur.
//!
//! Drives the collector, snapshot store, retention and query facade together
//! against scripted mempool sources and scratch data directories.

pub mod helpers;
