//! Test suites shared by every guard implementation.
//!
//! Integration tests in this crate run them with `DeferredGuard`,
//! `strand-crossbeam` runs them again with `EpochGuard`.
