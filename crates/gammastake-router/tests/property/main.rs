//! Property-based test suite entry point.
//!
//! This file loads all property test sub-modules. Run with:
//!
//! ```bash
//! cargo test -p gammastake-router --test property
//! ```
//!
//! To increase the number of generated cases:
//!
//! ```bash
//! PROPTEST_CASES=512 cargo test -p gammastake-router --test property
//! ```

#[path = "../common/mod.rs"]
mod common;

mod accrual;
mod atomicity;
mod conservation;
