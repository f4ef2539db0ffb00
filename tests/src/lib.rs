//! # Context Bridge Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Bridge fixture and mock network executor
//! └── integration/      # Requestor ↔ channel ↔ responder flows
//!     ├── round_trip.rs
//!     ├── interleaving.rs
//!     ├── legacy.rs
//!     ├── origins.rs
//!     ├── retries.rs
//!     └── teardown.rs
//! tests/benches/
//! └── wire_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p bridge-tests
//!
//! # By category
//! cargo test -p bridge-tests integration::retries::
//!
//! # Benchmarks
//! cargo bench -p bridge-tests
//! ```

pub mod integration;
pub mod support;
