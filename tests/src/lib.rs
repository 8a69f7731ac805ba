//! # Quantum-Chain Staking Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Simulated chain driving the staking service
//! └── integration/
//!     ├── staking_flows.rs      # Multi-block lifecycle scenarios
//!     └── ledger_properties.rs  # Property tests over random operation streams
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::staking_flows
//! cargo test -p qc-tests integration::ledger_properties
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

pub mod fixtures;
pub mod integration;
