//! warpy-test - Regression test helpers for Warpy
//!
//! Provides the [`RegParams`] bookkeeping object used by every `*_reg.rs`
//! integration test, plus a seeded point generator so property-style tests
//! are reproducible without pulling in a random number crate.
//!
//! # Usage
//!
//! ```ignore
//! use warpy_test::RegParams;
//!
//! let mut rp = RegParams::new("affine");
//! rp.compare_values(1.0, value, 1e-9);
//! assert!(rp.cleanup());
//! ```

mod params;
mod rng;

pub use params::RegParams;
pub use rng::SimpleRng;

/// Install a `tracing` subscriber that writes through the test harness
///
/// Safe to call from several tests; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}
