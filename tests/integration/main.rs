//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one part of the driver
//! against the simulated platform and a recording thermal framework. All
//! tests run on the host with no real hardware required.

mod mock_hw;
mod probe_tests;
mod registry_tests;
