//! # pyrite-vm-tests
//!
//! VMTests-style fixture runner for the Pyrite EVM.
//!
//! This crate provides:
//! - JSON parsing for the ethereum/tests VMTests layout
//! - [`VmTestRunner`]: runs one fixture through `Computation::apply_computation`
//! - [`TestRunner`]: walks a directory of fixtures and aggregates [`TestStats`]
//!
//! ## Checks
//!
//! A fixture with `gas` and `post` must succeed with exactly that much gas left, the given
//! output, the given logs hash and the given post state. A fixture without them must fail.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod runner;
mod types;

pub use error::{TestError, TestResult};
pub use runner::{TestRunner, TestStats};
pub use types::*;
pub use vm_test::{logs_hash, VmTestResults, VmTestRunner};
