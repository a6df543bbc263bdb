//! Integration tests for whole sync passes.
//!
//! Each test builds a [`Harness`](crate::common::builders::Harness) with
//! in-memory sources and target, seeds them, runs one or more passes through
//! the orchestrator, and inspects both the returned report and the target
//! directory afterwards.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test integration::pass_lifecycle
//! cargo test integration::deletion_safety
//! cargo test integration::concurrency
//! cargo test integration::properties
//! ```

pub mod deletion_safety;
pub mod properties;
