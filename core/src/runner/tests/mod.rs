//! Tests for the reference runner
//!
//! Organized by feature area

mod helpers;
mod stress_tests;
