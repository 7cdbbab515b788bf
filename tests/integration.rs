//! Integration tests for alloy-validate
//!
//! These tests run the actual binary against config files written to a
//! temporary directory.

mod parse;
