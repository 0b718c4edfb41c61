//! Test suite for Basecast
//!
//! This module organizes all tests

#[cfg(feature = "ssr")]
pub mod integration;
pub mod property;
