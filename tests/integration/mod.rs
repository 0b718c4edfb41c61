//! Integration tests

pub mod realtime;
