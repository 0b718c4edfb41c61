//! Property-based tests

mod command_proptest;
mod permission_proptest;
