//! Realtime integration tests

mod broker_test;
mod hub_test;
