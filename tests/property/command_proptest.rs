//! Property-based tests for the command envelope

use basecast::shared::command::is_reserved_channel;
use basecast::shared::{Command, CommandType};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_clients_never_set_system_flag(data in ".*", sys in any::<bool>()) {
        let raw = serde_json::json!({"type": "chan_in", "data": data, "sys": sys}).to_string();
        let cmd = Command::from_client(&raw).unwrap();
        prop_assert!(!cmd.is_system_event);
        prop_assert_eq!(cmd.kind, CommandType::ChanIn);
    }

    #[test]
    fn test_document_channels_are_reserved(collection in "[A-Za-z0-9_]{0,16}") {
        let lower = format!("db-{}", collection);
        let upper = format!("DB-{}", collection);
        prop_assert!(is_reserved_channel(&lower));
        prop_assert!(is_reserved_channel(&upper));
    }

    #[test]
    fn test_system_copy_never_carries_token(token in ".*", data in ".*") {
        let cmd = Command::new("a", CommandType::DbCreated, data).with_token(token);
        let copy = cmd.to_system_event();
        prop_assert!(copy.is_system_event);
        prop_assert!(copy.token.is_empty());
        prop_assert_eq!(copy.data, cmd.data);
    }
}
