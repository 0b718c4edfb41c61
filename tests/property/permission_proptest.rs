//! Property-based tests for the collection permission codec

use basecast::shared::permission::{base_name, is_public_collection};
use basecast::shared::{read_permission, write_permission, PermissionBits, PermissionLevel};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_suffix_digits_decode_verbatim(
        name in "[a-z]{1,12}",
        owner in 0u8..8,
        group in 0u8..8,
        everyone in 0u8..8,
    ) {
        let collection = format!("{}_{}{}{}_", name, owner, group, everyone);
        let bits = PermissionBits::decode_suffix(&collection);
        prop_assert_eq!(bits, PermissionBits { owner, group, everyone });
        prop_assert_eq!(base_name(&collection), name.as_str());
    }

    #[test]
    fn test_names_without_suffix_use_defaults(name in "[a-z_]{0,12}") {
        prop_assert_eq!(PermissionBits::decode_suffix(&name), PermissionBits::default());
        prop_assert_eq!(base_name(&name), name.as_str());
    }

    #[test]
    fn test_public_collections_are_open(rest in "[a-z0-9_]{0,12}") {
        let collection = format!("pub_{}", rest);
        prop_assert!(is_public_collection(&collection));
        prop_assert_eq!(read_permission(&collection), PermissionLevel::Everyone);
        prop_assert_eq!(write_permission(&collection), PermissionLevel::Everyone);
    }

    #[test]
    fn test_permission_is_deterministic(name in "[a-z]{1,8}(_[0-9]{3}_)?") {
        prop_assert_eq!(read_permission(&name), read_permission(&name));
        prop_assert_eq!(write_permission(&name), write_permission(&name));
    }

    #[test]
    fn test_everyone_read_bit_opens_collection(
        name in "[a-z]{1,8}",
        owner in 0u8..8,
        group in 0u8..8,
        everyone in prop::sample::select(vec![4u8, 5, 6, 7]),
    ) {
        let collection = format!("{}_{}{}{}_", name, owner, group, everyone);
        prop_assert_eq!(read_permission(&collection), PermissionLevel::Everyone);
    }
}
