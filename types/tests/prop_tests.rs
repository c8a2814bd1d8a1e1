use proptest::prelude::*;

use cosign_types::{Contact, EventId, Kind, PublicKey, Tag, TagKind, Timestamp};

proptest! {
    /// EventId hex roundtrip: to_hex -> from_hex produces the identical id.
    #[test]
    fn event_id_hex_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = EventId(bytes);
        prop_assert_eq!(EventId::from_hex(&id.to_hex()).unwrap(), id);
    }

    /// PublicKey JSON roundtrip goes through the hex string form.
    #[test]
    fn public_key_json_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let pk = PublicKey(bytes);
        let json = serde_json::to_string(&pk).unwrap();
        prop_assert_eq!(json.len(), 66);
        let decoded: PublicKey = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(decoded, pk);
    }

    /// Kind tags carry the decimal kind number.
    #[test]
    fn kind_tag_value_is_decimal(k in any::<u32>()) {
        let tag = Tag::kind(Kind(k));
        prop_assert!(tag.is(TagKind::Kind));
        prop_assert_eq!(tag.value().unwrap().parse::<u32>().unwrap(), k);
    }

    /// Contacts survive the `p` tag encoding with any petname.
    #[test]
    fn contact_tag_roundtrip(bytes in prop::array::uniform32(0u8..), petname in "[a-z]{1,12}") {
        let contact = Contact::new(PublicKey(bytes)).with_petname(petname);
        prop_assert_eq!(Contact::from_tag(&contact.to_tag()), Some(contact));
    }

    /// Timestamp shifting never wraps.
    #[test]
    fn timestamp_shift_saturates(base in any::<u64>(), delta in any::<u64>()) {
        let ts = Timestamp::new(base);
        prop_assert!(ts.plus_secs(delta) >= ts);
        prop_assert!(ts.minus_secs(delta) <= ts);
    }
}
