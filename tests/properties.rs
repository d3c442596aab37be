use std::collections::BTreeSet;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use data_comparator::{
    decode_identifier, extract_records, match_records, KeyFields, NormalizationRule, Normalizer,
    RecordSet, SourceKind, UuidRepresentation,
};
use proptest::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

fn record_set(keys: &[String], field: &str) -> RecordSet {
    let items: Vec<Value> = keys
        .iter()
        .enumerate()
        .map(|(i, key)| json!({ field: key, "row": i }))
        .collect();
    extract_records(Value::Array(items), None).unwrap().records
}

fn keys_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-dA-D]{1,2}", 0..16)
}

fn representation_strategy() -> impl Strategy<Value = UuidRepresentation> {
    prop_oneof![
        Just(UuidRepresentation::CSharpLegacy),
        Just(UuidRepresentation::JavaLegacy),
        Just(UuidRepresentation::Standard),
    ]
}

proptest! {
    #[test]
    fn match_sets_partition_the_key_union(keys_a in keys_strategy(), keys_b in keys_strategy()) {
        let a = record_set(&keys_a, "id");
        let b = record_set(&keys_b, "Id");

        let result = match_records(&a, &b, &KeyFields::new("id", "Id"));

        let only_a: BTreeSet<&String> = result.only_in_a.iter().collect();
        let only_b: BTreeSet<&String> = result.only_in_b.iter().collect();
        let matched: BTreeSet<&String> = result.matched.iter().collect();

        prop_assert!(only_a.is_disjoint(&only_b));
        prop_assert!(only_a.is_disjoint(&matched));
        prop_assert!(only_b.is_disjoint(&matched));

        let expected: BTreeSet<String> = keys_a
            .iter()
            .chain(&keys_b)
            .map(|k| k.to_lowercase())
            .collect();
        let actual: BTreeSet<String> = only_a
            .into_iter()
            .chain(only_b)
            .chain(matched)
            .cloned()
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn only_in_sets_are_symmetric(keys_a in keys_strategy(), keys_b in keys_strategy()) {
        let a = record_set(&keys_a, "id");
        let b = record_set(&keys_b, "id");
        let fields = KeyFields::same("id");

        let forward = match_records(&a, &b, &fields);
        let backward = match_records(&b, &a, &fields);

        prop_assert_eq!(&forward.only_in_a, &backward.only_in_b);
        prop_assert_eq!(&forward.only_in_b, &backward.only_in_a);
    }

    #[test]
    fn normalize_is_idempotent(
        payloads in prop::collection::vec(prop::array::uniform16(any::<u8>()), 0..8),
        embedded in prop::collection::vec(any::<bool>(), 0..8),
    ) {
        let items: Vec<Value> = payloads
            .iter()
            .zip(embedded.iter().chain(std::iter::repeat(&false)))
            .map(|(bytes, stringify)| {
                let mut parameters = json!([{"owner": {"$binary": {"base64": STANDARD.encode(bytes), "subType": "04"}}}]);
                if *stringify {
                    parameters = Value::String(parameters.to_string());
                }
                json!({
                    "_id": {"$binary": {"base64": STANDARD.encode(bytes), "subType": "03"}},
                    "parameters": parameters,
                })
            })
            .collect();
        let mut records = extract_records(Value::Array(items), None).unwrap().records;

        let normalizer = Normalizer::new(
            SourceKind::DocumentStore,
            &[
                NormalizationRule::DecodeBinaryIdentifiers,
                NormalizationRule::rename("_id", "Id"),
                NormalizationRule::parse_embedded("parameters", data_comparator::EmbeddedShape::Array),
            ],
        );

        normalizer.normalize(&mut records);
        let once = records.clone();
        let second = normalizer.normalize(&mut records);

        prop_assert_eq!(records, once);
        prop_assert!(!second.changed());
        prop_assert!(second.warnings.is_empty());
    }

    #[test]
    fn identifier_bytes_round_trip(
        bytes in prop::array::uniform16(any::<u8>()),
        representation in representation_strategy(),
    ) {
        let subtype = format!("{:02x}", representation.subtype());
        let wrapper = json!({"$binary": {"base64": STANDARD.encode(bytes), "subType": subtype}});

        let canonical = decode_identifier(&wrapper, representation).unwrap().unwrap();
        prop_assert_eq!(canonical.len(), 36);
        prop_assert_eq!(canonical.to_lowercase(), canonical.clone());

        let uuid = Uuid::parse_str(&canonical).unwrap();
        prop_assert_eq!(representation.uuid_to_bytes(&uuid), bytes);
    }
}
