use itasser_miner::domain::{Identifier, IdentifierRange};

#[test]
fn range_walks_in_queue_order() {
    let range = IdentifierRange::new("S100".parse().unwrap(), "S103".parse().unwrap());
    let ids = range.iter().map(|id| id.to_string()).collect::<Vec<_>>();
    assert_eq!(ids, vec!["S100", "S101", "S102", "S103"]);
    assert_eq!(range.len(), 4);
}

#[test]
fn reversed_range_is_empty() {
    let range = IdentifierRange::new(Identifier::new(9), Identifier::new(3));
    assert!(range.is_empty());
    assert_eq!(range.iter().count(), 0);
}

#[test]
fn identifiers_round_trip_through_json() {
    let id: Identifier = serde_json::from_str("\"S438773\"").unwrap();
    assert_eq!(id.number(), 438773);
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"S438773\"");
    assert!(serde_json::from_str::<Identifier>("\"438773\"").is_err());
}

#[test]
fn widest_range_length_saturates() {
    let range = IdentifierRange::new(Identifier::new(0), Identifier::new(u64::MAX));
    assert_eq!(range.len(), u64::MAX);
    assert!(!range.is_empty());
}
