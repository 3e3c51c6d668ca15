use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_post_id_creation() {
    let id = PostId::new();
    assert!(!id.to_string().is_empty());
}

#[test]
fn test_post_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = PostId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_post_id_display() {
    let uuid = Uuid::new_v4();
    let id = PostId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_post_id_from_str() {
    let uuid = Uuid::new_v4();
    let id = PostId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_post_id_from_str_error() {
    assert!(PostId::from_str("invalid").is_err());
    assert!(PostId::from_str("64f1c0ffee0000000000abcd").is_err());
}

#[test]
fn test_post_ids_are_time_ordered() {
    let first = PostId::new();
    let second = PostId::new();
    assert!(second > first);
}

#[test]
fn test_post_id_serializes_transparently() {
    let uuid = Uuid::new_v4();
    let id = PostId::from_uuid(uuid);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));
}
