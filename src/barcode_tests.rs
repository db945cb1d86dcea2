//! Tests for barcode decoding

use super::*;

fn settings(sm_prefix: &str, item_prefix: &str) -> ScannerSettings {
    ScannerSettings {
        sm_prefix: sm_prefix.to_string(),
        item_prefix: item_prefix.to_string(),
        ..ScannerSettings::default()
    }
}

// ── Location ─────────────────────────────────────────────────────────

#[test]
fn location_prefix_is_stripped() {
    let scan = decode("L123", ScanMode::Location, &settings("L", "R")).unwrap();
    assert_eq!(scan.parsed, "123");
    assert_eq!(scan.original, "L123");
}

#[test]
fn location_without_required_prefix_is_rejected() {
    let err = decode("123", ScanMode::Location, &settings("L", "R")).unwrap_err();
    match err {
        InventoryError::Decode(msg) => {
            assert!(msg.contains("wrong SM prefix"));
            assert!(msg.contains('L'));
        }
        other => panic!("Expected InventoryError::Decode, got: {other:?}"),
    }
}

#[test]
fn location_without_configured_prefix_passes_through() {
    let scan = decode("A1-05", ScanMode::Location, &settings("", "R")).unwrap();
    assert_eq!(scan.parsed, "A1-05");
}

#[test]
fn multi_char_location_prefix() {
    let scan = decode("SMA1", ScanMode::Location, &settings("SM", "R")).unwrap();
    assert_eq!(scan.parsed, "A1");
}

#[test]
fn empty_scan_is_rejected_in_both_modes() {
    let s = ScannerSettings::default();
    assert!(matches!(
        decode("", ScanMode::Location, &s),
        Err(InventoryError::Decode(_))
    ));
    assert!(matches!(
        decode("", ScanMode::Item, &s),
        Err(InventoryError::Decode(_))
    ));
}

// ── Item ─────────────────────────────────────────────────────────────

#[test]
fn composite_item_uses_reference_segment() {
    let scan = decode(
        "PF3G_1260_1000#SSO123478_999#RM0000078",
        ScanMode::Item,
        &ScannerSettings::default(),
    )
    .unwrap();
    assert_eq!(scan.parsed, "M0000078");
    assert_eq!(
        scan.metadata.full_composite.as_deref(),
        Some("PF3G_1260_1000#SSO123478_999#RM0000078")
    );
    assert!(!scan.metadata.used_first_segment);
}

#[test]
fn composite_item_ignores_item_prefix_setting() {
    let scan = decode("X1#R42", ScanMode::Item, &settings("", "ZZ")).unwrap();
    assert_eq!(scan.parsed, "42");
}

#[test]
fn composite_without_reference_falls_back_to_first_segment() {
    let scan = decode("PF3G#SSO1", ScanMode::Item, &ScannerSettings::default()).unwrap();
    assert_eq!(scan.parsed, "PF3G");
    assert!(scan.metadata.used_first_segment);
    assert_eq!(scan.metadata.full_composite.as_deref(), Some("PF3G#SSO1"));
}

#[test]
fn location_that_is_only_the_prefix_is_rejected() {
    let result = decode("L", ScanMode::Location, &settings("L", "R"));
    match result {
        Err(InventoryError::Decode(msg)) => assert!(msg.contains("missing")),
        other => panic!("Expected InventoryError::Decode, got: {other:?}"),
    }
}

#[test]
fn simple_item_prefix_is_stripped() {
    let scan = decode("R555", ScanMode::Item, &settings("", "R")).unwrap();
    assert_eq!(scan.parsed, "555");
}

#[test]
fn unprefixed_item_passes_through() {
    let scan = decode("M0000078", ScanMode::Item, &settings("", "R")).unwrap();
    assert_eq!(scan.parsed, "M0000078");
}

#[test]
fn item_with_empty_prefix_setting_is_unchanged() {
    let scan = decode("R555", ScanMode::Item, &settings("", "")).unwrap();
    assert_eq!(scan.parsed, "R555");
}

#[test]
fn decode_is_deterministic() {
    let s = settings("L", "R");
    let a = decode("R777", ScanMode::Item, &s).unwrap();
    let b = decode("R777", ScanMode::Item, &s).unwrap();
    assert_eq!(a, b);
}
