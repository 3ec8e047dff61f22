#![cfg(feature = "serde")]

use jelly::{EncoderOptions, LogicalType, PhysicalType, StreamOptions};

#[test]
fn partial_json_fills_defaults() {
    let opts: StreamOptions = serde_json::from_str(
        r#"{ "stream_name": "sensors", "physical_type": "quads", "logical_type": "named_graphs", "max_prefix_table_size": 0 }"#,
    )
    .unwrap();
    assert_eq!(opts.stream_name, "sensors");
    assert_eq!(opts.physical_type, PhysicalType::Quads);
    assert_eq!(opts.logical_type, LogicalType::NamedGraphs);
    assert!(!opts.uses_prefix_table());
    assert_eq!(opts.max_name_table_size, StreamOptions::default().max_name_table_size);
    opts.validate().unwrap();
}

#[test]
fn json_roundtrip_preserves_options() {
    let opts = StreamOptions::quads()
        .with_name("feed")
        .with_rdf_star(true)
        .with_datatype_table_size(4);
    let text = serde_json::to_string(&opts).unwrap();
    assert!(text.contains("\"physical_type\":\"quads\""));
    let back: StreamOptions = serde_json::from_str(&text).unwrap();
    assert_eq!(back, opts);
}

#[test]
fn encoder_options_default_to_elision() {
    let e: EncoderOptions = serde_json::from_str("{}").unwrap();
    assert!(e.elide_repeated_terms);
}

#[test]
fn invalid_json_values_are_rejected() {
    assert!(serde_json::from_str::<StreamOptions>(r#"{ "physical_type": "graphs" }"#).is_err());
    let opts: StreamOptions = serde_json::from_str(r#"{ "max_name_table_size": 2 }"#).unwrap();
    assert!(opts.validate().is_err());
}
