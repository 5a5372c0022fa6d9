// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for parameter bags and schemas

use live_effects::params::{Color, ParamBag, ParamSchema, ParamSpec, ParamValue};

fn schema() -> ParamSchema {
    ParamSchema::new(vec![
        ParamSpec::real("amount", 0.5).range(0.0, 1.0),
        ParamSpec::int("count", 4).range(1.0, 10.0),
        ParamSpec::bool("enabled", true),
        ParamSpec::choice("mode", &["blend", "add"], "blend"),
        ParamSpec::color("tint", Color::WHITE),
    ])
}

#[test]
fn test_bag_from_host_json() {
    let json = r##"{
        "amount": 0.25, "count": 3, "enabled": false, "mode": "add", "tint": "#00ff00"
    }"##;
    let bag: ParamBag = serde_json::from_str(json).unwrap();
    let normalized = schema().normalize(&bag);

    assert_eq!(normalized.real("amount"), 0.25);
    assert_eq!(normalized.int("count"), 3);
    assert!(!normalized.flag("enabled"));
    assert_eq!(normalized.text("mode"), "add");
    assert_eq!(normalized.color("tint"), Color::rgba(0.0, 1.0, 0.0, 1.0));
}

#[test]
fn test_normalize_falls_back_to_defaults() {
    let bag = ParamBag::new()
        .with("amount", "lots")
        .with("count", f64::NAN)
        .with("mode", "unknown")
        .with("tint", "#zzzzzz")
        .with("stray", 1.0);
    let normalized = schema().normalize(&bag);

    assert_eq!(normalized, schema().defaults());
    assert!(!normalized.contains("stray"));
}

#[test]
fn test_normalize_is_idempotent() {
    let bag = ParamBag::new().with("amount", 7.0).with("count", 2.6);
    let once = schema().normalize(&bag);
    assert_eq!(schema().normalize(&once), once);
    assert_eq!(once.real("amount"), 1.0);
    assert_eq!(once.int("count"), 3);
}

#[test]
fn test_interpolate_endpoints_and_midpoint() {
    let a = schema().defaults().with("amount", 0.0).with("mode", "blend");
    let b = schema()
        .defaults()
        .with("amount", 1.0)
        .with("mode", "add")
        .with("tint", Color::BLACK);

    assert_eq!(schema().interpolate(&a, &b, 0.0), schema().normalize(&a));
    assert_eq!(schema().interpolate(&a, &b, 1.0), schema().normalize(&b));

    let mid = schema().interpolate(&a, &b, 0.5);
    assert_eq!(mid.real("amount"), 0.5);
    assert_eq!(mid.text("mode"), "add");
    assert_eq!(mid.color("tint"), Color::rgba(0.5, 0.5, 0.5, 1.0));

    let early = schema().interpolate(&a, &b, 0.25);
    assert_eq!(early.text("mode"), "blend");
}

#[test]
fn test_scale_only_touches_listed_keys() {
    let bag = schema().defaults();
    let scaled = schema().scale(&bag, &["count"], 1.6);
    // 4 * 1.6 = 6.4
    assert_eq!(scaled.int("count"), 6);
    assert_eq!(scaled.real("amount"), 0.5);
}

#[test]
fn test_adjust_colors_fills_missing_colour_from_default() {
    let halve_red = |c: Color| Color::rgba(c.r * 0.5, c.g, c.b, c.a);
    let adjusted = schema().adjust_colors(&ParamBag::new(), &halve_red);
    assert_eq!(adjusted.color("tint"), Color::rgba(0.5, 1.0, 1.0, 1.0));
}

#[test]
fn test_hex_codes() {
    assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
    assert_eq!(Color::parse_hex("000000"), Some(Color::BLACK));
    assert_eq!(Color::parse_hex("#12345"), None);
    assert_eq!(Color::rgba(1.0, 0.0, 0.0, 0.0).to_hex(true), "#ff000000");
    assert_eq!(Color::BLACK.to_hex(false), "000000");
}

#[test]
fn test_param_value_json_shapes() {
    assert_eq!(serde_json::to_string(&ParamValue::Int(3)).unwrap(), "3");
    assert_eq!(serde_json::to_string(&ParamValue::Bool(true)).unwrap(), "true");
    assert_eq!(
        serde_json::to_string(&ParamValue::Enum("add".into())).unwrap(),
        "\"add\""
    );
}
