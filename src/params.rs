// SPDX-License-Identifier: GPL-3.0-only

//! Effect parameters
//!
//! Every effect describes its parameters with a [`ParamSchema`]. The schema drives
//! the lifecycle hooks the host calls between renders: normalisation (coerce and
//! clamp), keyframe interpolation, size scaling and colour remapping. Parameter
//! values travel as a [`ParamBag`], an ordered JSON-compatible map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Straight RGBA colour with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` (the `#` is optional)
    pub fn parse_hex(code: &str) -> Option<Color> {
        let hex = code.strip_prefix('#').unwrap_or(code);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let short = |i: usize| -> Option<f32> {
            let digit = u8::from_str_radix(&hex[i..i + 1], 16).ok()?;
            Some((digit * 17) as f32 / 255.0)
        };
        let long = |i: usize| -> Option<f32> {
            let byte = u8::from_str_radix(&hex[i..i + 2], 16).ok()?;
            Some(byte as f32 / 255.0)
        };

        match hex.len() {
            3 => Some(Color::rgba(short(0)?, short(1)?, short(2)?, 1.0)),
            4 => Some(Color::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Color::rgba(long(0)?, long(2)?, long(4)?, 1.0)),
            8 => Some(Color::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Lowercase hex code; the alpha byte is omitted for opaque colours
    pub fn to_hex(&self, include_hash: bool) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut code = format!("{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b));
        if byte(self.a) != 255 {
            code.push_str(&format!("{:02x}", byte(self.a)));
        }
        if include_hash {
            code.insert(0, '#');
        }
        code
    }

    pub fn clamped(&self) -> Color {
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        Color::rgba(c(self.r), c(self.g), c(self.b), c(self.a))
    }

    pub fn lerp(a: Color, b: Color, t: f64) -> Color {
        let l = |x: f32, y: f32| lerp(x as f64, y as f64, t) as f32;
        Color::rgba(l(a.r, b.r), l(a.g, b.g), l(a.b, b.b), l(a.a, b.a))
    }

    /// `[r, g, b, a]` for uniform blocks
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Linear interpolation that returns the end points exactly at `t <= 0` and `t >= 1`
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        a + (b - a) * t
    }
}

/// A single parameter value
///
/// Serialised untagged so a bag reads as a plain JSON object. Colours may also be
/// given as hex strings; schema normalisation parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Color(Color),
    Enum(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Real(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            ParamValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            ParamValue::Color(c) => Some(*c),
            ParamValue::Enum(s) => Color::parse_hex(s),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Real(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<Color> for ParamValue {
    fn from(v: Color) -> Self {
        ParamValue::Color(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Enum(v.to_string())
    }
}

/// Ordered key → value map handed between host and effect
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag(BTreeMap<String, ParamValue>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Overwrite entries with those of `patch`
    pub fn merge(&mut self, patch: &ParamBag) {
        for (key, value) in patch.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Numeric value, 0 when absent
    pub fn real(&self, key: &str) -> f64 {
        self.get(key).and_then(ParamValue::as_f64).unwrap_or_default()
    }

    /// Integer value, rounding reals; 0 when absent
    pub fn int(&self, key: &str) -> i64 {
        match self.get(key) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Real(v)) if v.is_finite() => v.round() as i64,
            _ => 0,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(ParamValue::as_bool).unwrap_or(false)
    }

    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(ParamValue::as_str).unwrap_or_default()
    }

    pub fn color(&self, key: &str) -> Color {
        self.get(key)
            .and_then(ParamValue::as_color)
            .unwrap_or(Color::BLACK)
    }
}

impl FromIterator<(String, ParamValue)> for ParamBag {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Declared type and bounds of a parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamKind {
    Real {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Int {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Bool,
    Enum {
        options: Vec<&'static str>,
    },
    Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    #[serde(flatten)]
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    pub fn real(key: &'static str, default: f64) -> Self {
        Self {
            key,
            kind: ParamKind::Real {
                min: None,
                max: None,
            },
            default: ParamValue::Real(default),
        }
    }

    pub fn int(key: &'static str, default: i64) -> Self {
        Self {
            key,
            kind: ParamKind::Int {
                min: None,
                max: None,
            },
            default: ParamValue::Int(default),
        }
    }

    pub fn bool(key: &'static str, default: bool) -> Self {
        Self {
            key,
            kind: ParamKind::Bool,
            default: ParamValue::Bool(default),
        }
    }

    pub fn choice(key: &'static str, options: &[&'static str], default: &'static str) -> Self {
        Self {
            key,
            kind: ParamKind::Enum {
                options: options.to_vec(),
            },
            default: ParamValue::Enum(default.to_string()),
        }
    }

    pub fn color(key: &'static str, default: Color) -> Self {
        Self {
            key,
            kind: ParamKind::Color,
            default: ParamValue::Color(default),
        }
    }

    /// Lower bound; ignored for non-numeric kinds
    pub fn min(mut self, bound: f64) -> Self {
        match &mut self.kind {
            ParamKind::Real { min, .. } => *min = Some(bound),
            ParamKind::Int { min, .. } => *min = Some(bound.round() as i64),
            _ => {}
        }
        self
    }

    /// Upper bound; ignored for non-numeric kinds
    pub fn max(mut self, bound: f64) -> Self {
        match &mut self.kind {
            ParamKind::Real { max, .. } => *max = Some(bound),
            ParamKind::Int { max, .. } => *max = Some(bound.round() as i64),
            _ => {}
        }
        self
    }

    pub fn range(self, min: f64, max: f64) -> Self {
        self.min(min).max(max)
    }

    /// Convert `value` to this parameter's kind and clamp it, `None` if impossible
    pub fn coerce(&self, value: &ParamValue) -> Option<ParamValue> {
        match &self.kind {
            ParamKind::Real { min, max } => {
                let v = value.as_f64().filter(|v| !v.is_nan())?;
                let v = min.map_or(v, |m| v.max(m));
                let v = max.map_or(v, |m| v.min(m));
                Some(ParamValue::Real(v))
            }
            ParamKind::Int { min, max } => {
                let v = match value {
                    ParamValue::Int(v) => *v,
                    ParamValue::Real(v) if v.is_finite() => v.round() as i64,
                    _ => return None,
                };
                let v = min.map_or(v, |m| v.max(m));
                let v = max.map_or(v, |m| v.min(m));
                Some(ParamValue::Int(v))
            }
            ParamKind::Bool => value.as_bool().map(ParamValue::Bool),
            ParamKind::Enum { options } => {
                let s = value.as_str()?;
                options
                    .iter()
                    .any(|o| *o == s)
                    .then(|| ParamValue::Enum(s.to_string()))
            }
            ParamKind::Color => value.as_color().map(|c| ParamValue::Color(c.clamped())),
        }
    }
}

/// Ordered list of parameter declarations
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamSchema(Vec<ParamSpec>);

impl ParamSchema {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        Self(specs)
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&ParamSpec> {
        self.0.iter().find(|spec| spec.key == key)
    }

    pub fn defaults(&self) -> ParamBag {
        self.0
            .iter()
            .map(|spec| (spec.key.to_string(), spec.default.clone()))
            .collect()
    }

    /// Fill missing keys, coerce kinds and clamp to declared bounds
    ///
    /// Keys the schema does not declare are dropped. Never fails: anything that
    /// cannot be interpreted falls back to the default.
    pub fn normalize(&self, bag: &ParamBag) -> ParamBag {
        self.0
            .iter()
            .map(|spec| {
                let value = bag
                    .get(spec.key)
                    .and_then(|v| spec.coerce(v))
                    .unwrap_or_else(|| spec.default.clone());
                (spec.key.to_string(), value)
            })
            .collect()
    }

    /// Keyframe blend between two bags
    ///
    /// Reals and colours interpolate linearly, ints round the linear value, bools
    /// and enums switch from `a` to `b` at `t = 0.5`.
    pub fn interpolate(&self, a: &ParamBag, b: &ParamBag, t: f64) -> ParamBag {
        let a = self.normalize(a);
        let b = self.normalize(b);

        self.0
            .iter()
            .map(|spec| {
                let key = spec.key;
                let value = match &spec.kind {
                    ParamKind::Real { .. } => ParamValue::Real(lerp(a.real(key), b.real(key), t)),
                    ParamKind::Int { .. } => {
                        let v = lerp(a.int(key) as f64, b.int(key) as f64, t);
                        ParamValue::Int(v.round() as i64)
                    }
                    ParamKind::Color => {
                        ParamValue::Color(Color::lerp(a.color(key), b.color(key), t))
                    }
                    ParamKind::Bool | ParamKind::Enum { .. } => {
                        let pick = if t < 0.5 { &a } else { &b };
                        pick.get(key).cloned().unwrap_or_else(|| spec.default.clone())
                    }
                };
                (key.to_string(), value)
            })
            .collect()
    }

    /// Multiply the listed numeric fields by `factor`; ints are rounded
    pub fn scale(&self, bag: &ParamBag, keys: &[&str], factor: f64) -> ParamBag {
        let mut scaled = bag.clone();
        for key in keys {
            let Some(spec) = self.get(key) else {
                continue;
            };
            match spec.kind {
                ParamKind::Real { .. } => scaled.set(key, bag.real(key) * factor),
                ParamKind::Int { .. } => {
                    scaled.set(key, (bag.int(key) as f64 * factor).round() as i64)
                }
                _ => {}
            }
        }
        scaled
    }

    /// Remap every colour field through `adjust`
    pub fn adjust_colors(&self, bag: &ParamBag, adjust: &dyn Fn(Color) -> Color) -> ParamBag {
        let mut adjusted = bag.clone();
        for spec in self.0.iter().filter(|s| s.kind == ParamKind::Color) {
            let current = bag
                .get(spec.key)
                .and_then(ParamValue::as_color)
                .or_else(|| spec.default.as_color());
            if let Some(color) = current {
                adjusted.set(spec.key, adjust(color));
            }
        }
        adjusted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("radius", 10).range(0.0, 200.0),
            ParamSpec::real("strength", 1.0).range(0.0, 2.0),
            ParamSpec::bool("enabled", false),
            ParamSpec::choice("mode", &["blend", "add"], "blend"),
            ParamSpec::color("tint", Color::WHITE),
        ])
    }

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("000000"), Some(Color::BLACK));
        let c = Color::parse_hex("#FF000080").unwrap();
        assert_eq!(c.r, 1.0);
        assert!((c.a - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(Color::parse_hex("#12"), None);
        assert_eq!(Color::parse_hex("#ggg"), None);
    }

    #[test]
    fn test_to_hex_omits_opaque_alpha() {
        assert_eq!(Color::WHITE.to_hex(true), "#ffffff");
        assert_eq!(Color::rgba(1.0, 0.0, 0.0, 0.0).to_hex(false), "ff000000");
    }

    #[test]
    fn test_normalize_fills_and_clamps() {
        let bag = ParamBag::new()
            .with("radius", 500.7)
            .with("strength", -3.0)
            .with("mode", "nope")
            .with("tint", "#00f")
            .with("unknown", true);
        let n = schema().normalize(&bag);
        assert_eq!(n.get("radius"), Some(&ParamValue::Int(200)));
        assert_eq!(n.get("strength"), Some(&ParamValue::Real(0.0)));
        assert_eq!(n.get("enabled"), Some(&ParamValue::Bool(false)));
        assert_eq!(n.text("mode"), "blend");
        assert_eq!(n.color("tint"), Color::rgba(0.0, 0.0, 1.0, 1.0));
        assert!(!n.contains("unknown"));
    }

    #[test]
    fn test_interpolate_endpoints() {
        let s = schema();
        let a = s.defaults();
        let b = ParamBag::new()
            .with("radius", 20i64)
            .with("strength", 0.3)
            .with("enabled", true)
            .with("mode", "add")
            .with("tint", Color::BLACK);
        let b = s.normalize(&b);

        assert_eq!(s.interpolate(&a, &b, 0.0), a);
        assert_eq!(s.interpolate(&a, &b, 1.0), b);

        let mid = s.interpolate(&a, &b, 0.5);
        assert_eq!(mid.int("radius"), 15);
        assert!(mid.flag("enabled"));
        assert_eq!(mid.text("mode"), "add");

        let early = s.interpolate(&a, &b, 0.49);
        assert!(!early.flag("enabled"));
    }

    #[test]
    fn test_scale_rounds_ints() {
        let s = schema();
        let scaled = s.scale(&s.defaults(), &["radius", "strength"], 1.26);
        assert_eq!(scaled.int("radius"), 13);
        assert!((scaled.real("strength") - 1.26).abs() < 1e-12);
    }

    #[test]
    fn test_adjust_colors_only_touches_colors() {
        let s = schema();
        let adjusted = s.adjust_colors(&s.defaults(), &|c| Color::rgba(c.b, c.g, c.r, 0.5));
        assert_eq!(adjusted.color("tint").a, 0.5);
        assert_eq!(adjusted.int("radius"), 10);
    }
}
