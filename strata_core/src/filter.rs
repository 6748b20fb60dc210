// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Named-effect registry.
//!
//! Backends describe the filters they can apply as [`FilterSchema`]s and
//! register them, plus any friendly aliases, into a [`FilterRegistry`]. The
//! document never interprets filter parameters itself; it only resolves a
//! caller-supplied name and overrides into a [`FilterEntry`] which the backend
//! later receives verbatim.
//!
//! Resolution rules:
//!
//! - names are matched case-insensitively, aliases first;
//! - every declared parameter is present in the entry, with the caller's
//!   override when one of the right kind was given and the default otherwise;
//! - numeric overrides are clamped to the declared `[min, max]`;
//! - override keys the schema does not declare are dropped.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::color::Color;
use crate::error::{Error, Result};

/// A single filter parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    /// A scalar.
    Number(f64),
    /// A switch.
    Bool(bool),
    /// A color.
    Color(Color),
    /// Up to four scalars, e.g. a point or a color matrix row.
    Vector([f64; 4]),
}

impl ParamValue {
    fn same_kind(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Color> for ParamValue {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

/// Declaration of one filter parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: &'static str,
    /// Value used when the caller gives none.
    pub default: ParamValue,
    /// Lower clamp for numeric values.
    pub min: f64,
    /// Upper clamp for numeric values.
    pub max: f64,
}

impl ParamSpec {
    /// A numeric parameter with a clamp range.
    #[must_use]
    pub const fn number(name: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self {
            name,
            default: ParamValue::Number(default),
            min,
            max,
        }
    }

    /// A non-numeric parameter (no clamping).
    #[must_use]
    pub const fn value(name: &'static str, default: ParamValue) -> Self {
        Self {
            name,
            default,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    fn accept(&self, v: ParamValue) -> ParamValue {
        if !v.same_kind(&self.default) {
            return self.default;
        }
        match v {
            ParamValue::Number(n) if n.is_nan() => self.default,
            ParamValue::Number(n) => ParamValue::Number(n.clamp(self.min, self.max)),
            other => other,
        }
    }
}

/// The parameter schema of one canonical filter.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterSchema {
    /// Canonical identifier.
    pub canonical: &'static str,
    /// Declared parameters, in declaration order.
    pub params: Vec<ParamSpec>,
}

impl FilterSchema {
    /// Creates a schema.
    #[must_use]
    pub fn new(canonical: &'static str, params: impl IntoIterator<Item = ParamSpec>) -> Self {
        Self {
            canonical,
            params: params.into_iter().collect(),
        }
    }
}

/// A resolved filter: canonical name plus a complete parameter map.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterEntry {
    name: &'static str,
    params: BTreeMap<&'static str, ParamValue>,
}

impl FilterEntry {
    /// Canonical filter name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Looks up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ParamValue> {
        self.params.get(key).copied()
    }

    /// Numeric parameter, or `0.0` if absent or of another kind.
    #[must_use]
    pub fn number(&self, key: &str) -> f64 {
        match self.get(key) {
            Some(ParamValue::Number(n)) => n,
            _ => 0.0,
        }
    }

    /// Color parameter, or transparent if absent or of another kind.
    #[must_use]
    pub fn color(&self, key: &str) -> Color {
        match self.get(key) {
            Some(ParamValue::Color(c)) => c,
            _ => Color::TRANSPARENT,
        }
    }

    /// Iterates parameters in key order.
    pub fn params(&self) -> impl Iterator<Item = (&'static str, ParamValue)> + '_ {
        self.params.iter().map(|(k, v)| (*k, *v))
    }
}

/// Canonical schemas plus an alias table.
#[derive(Clone, Debug, Default)]
pub struct FilterRegistry {
    schemas: BTreeMap<&'static str, FilterSchema>,
    // Lowercased alias or canonical name -> canonical name.
    lookup: BTreeMap<String, &'static str>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a canonical filter.
    pub fn register(&mut self, schema: FilterSchema) {
        self.lookup
            .insert(schema.canonical.to_ascii_lowercase(), schema.canonical);
        self.schemas.insert(schema.canonical, schema);
    }

    /// Adds an alias for an already-registered canonical name.
    ///
    /// Aliases pointing at unknown filters are accepted; resolving them
    /// fails with [`Error::UnknownFilter`].
    pub fn alias(&mut self, alias: &str, canonical: &'static str) {
        self.lookup.insert(alias.to_ascii_lowercase(), canonical);
    }

    /// Returns the canonical name `name` refers to, if any.
    #[must_use]
    pub fn canonical_name(&self, name: &str) -> Option<&'static str> {
        let canonical = *self.lookup.get(&name.to_ascii_lowercase())?;
        self.schemas.contains_key(canonical).then_some(canonical)
    }

    /// Returns the schema for `name` (alias or canonical).
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&FilterSchema> {
        self.schemas.get(self.canonical_name(name)?)
    }

    /// Iterates canonical names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.schemas.keys().copied()
    }

    /// Resolves a name and caller overrides into a complete entry.
    pub fn resolve(&self, name: &str, overrides: &[(&str, ParamValue)]) -> Result<FilterEntry> {
        let schema = self.schema(name).ok_or_else(|| Error::UnknownFilter {
            name: name.to_string(),
        })?;
        let params = schema
            .params
            .iter()
            .map(|spec| {
                let value = overrides
                    .iter()
                    .rev()
                    .find(|(k, _)| *k == spec.name)
                    .map_or(spec.default, |(_, v)| spec.accept(*v));
                (spec.name, value)
            })
            .collect();
        Ok(FilterEntry {
            name: schema.canonical,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FilterRegistry {
        let mut r = FilterRegistry::new();
        r.register(FilterSchema::new(
            "MotionBlur",
            [
                ParamSpec::number("radius", 20.0, 0.0, 100.0),
                ParamSpec::number("angle", 0.0, -360.0, 360.0),
            ],
        ));
        r.alias("motion", "MotionBlur");
        r.alias("ghost", "Missing");
        r
    }

    #[test]
    fn defaults_merge_with_overrides() {
        let e = registry()
            .resolve("motion", &[("angle", 45.0.into())])
            .unwrap();
        assert_eq!(e.name(), "MotionBlur");
        assert_eq!(e.number("radius"), 20.0);
        assert_eq!(e.number("angle"), 45.0);
    }

    #[test]
    fn overrides_are_clamped_and_unknown_keys_dropped() {
        let e = registry()
            .resolve(
                "MOTIONBLUR",
                &[("radius", 500.0.into()), ("bogus", 1.0.into())],
            )
            .unwrap();
        assert_eq!(e.number("radius"), 100.0);
        assert!(e.get("bogus").is_none());
        assert_eq!(e.params().count(), 2);
    }

    #[test]
    fn mismatched_kind_falls_back_to_default() {
        let e = registry()
            .resolve("motionblur", &[("radius", true.into())])
            .unwrap();
        assert_eq!(e.number("radius"), 20.0);
    }

    #[test]
    fn unknown_names_fail() {
        let r = registry();
        assert_eq!(
            r.resolve("glow", &[]),
            Err(Error::UnknownFilter {
                name: "glow".into()
            })
        );
        assert!(matches!(
            r.resolve("ghost", &[]),
            Err(Error::UnknownFilter { .. })
        ));
    }
}
