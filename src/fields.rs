use std::collections::HashSet;

use crate::error::ConfigurationError;

/// Numeric type of a field as the model was trained on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
}

/// Declared domain of a field. `step` is only set for stepped inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRange {
    pub min: f64,
    pub max: f64,
    pub step: Option<f64>,
}

impl FieldRange {
    pub const UNBOUNDED: FieldRange = FieldRange {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
        step: None,
    };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max, step: None }
    }

    pub const fn stepped(min: f64, max: f64, step: f64) -> Self {
        Self {
            min,
            max,
            step: Some(step),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    pub default_value: f64,
    pub description: String,
    pub range: Option<FieldRange>,
}

impl FieldDef {
    pub fn float(name: &str, default_value: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Float,
            default_value,
            description: description.to_string(),
            range: None,
        }
    }

    pub fn integer(name: &str, default_value: i64, description: &str) -> Self {
        Self {
            kind: FieldKind::Integer,
            ..Self::float(name, default_value as f64, description)
        }
    }

    pub fn with_range(mut self, range: FieldRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Effective domain: a field with no declared range is unbounded.
    pub fn domain(&self) -> FieldRange {
        self.range.unwrap_or(FieldRange::UNBOUNDED)
    }

    /// `relative_speed` -> `Relative speed`
    pub fn label(&self) -> String {
        let spaced = self.name.replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
            None => String::new(),
        }
    }

    /// Text for an input's `value` attribute. Floats keep full precision so
    /// an unedited form posts back exactly the value it was given.
    pub fn input_value(&self, value: f64) -> String {
        match self.kind {
            FieldKind::Integer => format!("{}", value as i64),
            FieldKind::Float => format!("{}", value),
        }
    }

    /// Display text: `%d` for integer fields, `%f` (six decimals) otherwise.
    pub fn format_value(&self, value: f64) -> String {
        match self.kind {
            FieldKind::Integer => format!("{}", value as i64),
            FieldKind::Float => format!("{:.6}", value),
        }
    }
}

/// One row of the constraints table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow<'a> {
    pub attribute: &'a str,
    pub description: &'a str,
    pub min: f64,
    pub max: f64,
}

/// Ordered set of the fields the model was trained on.
#[derive(Debug, Clone)]
pub struct FieldRegistry {
    fields: Vec<FieldDef>,
}

impl FieldRegistry {
    /// The shipped conjunction-event fields.
    pub fn canonical() -> Self {
        Self {
            fields: canonical_fields(),
        }
    }

    /// Builds a registry from explicit definitions and self-checks it.
    pub fn from_definitions(fields: Vec<FieldDef>) -> Result<Self, ConfigurationError> {
        let registry = Self { fields };
        registry.validate()?;
        Ok(registry)
    }

    /// Startup self-check over names, ranges and defaults.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.is_empty() {
            return Err(ConfigurationError::NoFields);
        }
        let mut seen = HashSet::with_capacity(self.fields.len());
        for f in &self.fields {
            if !seen.insert(f.name.as_str()) {
                return Err(ConfigurationError::DuplicateField(f.name.clone()));
            }
            if f.kind == FieldKind::Integer && f.default_value.fract() != 0.0 {
                return Err(ConfigurationError::NonIntegral {
                    name: f.name.clone(),
                    what: "default",
                    value: f.default_value,
                });
            }
            let Some(range) = f.range else { continue };
            if range.min.is_nan() || range.max.is_nan() || range.min > range.max {
                return Err(ConfigurationError::InvalidRange {
                    name: f.name.clone(),
                    min: range.min,
                    max: range.max,
                });
            }
            if f.kind == FieldKind::Integer {
                for (what, value) in [("min", range.min), ("max", range.max)] {
                    if value.is_finite() && value.fract() != 0.0 {
                        return Err(ConfigurationError::NonIntegral {
                            name: f.name.clone(),
                            what,
                            value,
                        });
                    }
                }
            }
            if !range.contains(f.default_value) {
                return Err(ConfigurationError::DefaultOutOfRange {
                    name: f.name.clone(),
                    default: f.default_value,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Result<&FieldDef, ConfigurationError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ConfigurationError::UnknownField(name.to_string()))
    }

    /// Defaults in registry order.
    pub fn defaults(&self) -> Vec<(&str, f64)> {
        self.fields
            .iter()
            .map(|f| (f.name.as_str(), f.default_value))
            .collect()
    }

    pub fn description(&self, name: &str) -> Result<&str, ConfigurationError> {
        self.field(name).map(|f| f.description.as_str())
    }

    /// Declared range, `None` when the field is unbounded.
    pub fn range(&self, name: &str) -> Result<Option<FieldRange>, ConfigurationError> {
        self.field(name).map(|f| f.range)
    }

    pub fn domain(&self, name: &str) -> Result<FieldRange, ConfigurationError> {
        self.field(name).map(FieldDef::domain)
    }

    pub fn display_label(&self, name: &str) -> Result<String, ConfigurationError> {
        self.field(name).map(FieldDef::label)
    }

    /// Rows for every field with a declared range, in registry order.
    pub fn constraints(&self) -> Vec<ConstraintRow<'_>> {
        self.fields
            .iter()
            .filter_map(|f| {
                f.range.map(|r| ConstraintRow {
                    attribute: &f.name,
                    description: &f.description,
                    min: r.min,
                    max: r.max,
                })
            })
            .collect()
    }
}

fn canonical_fields() -> Vec<FieldDef> {
    const VEL: FieldRange = FieldRange::new(-30000.0, 30000.0);
    const SMA: FieldRange = FieldRange::new(6000.0, 45000.0);
    const OD_SPAN: FieldRange = FieldRange::new(0.0, 60.0);
    const UNIT: FieldRange = FieldRange::new(-1.0, 1.0);
    const HEIGHT: FieldRange = FieldRange::new(0.0, 4000.0);

    vec![
        FieldDef::integer("event_id", 0, "Unique identifier for the event.")
            .with_range(FieldRange::stepped(0.0, 1_000_000.0, 1.0)),
        FieldDef::float(
            "relative_speed",
            13792.0,
            "Relative speed between the objects involved in the event (m/s).",
        )
        .with_range(FieldRange::new(0.0, 30000.0)),
        FieldDef::float(
            "relative_velocity_t",
            -12637.0,
            "Tangential component of the relative velocity (m/s).",
        )
        .with_range(VEL),
        FieldDef::float(
            "relative_velocity_n",
            -5525.9,
            "Normal component of the relative velocity (m/s).",
        )
        .with_range(VEL),
        FieldDef::float(
            "t_j2k_sma",
            6996.918867,
            "Semi-major axis of the object's orbit in the J2000 reference frame (km).",
        )
        .with_range(SMA),
        FieldDef::float(
            "t_j2k_ecc",
            0.003996555165,
            "Orbital eccentricity of the object in the J2000 reference frame.",
        )
        .with_range(FieldRange::new(0.0, 1.0)),
        FieldDef::float(
            "c_recommended_od_span",
            15.85,
            "Recommended operational duration span for the event (minutes).",
        )
        .with_range(OD_SPAN),
        FieldDef::float(
            "c_actual_od_span",
            15.85,
            "Actual operational duration span for the event (minutes).",
        )
        .with_range(OD_SPAN),
        FieldDef::float(
            "c_cd_area_over_mass",
            0.348701,
            "Area-to-mass ratio of the object at the event time (m²/kg).",
        )
        .with_range(FieldRange::new(0.0, 10.0)),
        FieldDef::float(
            "c_j2k_sma",
            7006.60732,
            "Semi-major axis of the object's orbit in the J2000 reference frame (km).",
        )
        .with_range(SMA),
        FieldDef::float(
            "c_j2k_inc",
            74.04573457,
            "Inclination of the object's orbit in the J2000 reference frame (degrees).",
        )
        .with_range(FieldRange::new(0.0, 180.0)),
        FieldDef::float(
            "c_cn_r",
            0.4739756563,
            "A specific parameter related to the object's relative motion.",
        )
        .with_range(UNIT),
        FieldDef::float(
            "c_ctdot_n",
            -0.8142492109,
            "Another component of the object's motion at the event time.",
        )
        .with_range(UNIT),
        FieldDef::float(
            "c_cndot_r",
            0.2498551603,
            "Rate of change of a certain object-related parameter.",
        )
        .with_range(UNIT),
        FieldDef::float(
            "c_cndot_n",
            0.7221862484,
            "Another rate of change of a specific object-related parameter.",
        )
        .with_range(UNIT),
        FieldDef::float(
            "c_cndot_tdot",
            -0.6684865872,
            "Another rate of change of the object's parameter.",
        )
        .with_range(UNIT),
        FieldDef::float(
            "t_h_apo",
            646.7454388,
            "Apogee height of the object's orbit at the event time (km).",
        )
        .with_range(HEIGHT),
        FieldDef::float(
            "t_h_per",
            590.8182944,
            "Perigee height of the object's orbit at the event time (km).",
        )
        .with_range(HEIGHT),
        FieldDef::float(
            "c_h_per",
            606.4433894,
            "A specific parameter for the object's perigee in the event (km).",
        )
        .with_range(HEIGHT),
        FieldDef::float(
            "geocentric_latitude",
            -73.57409487,
            "Latitude in the geocentric reference frame (degrees).",
        )
        .with_range(FieldRange::new(-90.0, 90.0)),
        FieldDef::float(
            "azimuth",
            -23.61876887,
            "Azimuthal angle at the event time (degrees).",
        )
        .with_range(FieldRange::new(-180.0, 180.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_registry_passes_self_check() {
        let reg = FieldRegistry::canonical();
        reg.validate().expect("shipped registry must be valid");
        assert_eq!(reg.len(), 21);
        assert_eq!(reg.names().next(), Some("event_id"));
        assert_eq!(reg.names().last(), Some("azimuth"));
    }

    #[test]
    fn defaults_descriptions_and_ranges_share_keys() {
        let reg = FieldRegistry::canonical();
        let defaults = reg.defaults();
        assert_eq!(defaults.len(), reg.len());
        for (name, _) in &defaults {
            assert!(!reg.description(name).unwrap().is_empty());
            assert!(reg.range(name).unwrap().is_some(), "{name} has no range");
        }
        let constrained: Vec<&str> = reg.constraints().iter().map(|r| r.attribute).collect();
        let names: Vec<&str> = defaults.iter().map(|(n, _)| *n).collect();
        assert_eq!(constrained, names);
    }

    #[test]
    fn shipped_defaults_sit_inside_their_ranges() {
        let reg = FieldRegistry::canonical();
        for f in reg.iter() {
            let r = f.range.unwrap();
            assert!(r.min <= f.default_value && f.default_value <= r.max, "{}", f.name);
        }
    }

    #[test]
    fn event_id_is_an_integer_with_unit_step() {
        let reg = FieldRegistry::canonical();
        let f = reg.field("event_id").unwrap();
        assert_eq!(f.kind, FieldKind::Integer);
        assert_eq!(f.range.unwrap().step, Some(1.0));
        assert_eq!(f.format_value(500000.0), "500000");
        let other = reg.field("azimuth").unwrap();
        assert_eq!(other.kind, FieldKind::Float);
        assert_eq!(other.range.unwrap().step, None);
    }

    #[test]
    fn unknown_lookup_is_a_configuration_error() {
        let reg = FieldRegistry::canonical();
        assert_eq!(
            reg.description("nope"),
            Err(ConfigurationError::UnknownField("nope".into()))
        );
        assert!(reg.range("nope").is_err());
    }

    #[test]
    fn missing_range_means_unbounded() {
        let reg = FieldRegistry::from_definitions(vec![FieldDef::float("x", 3.0, "free")]).unwrap();
        assert_eq!(reg.range("x").unwrap(), None);
        let d = reg.domain("x").unwrap();
        assert!(d.is_unbounded());
        assert!(d.contains(-1e300) && d.contains(1e300));
        assert!(reg.constraints().is_empty());
    }

    #[test]
    fn self_check_rejects_bad_tables() {
        let dup = FieldRegistry::from_definitions(vec![
            FieldDef::float("a", 1.0, ""),
            FieldDef::float("a", 2.0, ""),
        ]);
        assert_eq!(dup.unwrap_err(), ConfigurationError::DuplicateField("a".into()));

        let outside = FieldRegistry::from_definitions(vec![
            FieldDef::float("a", 5.0, "").with_range(FieldRange::new(0.0, 1.0)),
        ]);
        assert!(matches!(outside, Err(ConfigurationError::DefaultOutOfRange { .. })));

        let inverted = FieldRegistry::from_definitions(vec![
            FieldDef::float("a", 0.0, "").with_range(FieldRange::new(1.0, -1.0)),
        ]);
        assert!(matches!(inverted, Err(ConfigurationError::InvalidRange { .. })));

        let fractional = FieldRegistry::from_definitions(vec![
            FieldDef::integer("id", 0, "").with_range(FieldRange::new(0.0, 9.5)),
        ]);
        assert!(matches!(fractional, Err(ConfigurationError::NonIntegral { what: "max", .. })));
    }

    #[test]
    fn empty_registry_fails_self_check() {
        assert_eq!(
            FieldRegistry::from_definitions(Vec::new()).unwrap_err(),
            ConfigurationError::NoFields
        );
    }

    #[test]
    fn input_values_keep_full_precision() {
        let reg = FieldRegistry::canonical();
        for f in reg.iter() {
            let text = f.input_value(f.default_value);
            assert_eq!(text.parse::<f64>().unwrap(), f.default_value, "{}", f.name);
        }
        let ecc = reg.field("t_j2k_ecc").unwrap();
        assert_eq!(ecc.input_value(ecc.default_value), "0.003996555165");
        assert_eq!(ecc.format_value(ecc.default_value), "0.003997");
        let id = reg.field("event_id").unwrap();
        assert_eq!(id.input_value(500000.0), "500000");
    }

    #[test]
    fn labels_are_humanized() {
        let reg = FieldRegistry::canonical();
        assert_eq!(reg.display_label("relative_speed").unwrap(), "Relative speed");
        assert_eq!(reg.display_label("t_j2k_sma").unwrap(), "T j2k sma");
    }
}
