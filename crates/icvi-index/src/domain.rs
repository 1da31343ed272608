//! Domain types: regions, indicators, categories and their tags.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Calendar year of an observation.
pub type Year = u16;

/// First year of the reference panel.
pub const FIRST_YEAR: Year = 2014;

/// Last year of the reference panel.
pub const LAST_YEAR: Year = 2023;

/// A region (province) identifier.
///
/// Holds the harmonized name; callers are responsible for canonicalizing
/// spelling variants before constructing it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Region(String);

impl Region {
    /// Create a region from a non-empty name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        debug_assert!(!name.is_empty(), "region name must not be empty");
        Self(name)
    }

    /// Return the region name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An indicator identifier, e.g. `"flood_events"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct IndicatorId(String);

impl IndicatorId {
    /// Create an indicator id from a non-empty string.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        debug_assert!(!id.is_empty(), "indicator id must not be empty");
        Self(id)
    }

    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returned when a tag string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} \"{value}\"")]
pub struct ParseTagError {
    /// Which tag was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

fn tag_key(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// ESA category an indicator contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Exposure to climate hazards.
    Exposure,
    /// Sensitivity of the population and economy.
    Sensitivity,
    /// Adaptive capacity.
    AdaptiveCapacity,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 3] = [
        Category::Exposure,
        Category::Sensitivity,
        Category::AdaptiveCapacity,
    ];

    /// Snake-case name used in files and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Exposure => "exposure",
            Category::Sensitivity => "sensitivity",
            Category::AdaptiveCapacity => "adaptive_capacity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match tag_key(s).as_str() {
            "exposure" | "e" => Ok(Category::Exposure),
            "sensitivity" | "s" => Ok(Category::Sensitivity),
            "adaptivecapacity" | "ac" | "a" => Ok(Category::AdaptiveCapacity),
            _ => Err(ParseTagError {
                kind: "category",
                value: s.to_string(),
            }),
        }
    }
}

/// DPSIR class of an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dpsir {
    /// Driver.
    Driver,
    /// Pressure.
    Pressure,
    /// State.
    State,
    /// Impact.
    Impact,
    /// Response.
    Response,
}

impl Dpsir {
    /// All DPSIR classes in canonical order.
    pub const ALL: [Dpsir; 5] = [
        Dpsir::Driver,
        Dpsir::Pressure,
        Dpsir::State,
        Dpsir::Impact,
        Dpsir::Response,
    ];

    /// Snake-case name used in files and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Dpsir::Driver => "driver",
            Dpsir::Pressure => "pressure",
            Dpsir::State => "state",
            Dpsir::Impact => "impact",
            Dpsir::Response => "response",
        }
    }
}

impl fmt::Display for Dpsir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dpsir {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match tag_key(s).as_str() {
            "driver" | "drivers" | "d" => Ok(Dpsir::Driver),
            "pressure" | "pressures" | "p" => Ok(Dpsir::Pressure),
            "state" | "s" => Ok(Dpsir::State),
            "impact" | "impacts" | "i" => Ok(Dpsir::Impact),
            "response" | "responses" | "r" => Ok(Dpsir::Response),
            _ => Err(ParseTagError {
                kind: "DPSIR class",
                value: s.to_string(),
            }),
        }
    }
}

/// Direction of an indicator relative to vulnerability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Higher raw value means higher vulnerability.
    #[default]
    Positive,
    /// Higher raw value means lower vulnerability.
    Negative,
}

impl FromStr for Polarity {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => return Ok(Polarity::Positive),
            "-" => return Ok(Polarity::Negative),
            _ => {}
        }
        match tag_key(s).as_str() {
            "positive" | "pos" | "" => Ok(Polarity::Positive),
            "negative" | "neg" => Ok(Polarity::Negative),
            _ => Err(ParseTagError {
                kind: "polarity",
                value: s.to_string(),
            }),
        }
    }
}

/// A composite group: one of the three ESA categories or the ICVI itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Group {
    /// A single ESA category composite.
    Category(Category),
    /// The integrated index built from the three category composites.
    Icvi,
}

impl From<Category> for Group {
    fn from(category: Category) -> Self {
        Group::Category(category)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Category(c) => c.fmt(f),
            Group::Icvi => f.write_str("icvi"),
        }
    }
}

impl Serialize for Group {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for Group {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if tag_key(s) == "icvi" {
            return Ok(Group::Icvi);
        }
        s.parse::<Category>().map(Group::Category).map_err(|_| ParseTagError {
            kind: "group",
            value: s.to_string(),
        })
    }
}

/// Metadata attached to each indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorMeta {
    /// Indicator identifier.
    pub id: IndicatorId,
    /// ESA category.
    pub category: Category,
    /// DPSIR class.
    pub dpsir: Dpsir,
    /// Direction relative to vulnerability.
    pub polarity: Polarity,
}

impl IndicatorMeta {
    /// Create indicator metadata.
    pub fn new(id: impl Into<String>, category: Category, dpsir: Dpsir, polarity: Polarity) -> Self {
        Self {
            id: IndicatorId::new(id),
            category,
            dpsir,
            polarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_aliases() {
        assert_eq!("Exposure".parse::<Category>().unwrap(), Category::Exposure);
        assert_eq!(
            "Adaptive Capacity".parse::<Category>().unwrap(),
            Category::AdaptiveCapacity
        );
        assert_eq!("adaptive_capacity".parse::<Category>().unwrap(), Category::AdaptiveCapacity);
        assert_eq!("AC".parse::<Category>().unwrap(), Category::AdaptiveCapacity);
        assert!("hazard".parse::<Category>().is_err());
    }

    #[test]
    fn dpsir_parses_letters_and_words() {
        assert_eq!("D".parse::<Dpsir>().unwrap(), Dpsir::Driver);
        assert_eq!("Pressures".parse::<Dpsir>().unwrap(), Dpsir::Pressure);
        assert_eq!("response".parse::<Dpsir>().unwrap(), Dpsir::Response);
        let err = "X".parse::<Dpsir>().unwrap_err();
        assert_eq!(err.kind, "DPSIR class");
    }

    #[test]
    fn polarity_defaults_to_positive_on_blank() {
        assert_eq!("".parse::<Polarity>().unwrap(), Polarity::Positive);
        assert_eq!("-".parse::<Polarity>().unwrap(), Polarity::Negative);
        assert_eq!(Polarity::default(), Polarity::Positive);
    }

    #[test]
    fn group_parses_icvi_and_categories() {
        assert_eq!("ICVI".parse::<Group>().unwrap(), Group::Icvi);
        assert_eq!(
            "sensitivity".parse::<Group>().unwrap(),
            Group::Category(Category::Sensitivity)
        );
        assert_eq!(Group::from(Category::Exposure).to_string(), "exposure");
    }
}
