//! Province name harmonization for the Indonesian ADM1 level.
//!
//! Indicator sources and boundary files spell provinces differently
//! ("DKI Jakarta", "Jakarta Capital Region", "Jawa Barat", "West Java").
//! Every name is mapped to one canonical lowercase key before it is used as
//! a [`Region`](icvi_index::Region) or matched against a boundary feature.

/// Canonical keys of the 38 provinces.
pub const PROVINCES: [&str; 38] = [
    "aceh",
    "bali",
    "bangka belitung",
    "banten",
    "bengkulu",
    "central java",
    "central kalimantan",
    "central papua",
    "central sulawesi",
    "east java",
    "east kalimantan",
    "east nusa tenggara",
    "gorontalo",
    "highland papua",
    "jakarta",
    "jambi",
    "kepulauan riau",
    "lampung",
    "maluku",
    "north kalimantan",
    "north maluku",
    "north sulawesi",
    "north sumatra",
    "papua",
    "riau",
    "south kalimantan",
    "south papua",
    "south sulawesi",
    "south sumatra",
    "southeast sulawesi",
    "southwest papua",
    "west java",
    "west kalimantan",
    "west nusa tenggara",
    "west papua",
    "west sulawesi",
    "west sumatra",
    "yogyakarta",
];

/// Spelling variants and their canonical key, after lowercasing and
/// whitespace collapsing.
const ALIASES: &[(&str, &str)] = &[
    ("dki jakarta", "jakarta"),
    ("jakarta capital region", "jakarta"),
    ("jakarta special capital region", "jakarta"),
    ("daerah istimewa yogyakarta", "yogyakarta"),
    ("di yogyakarta", "yogyakarta"),
    ("special region of yogyakarta", "yogyakarta"),
    ("bangka-belitung islands", "bangka belitung"),
    ("bangka belitung islands", "bangka belitung"),
    ("kepulauan bangka belitung", "bangka belitung"),
    ("riau islands", "kepulauan riau"),
    ("nanggroe aceh darussalam", "aceh"),
    ("jawa barat", "west java"),
    ("jawa tengah", "central java"),
    ("jawa timur", "east java"),
    ("sumatera utara", "north sumatra"),
    ("sumatera barat", "west sumatra"),
    ("sumatera selatan", "south sumatra"),
    ("north sumatera", "north sumatra"),
    ("west sumatera", "west sumatra"),
    ("south sumatera", "south sumatra"),
    ("kalimantan barat", "west kalimantan"),
    ("kalimantan tengah", "central kalimantan"),
    ("kalimantan selatan", "south kalimantan"),
    ("kalimantan timur", "east kalimantan"),
    ("kalimantan utara", "north kalimantan"),
    ("sulawesi utara", "north sulawesi"),
    ("sulawesi tengah", "central sulawesi"),
    ("sulawesi selatan", "south sulawesi"),
    ("sulawesi tenggara", "southeast sulawesi"),
    ("south east sulawesi", "southeast sulawesi"),
    ("sulawesi barat", "west sulawesi"),
    ("nusa tenggara barat", "west nusa tenggara"),
    ("nusa tenggara timur", "east nusa tenggara"),
    ("maluku utara", "north maluku"),
    ("papua barat", "west papua"),
    ("papua barat daya", "southwest papua"),
    ("papua selatan", "south papua"),
    ("papua tengah", "central papua"),
    ("papua pegunungan", "highland papua"),
];

/// Map a province name to its canonical key.
///
/// Trims, lowercases and collapses internal whitespace, then resolves known
/// spelling variants. Names that are neither canonical nor a known variant
/// are returned in their cleaned form.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let cleaned = name
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned
        .strip_prefix("provinsi ")
        .map_or(cleaned.as_str(), str::trim_start)
        .to_string();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == cleaned)
        .map_or(cleaned, |(_, canonical)| (*canonical).to_string())
}

/// True if `name` resolves to one of the 38 provinces.
#[must_use]
pub fn is_known(name: &str) -> bool {
    PROVINCES.binary_search(&normalize_name(name).as_str()).is_ok()
}
