//! GeoJSON boundary reader.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::IoError;

/// Property holding the province name in geoBoundaries ADM1 files.
pub const DEFAULT_NAME_PROPERTY: &str = "shapeName";

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Reads feature names from a GeoJSON `FeatureCollection`.
///
/// Geometry is ignored; only `features[].properties.<name_property>` is
/// read. Features without a string name are skipped with a warning.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::GeoJson`] | Not valid JSON, or no `features` array |
pub struct BoundaryReader {
    path: PathBuf,
    name_property: String,
}

impl BoundaryReader {
    /// Create a reader for the given GeoJSON file, reading `shapeName`.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            name_property: DEFAULT_NAME_PROPERTY.to_string(),
        }
    }

    /// Read names from a different feature property.
    #[must_use]
    pub fn with_name_property(mut self, property: impl Into<String>) -> Self {
        self.name_property = property.into();
        self
    }

    /// Read the feature names in file order.
    #[instrument(skip(self), fields(path = %self.path.display(), property = %self.name_property))]
    pub fn read(&self) -> Result<Vec<String>, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let collection: FeatureCollection = serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| IoError::GeoJson {
                path: self.path.clone(),
                source: e,
            })?;

        let n_features = collection.features.len();
        let names: Vec<String> = collection
            .features
            .into_iter()
            .filter_map(|f| {
                f.properties?
                    .get(&self.name_property)?
                    .as_str()
                    .map(str::to_string)
            })
            .collect();

        if names.len() < n_features {
            warn!(
                skipped = n_features - names.len(),
                "features without a name property"
            );
        }
        info!(n_features, n_named = names.len(), "boundaries loaded");
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_json(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn reads_shape_names() {
        let f = write_json(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{"shapeName":"Aceh"},"geometry":null},
                {"type":"Feature","properties":{"shapeName":"Riau Islands"},"geometry":null},
                {"type":"Feature","properties":{},"geometry":null},
                {"type":"Feature","properties":null,"geometry":null}
            ]}"#,
        );
        let names = BoundaryReader::new(f.path()).read().unwrap();
        assert_eq!(names, vec!["Aceh", "Riau Islands"]);
    }

    #[test]
    fn custom_property() {
        let f = write_json(r#"{"features":[{"properties":{"NAME_1":"Bali"}}]}"#);
        let names = BoundaryReader::new(f.path())
            .with_name_property("NAME_1")
            .read()
            .unwrap();
        assert_eq!(names, vec!["Bali"]);
    }

    #[test]
    fn missing_features_is_error() {
        let f = write_json(r#"{"type":"Feature"}"#);
        let err = BoundaryReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::GeoJson { .. }));
    }

    #[test]
    fn not_json() {
        let f = write_json("province,year\n");
        assert!(matches!(
            BoundaryReader::new(f.path()).read(),
            Err(IoError::GeoJson { .. })
        ));
    }
}
