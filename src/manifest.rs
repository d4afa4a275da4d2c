//! Dataset manifests.
//!
//! A manifest is a JSON object `{ era: { dataset: { "name": ..., overrides } } }`.
//! Several manifests merge by era: an era seen again replaces the earlier
//! one wholesale while keeping its position.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use crate::era::Era;
use crate::error::{GridError, GridResult};

/// Per-dataset metadata: the mandatory `name` plus dotted overrides.
pub type Metadata = Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub dataset: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EraEntry {
    pub era: String,
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    eras: Vec<EraEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and merge manifests in order.
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> GridResult<Self> {
        let mut manifest = Manifest::new();
        for path in paths {
            let loaded = Manifest::load(path)?;
            manifest.merge(loaded);
        }
        Ok(manifest)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> GridResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| GridError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Manifest::from_json_str(&content, path)?;
        log::debug!("Loaded {} era(s) from {}", manifest.eras.len(), path.display());
        Ok(manifest)
    }

    /// `origin` is only used in error messages.
    pub fn from_json_str(content: &str, origin: &Path) -> GridResult<Self> {
        let root: Map<String, JsonValue> =
            serde_json::from_str(content).map_err(|source| GridError::ManifestParse {
                path: origin.to_path_buf(),
                source,
            })?;
        let shape_error = |details: String| GridError::ManifestShape {
            path: origin.to_path_buf(),
            details,
        };
        let mut eras = Vec::with_capacity(root.len());
        for (era, datasets) in root {
            let datasets = match datasets {
                JsonValue::Object(map) => map,
                other => {
                    return Err(shape_error(format!(
                        "era '{}' must map to an object, found {}",
                        era,
                        json_kind(&other)
                    )))
                }
            };
            let mut entries = Vec::with_capacity(datasets.len());
            for (dataset, metadata) in datasets {
                match metadata {
                    JsonValue::Object(metadata) => entries.push(DatasetEntry { dataset, metadata }),
                    other => {
                        return Err(shape_error(format!(
                            "metadata of {} must be an object, found {}",
                            dataset,
                            json_kind(&other)
                        )))
                    }
                }
            }
            eras.push(EraEntry { era, datasets: entries });
        }
        Ok(Self { eras })
    }

    pub fn merge(&mut self, other: Manifest) {
        for incoming in other.eras {
            match self.eras.iter_mut().find(|e| e.era == incoming.era) {
                Some(existing) => {
                    log::warn!(
                        "Era '{}' defined in several manifests; the later one replaces {} dataset(s)",
                        incoming.era,
                        existing.datasets.len()
                    );
                    *existing = incoming;
                }
                None => self.eras.push(incoming),
            }
        }
    }

    pub fn eras(&self) -> &[EraEntry] {
        &self.eras
    }

    /// Consume the manifest, keeping the eras an optional filter matches.
    pub fn into_selected(self, filter: Option<Era>) -> impl Iterator<Item = EraEntry> {
        self.eras.into_iter().filter(move |entry| {
            let keep = filter.map_or(true, |era| era.matches(&entry.era));
            if !keep {
                log::debug!("Skipping era {}", entry.era);
            }
            keep
        })
    }

    pub fn dataset_count(&self) -> usize {
        self.eras.iter().map(|e| e.datasets.len()).sum()
    }

}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Origin reported for manifests built from memory.
#[cfg(test)]
pub(crate) fn inline_origin() -> std::path::PathBuf {
    std::path::PathBuf::from("<inline>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_keeps_file_order() {
        let manifest = Manifest::from_json_str(
            r#"{"2018": {"/Z/b/MINIAODSIM": {"name": "Z"}, "/A/b/MINIAODSIM": {"name": "A"}},
                "2016": {}}"#,
            &inline_origin(),
        )
        .unwrap();
        let eras: Vec<_> = manifest.eras().iter().map(|e| e.era.as_str()).collect();
        assert_eq!(eras, vec!["2018", "2016"]);
        let datasets: Vec<_> =
            manifest.eras()[0].datasets.iter().map(|d| d.dataset.as_str()).collect();
        assert_eq!(datasets, vec!["/Z/b/MINIAODSIM", "/A/b/MINIAODSIM"]);
    }

    #[test]
    fn test_later_manifest_replaces_whole_era() {
        let dir = TempDir::new().unwrap();
        let first = write(
            &dir,
            "first.json",
            r#"{"2017": {"/A/x/MINIAODSIM": {"name": "A"}, "/B/x/MINIAODSIM": {"name": "B"}},
                "2018": {"/C/x/MINIAODSIM": {"name": "C"}}}"#,
        );
        let second = write(&dir, "second.json", r#"{"2017": {"/D/x/MINIAODSIM": {"name": "D"}}}"#);

        let manifest = Manifest::load_all(&[first, second]).unwrap();
        let eras: Vec<_> = manifest.eras().iter().map(|e| e.era.as_str()).collect();
        assert_eq!(eras, vec!["2017", "2018"]);
        assert_eq!(manifest.eras()[0].datasets.len(), 1);
        assert_eq!(manifest.eras()[0].datasets[0].dataset, "/D/x/MINIAODSIM");
        assert_eq!(manifest.dataset_count(), 2);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load_all(&[dir.path().join("nope.json")]).unwrap_err();
        assert!(matches!(err, GridError::ManifestIo { .. }));
    }

    #[test]
    fn test_malformed_json_fails() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.json", r#"{"2017": {"#);
        let err = Manifest::load(&bad).unwrap_err();
        assert!(matches!(err, GridError::ManifestParse { .. }));
    }

    #[test]
    fn test_wrong_shape_fails() {
        let err = Manifest::from_json_str(r#"{"2017": ["/A/x/MINIAOD"]}"#, &inline_origin())
            .unwrap_err();
        match err {
            GridError::ManifestShape { details, .. } => {
                assert_eq!(details, "era '2017' must map to an object, found an array")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_era_filter() {
        let manifest = Manifest::from_json_str(
            r#"{"2017": {}, "2018": {}, "2018D": {}}"#,
            &inline_origin(),
        )
        .unwrap();
        let all: Vec<_> = manifest.clone().into_selected(None).map(|e| e.era).collect();
        assert_eq!(all, vec!["2017", "2018", "2018D"]);
        let only: Vec<_> = manifest.into_selected(Some(Era::Run2018)).map(|e| e.era).collect();
        assert_eq!(only, vec!["2018"]);
    }
}
