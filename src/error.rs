use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Failed to read manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected manifest layout in {path}: {details}")]
    ManifestShape {
        path: PathBuf,
        details: String,
    },

    #[error("Dataset {dataset} ({era}) has no usable 'name' entry")]
    MissingName {
        era: String,
        dataset: String,
    },

    #[error("Failed retrieving parent dataset from DAS (status '{status}'): {details}")]
    CatalogStatus {
        query: String,
        status: String,
        details: String,
    },

    #[error("DAS request for '{query}' failed: {message}")]
    CatalogTransport {
        query: String,
        message: String,
    },

    #[error("DAS returned {found} {what} for {dataset}, expected exactly one")]
    CatalogCardinality {
        dataset: String,
        what: &'static str,
        found: usize,
    },

    #[error("Configuration file {filename:?} not found")]
    PsetNotFound {
        filename: String,
        root: PathBuf,
    },

    #[error("Unknown configuration section '{section}'")]
    UnknownSection {
        section: String,
    },

    #[error("Unknown configuration field '{section}.{field}'")]
    UnknownField {
        section: String,
        field: String,
        known: Vec<&'static str>,
    },

    #[error("Invalid value for '{path}': expected {expected}, found {found}")]
    InvalidFieldValue {
        path: String,
        expected: &'static str,
        found: String,
    },

    #[error("Job configuration syntax error: {message}")]
    ConfigSyntax {
        message: String,
    },

    #[error("Invalid settings file {path}: {message}")]
    Settings {
        path: PathBuf,
        message: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Submission of {path} failed: {message}")]
    Submission {
        path: PathBuf,
        message: String,
    },
}

impl GridError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn catalog_status(
        query: impl Into<String>,
        status: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::CatalogStatus {
            query: query.into(),
            status: status.into(),
            details: details.into(),
        }
    }

    pub fn catalog_transport(query: impl Into<String>, message: impl ToString) -> Self {
        Self::CatalogTransport {
            query: query.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_value(
        path: impl Into<String>,
        expected: &'static str,
        found: impl ToString,
    ) -> Self {
        Self::InvalidFieldValue {
            path: path.into(),
            expected,
            found: found.to_string(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::ConfigSyntax { message: message.into() }
    }

    /// Hint printed below the error by the command-line front end.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::ManifestIo { path, .. } => {
                Some(format!("Check that {} exists and is readable", path.display()))
            }
            Self::ManifestParse { .. } | Self::ManifestShape { .. } => Some(
                "Manifests must look like { era: { dataset: { \"name\": ... } } }".to_string(),
            ),
            Self::MissingName { .. } => {
                Some("Add a string or number \"name\" entry to the dataset metadata".to_string())
            }
            Self::CatalogStatus { .. } | Self::CatalogTransport { .. } => Some(
                "Make sure a valid grid proxy exists (voms-proxy-init) and DAS is reachable"
                    .to_string(),
            ),
            Self::CatalogCardinality { dataset, .. } => {
                Some(format!("Query DAS manually: dasgoclient -query 'parent dataset={}'", dataset))
            }
            Self::PsetNotFound { root, .. } => Some(format!(
                "Generate the configuration first or check the search root {}",
                root.display()
            )),
            Self::UnknownSection { .. } => {
                Some("Known sections: General, JobType, Data, Site, User".to_string())
            }
            Self::UnknownField { section, known, .. } => {
                Some(format!("Known {} fields: {}", section, known.join(", ")))
            }
            Self::InvalidFieldValue { .. } => None,
            Self::ConfigSyntax { .. } => None,
            Self::Settings { .. } => None,
            Self::Io { .. } => None,
            Self::Submission { .. } => {
                Some("Run 'crab submit' by hand to see the full client output".to_string())
            }
        }
    }
}

/// Result type for job generation
pub type GridResult<T> = std::result::Result<T, GridError>;
