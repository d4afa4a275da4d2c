//! Grid job configuration generator for top-quark NanoAOD production.
//!
//! Manifests list datasets per era; every dataset becomes one
//! `crab_<requestName>.py` file ready for `crab submit`.

pub mod crab;
pub mod das;
pub mod dataset;
pub mod era;
pub mod error;
pub mod generator;
pub mod locator;
pub mod manifest;
pub mod retry;
pub mod settings;
#[cfg(feature = "cli")]
pub mod submit;

pub use crab::{CrabConfig, FieldValue};
#[cfg(feature = "das")]
pub use das::DasClient;
pub use das::{resolve_parent, CatalogResponse, DatasetCatalog};
pub use dataset::{DataTier, SampleKind};
pub use era::Era;
pub use error::{GridError, GridResult};
pub use generator::{build_job_config, write_job_config, GeneratedJob, JobGenerator, JobTarget};
pub use manifest::Manifest;
pub use settings::Settings;
