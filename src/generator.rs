//! Per-dataset job configuration generation.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;

use crate::crab::format::render_with_banner;
use crate::crab::{CrabConfig, FieldValue};
use crate::das::{resolve_parent, DatasetCatalog};
use crate::dataset::{DataTier, SampleKind};
use crate::era::{year_of, Era};
use crate::error::{GridError, GridResult};
use crate::locator::find_pset;
use crate::manifest::{Manifest, Metadata};
use crate::settings::Settings;

/// Where and for whom configurations are produced.
#[derive(Debug, Clone)]
pub struct JobTarget {
    pub site: String,
    pub output_dir: PathBuf,
    pub user: String,
    /// Root of the pset search.
    pub pset_root: PathBuf,
}

/// Outcome for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedJob {
    pub era: String,
    pub requested: String,
    pub dataset: String,
    pub kind: SampleKind,
    pub request_name: String,
    pub path: PathBuf,
}

/// Inputs of [`build_job_config`] besides the template.
#[derive(Debug, Clone)]
pub struct JobRequest<'a> {
    pub pset: &'a Path,
    pub dataset: &'a str,
    pub era: &'a str,
    pub site: &'a str,
    pub user: &'a str,
}

/// Names derived from the production tag and dataset metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Naming {
    pub request_name: String,
    pub output_dataset_tag: String,
    pub out_lfn_dir_base: String,
}

impl Naming {
    pub fn new(settings: &Settings, name: &str, year: &str, user: &str) -> Self {
        let product = format!("{}{}", settings.request_prefix, settings.product_tag);
        Self {
            request_name: format!("{}_{}__{}", product, name, year),
            output_dataset_tag: format!("{}_{}", product, year),
            out_lfn_dir_base: format!(
                "/store/user/{}/{}/{}/{}/",
                user, settings.lfn_area, settings.product_tag, year
            ),
        }
    }
}

/// Build the resolved configuration for one dataset.
///
/// `metadata` is consumed: `name` feeds the naming, every other key is a
/// dotted override applied last. Names use the digits of the era only.
pub fn build_job_config(
    template: &CrabConfig,
    settings: &Settings,
    request: &JobRequest<'_>,
    mut metadata: Metadata,
) -> GridResult<CrabConfig> {
    let name = match metadata.remove("name") {
        Some(JsonValue::String(name)) => name,
        Some(scalar @ (JsonValue::Number(_) | JsonValue::Bool(_))) => scalar.to_string(),
        _ => {
            return Err(GridError::MissingName {
                era: request.era.to_string(),
                dataset: request.dataset.to_string(),
            })
        }
    };
    let naming = Naming::new(settings, &name, &year_of(request.era), request.user);

    let mut config = template
        .with("JobType", "psetName", FieldValue::Str(request.pset.display().to_string()))?
        .with("General", "requestName", FieldValue::Str(naming.request_name))?
        .with("Data", "outputDatasetTag", FieldValue::Str(naming.output_dataset_tag))?
        .with("Data", "inputDataset", FieldValue::Str(request.dataset.to_string()))?
        .with("Data", "outLFNDirBase", FieldValue::Str(naming.out_lfn_dir_base))?
        .with("Site", "storageSite", FieldValue::Str(request.site.to_string()))?;

    for (path, value) in &metadata {
        config.set_path(path, value)?;
    }
    Ok(config)
}

/// Write `config` as `crab_<requestName>.py` under `output_dir`.
pub fn write_job_config(config: &CrabConfig, output_dir: &Path) -> GridResult<PathBuf> {
    let request_name = config
        .request_name()
        .ok_or_else(|| GridError::invalid_value("General.requestName", "a string", "unset"))?;
    fs::create_dir_all(output_dir).map_err(|e| GridError::io(output_dir, e))?;
    let path = output_dir.join(format!("crab_{}.py", request_name));
    let banner = format!(
        "Generated by nanogrid {} on {}",
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    fs::write(&path, render_with_banner(config, Some(&banner)))
        .map_err(|e| GridError::io(&path, e))?;
    Ok(path)
}

pub struct JobGenerator<C> {
    settings: Settings,
    target: JobTarget,
    catalog: C,
    mc_template: CrabConfig,
    data_template: CrabConfig,
}

impl<C: DatasetCatalog> JobGenerator<C> {
    pub fn new(settings: Settings, target: JobTarget, catalog: C) -> Self {
        Self {
            settings,
            target,
            catalog,
            mc_template: CrabConfig::template(SampleKind::Simulation),
            data_template: CrabConfig::template(SampleKind::Collision),
        }
    }

    pub fn template(&self, kind: SampleKind) -> &CrabConfig {
        match kind {
            SampleKind::Simulation => &self.mc_template,
            SampleKind::Collision => &self.data_template,
        }
    }

    /// Generate every dataset of the selected eras, stopping at the first
    /// error. Files written before the error stay on disk.
    pub fn run(&self, manifest: Manifest, era: Option<Era>) -> GridResult<Vec<GeneratedJob>> {
        let output_dir = &self.target.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| GridError::io(output_dir, e))?;

        let mut jobs = Vec::new();
        for entry in manifest.into_selected(era) {
            for dataset in entry.datasets {
                let job = self.process_dataset(&entry.era, &dataset.dataset, dataset.metadata)?;
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    pub fn process_dataset(
        &self,
        era: &str,
        requested: &str,
        metadata: Metadata,
    ) -> GridResult<GeneratedJob> {
        log::info!("Working on {}", requested);
        let dataset = match DataTier::of(requested) {
            DataTier::Nano => {
                log::info!("Will convert from nano to mini");
                let parent =
                    resolve_parent(&self.catalog, requested, self.settings.catalog.attempts)?;
                log::info!(" --> Found {}", parent);
                parent
            }
            DataTier::Mini | DataTier::User => requested.to_string(),
            DataTier::Other => {
                log::warn!("Dataset {} cannot be used - must be either nano or mini", requested);
                requested.to_string()
            }
        };

        let kind = SampleKind::of(&dataset);
        log::info!("Dataset is {}", if kind.is_mc() { "MC" } else { "data" });
        let pset_name = format!(
            "topNano_{}_{}_{}_cfg.py",
            self.settings.product_tag,
            era,
            kind.pset_tag()
        );
        let pset = find_pset(Path::new(&pset_name), &self.target.pset_root)?;

        let request = JobRequest {
            pset: &pset,
            dataset: &dataset,
            era,
            site: &self.target.site,
            user: &self.target.user,
        };
        let config = build_job_config(self.template(kind), &self.settings, &request, metadata)?;
        let request_name = config.request_name().unwrap_or_default().to_string();
        log::info!("Creating new task {}", request_name);

        let path = write_job_config(&config, &self.target.output_dir)?;
        log::info!("Configuration file saved as {}", path.display());

        Ok(GeneratedJob {
            era: era.to_string(),
            requested: requested.to_string(),
            dataset,
            kind,
            request_name,
            path,
        })
    }
}
