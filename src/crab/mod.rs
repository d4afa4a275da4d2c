//! Typed grid-job configuration.
//!
//! Sections and field names follow the submission client's own spelling
//! (`config.Data.unitsPerJob`), while the Rust structs use snake case.
//! Every dynamic access goes through [`CrabConfig::slot_mut`] and
//! [`CrabConfig::get`], so unknown sections and fields are rejected instead
//! of being created on the fly.

pub mod format;

use serde_json::Value as JsonValue;

use crate::dataset::SampleKind;
use crate::error::{GridError, GridResult};

/// Section and field names in render order.
pub const SCHEMA: &[(&str, &[&str])] = &[
    ("General", &["requestName", "workArea", "transferOutputs", "transferLogs", "instance"]),
    (
        "JobType",
        &[
            "pluginName",
            "psetName",
            "pyCfgParams",
            "inputFiles",
            "outputFiles",
            "allowUndistributedCMSSW",
            "maxMemoryMB",
            "numCores",
            "maxJobRuntimeMin",
            "sendExternalFolder",
        ],
    ),
    (
        "Data",
        &[
            "inputDataset",
            "inputDBS",
            "splitting",
            "unitsPerJob",
            "totalUnits",
            "lumiMask",
            "runRange",
            "publication",
            "outputDatasetTag",
            "outLFNDirBase",
            "ignoreLocality",
            "allowNonValidInputDataset",
        ],
    ),
    ("Site", &["storageSite", "whitelist", "blacklist"]),
    ("User", &["voGroup", "voRole"]),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct General {
    pub request_name: Option<String>,
    pub work_area: Option<String>,
    pub transfer_outputs: Option<bool>,
    pub transfer_logs: Option<bool>,
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobType {
    pub plugin_name: Option<String>,
    pub pset_name: Option<String>,
    pub py_cfg_params: Option<Vec<String>>,
    pub input_files: Option<Vec<String>>,
    pub output_files: Option<Vec<String>>,
    pub allow_undistributed_cmssw: Option<bool>,
    pub max_memory_mb: Option<i64>,
    pub num_cores: Option<i64>,
    pub max_job_runtime_min: Option<i64>,
    pub send_external_folder: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Data {
    pub input_dataset: Option<String>,
    pub input_dbs: Option<String>,
    pub splitting: Option<String>,
    pub units_per_job: Option<i64>,
    pub total_units: Option<i64>,
    pub lumi_mask: Option<String>,
    pub run_range: Option<String>,
    pub publication: Option<bool>,
    pub output_dataset_tag: Option<String>,
    pub out_lfn_dir_base: Option<String>,
    pub ignore_locality: Option<bool>,
    pub allow_non_valid_input_dataset: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Site {
    pub storage_site: Option<String>,
    pub whitelist: Option<Vec<String>>,
    pub blacklist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub vo_group: Option<String>,
    pub vo_role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrabConfig {
    pub general: General,
    pub job_type: JobType,
    pub data: Data,
    pub site: Site,
    pub user: User,
}

/// A field value independent of its slot.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl FieldValue {
    /// Convert a manifest override. `null` maps to `None` (unset).
    pub fn from_json(path: &str, value: &JsonValue) -> GridResult<Option<Self>> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(s) => Ok(Some(FieldValue::Str(s.clone()))),
            JsonValue::Bool(b) => Ok(Some(FieldValue::Bool(*b))),
            JsonValue::Number(n) => n
                .as_i64()
                .map(|i| Some(FieldValue::Int(i)))
                .ok_or_else(|| GridError::invalid_value(path, "an integer", n)),
            JsonValue::Array(items) => items
                .iter()
                .map(|item| match item {
                    JsonValue::String(s) => Ok(s.clone()),
                    other => Err(GridError::invalid_value(path, "a list of strings", other)),
                })
                .collect::<GridResult<Vec<_>>>()
                .map(|list| Some(FieldValue::List(list))),
            JsonValue::Object(_) => Err(GridError::invalid_value(path, "a scalar or list", value)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Str(_) => "a string",
            FieldValue::Int(_) => "an integer",
            FieldValue::Bool(_) => "a boolean",
            FieldValue::List(_) => "a list of strings",
        }
    }
}

/// Mutable handle on one typed field.
pub enum Slot<'a> {
    Str(&'a mut Option<String>),
    Int(&'a mut Option<i64>),
    Bool(&'a mut Option<bool>),
    List(&'a mut Option<Vec<String>>),
}

impl Slot<'_> {
    fn expected(&self) -> &'static str {
        match self {
            Slot::Str(_) => "a string",
            Slot::Int(_) => "an integer",
            Slot::Bool(_) => "a boolean",
            Slot::List(_) => "a list of strings",
        }
    }

    /// Store `value`, or clear the field on `None`.
    pub fn assign(self, path: &str, value: Option<FieldValue>) -> GridResult<()> {
        let expected = self.expected();
        match (self, value) {
            (Slot::Str(slot), None) => *slot = None,
            (Slot::Int(slot), None) => *slot = None,
            (Slot::Bool(slot), None) => *slot = None,
            (Slot::List(slot), None) => *slot = None,
            (Slot::Str(slot), Some(FieldValue::Str(v))) => *slot = Some(v),
            (Slot::Int(slot), Some(FieldValue::Int(v))) => *slot = Some(v),
            (Slot::Bool(slot), Some(FieldValue::Bool(v))) => *slot = Some(v),
            (Slot::List(slot), Some(FieldValue::List(v))) => *slot = Some(v),
            (_, Some(other)) => {
                return Err(GridError::invalid_value(path, expected, other.kind()));
            }
        }
        Ok(())
    }
}

fn known_fields(section: &str) -> Option<&'static [&'static str]> {
    SCHEMA.iter().find(|(name, _)| *name == section).map(|(_, fields)| *fields)
}

impl CrabConfig {
    /// Framework defaults shared by every job, plus the splitting that
    /// depends on the sample kind.
    pub fn template(kind: SampleKind) -> Self {
        let (splitting, units_per_job) = match kind {
            SampleKind::Simulation => ("EventAwareLumiBased", 300_000),
            SampleKind::Collision => ("LumiBased", 650),
        };
        Self {
            general: General {
                work_area: Some("tasks".to_string()),
                transfer_outputs: Some(true),
                transfer_logs: Some(true),
                ..Default::default()
            },
            job_type: JobType {
                plugin_name: Some("Analysis".to_string()),
                allow_undistributed_cmssw: Some(true),
                max_memory_mb: Some(5000),
                num_cores: Some(2),
                ..Default::default()
            },
            data: Data {
                input_dbs: Some("global".to_string()),
                publication: Some(true),
                splitting: Some(splitting.to_string()),
                units_per_job: Some(units_per_job),
                ..Default::default()
            },
            site: Site::default(),
            user: User::default(),
        }
    }

    pub fn slot_mut(&mut self, section: &str, field: &str) -> GridResult<Slot<'_>> {
        let slot = match (section, field) {
            ("General", "requestName") => Slot::Str(&mut self.general.request_name),
            ("General", "workArea") => Slot::Str(&mut self.general.work_area),
            ("General", "transferOutputs") => Slot::Bool(&mut self.general.transfer_outputs),
            ("General", "transferLogs") => Slot::Bool(&mut self.general.transfer_logs),
            ("General", "instance") => Slot::Str(&mut self.general.instance),
            ("JobType", "pluginName") => Slot::Str(&mut self.job_type.plugin_name),
            ("JobType", "psetName") => Slot::Str(&mut self.job_type.pset_name),
            ("JobType", "pyCfgParams") => Slot::List(&mut self.job_type.py_cfg_params),
            ("JobType", "inputFiles") => Slot::List(&mut self.job_type.input_files),
            ("JobType", "outputFiles") => Slot::List(&mut self.job_type.output_files),
            ("JobType", "allowUndistributedCMSSW") => {
                Slot::Bool(&mut self.job_type.allow_undistributed_cmssw)
            }
            ("JobType", "maxMemoryMB") => Slot::Int(&mut self.job_type.max_memory_mb),
            ("JobType", "numCores") => Slot::Int(&mut self.job_type.num_cores),
            ("JobType", "maxJobRuntimeMin") => Slot::Int(&mut self.job_type.max_job_runtime_min),
            ("JobType", "sendExternalFolder") => {
                Slot::Bool(&mut self.job_type.send_external_folder)
            }
            ("Data", "inputDataset") => Slot::Str(&mut self.data.input_dataset),
            ("Data", "inputDBS") => Slot::Str(&mut self.data.input_dbs),
            ("Data", "splitting") => Slot::Str(&mut self.data.splitting),
            ("Data", "unitsPerJob") => Slot::Int(&mut self.data.units_per_job),
            ("Data", "totalUnits") => Slot::Int(&mut self.data.total_units),
            ("Data", "lumiMask") => Slot::Str(&mut self.data.lumi_mask),
            ("Data", "runRange") => Slot::Str(&mut self.data.run_range),
            ("Data", "publication") => Slot::Bool(&mut self.data.publication),
            ("Data", "outputDatasetTag") => Slot::Str(&mut self.data.output_dataset_tag),
            ("Data", "outLFNDirBase") => Slot::Str(&mut self.data.out_lfn_dir_base),
            ("Data", "ignoreLocality") => Slot::Bool(&mut self.data.ignore_locality),
            ("Data", "allowNonValidInputDataset") => {
                Slot::Bool(&mut self.data.allow_non_valid_input_dataset)
            }
            ("Site", "storageSite") => Slot::Str(&mut self.site.storage_site),
            ("Site", "whitelist") => Slot::List(&mut self.site.whitelist),
            ("Site", "blacklist") => Slot::List(&mut self.site.blacklist),
            ("User", "voGroup") => Slot::Str(&mut self.user.vo_group),
            ("User", "voRole") => Slot::Str(&mut self.user.vo_role),
            _ => return Err(unknown(section, field)),
        };
        Ok(slot)
    }

    pub fn get(&self, section: &str, field: &str) -> GridResult<Option<FieldValue>> {
        fn s(v: &Option<String>) -> Option<FieldValue> {
            v.clone().map(FieldValue::Str)
        }
        fn i(v: &Option<i64>) -> Option<FieldValue> {
            v.map(FieldValue::Int)
        }
        fn b(v: &Option<bool>) -> Option<FieldValue> {
            v.map(FieldValue::Bool)
        }
        fn l(v: &Option<Vec<String>>) -> Option<FieldValue> {
            v.clone().map(FieldValue::List)
        }
        let value = match (section, field) {
            ("General", "requestName") => s(&self.general.request_name),
            ("General", "workArea") => s(&self.general.work_area),
            ("General", "transferOutputs") => b(&self.general.transfer_outputs),
            ("General", "transferLogs") => b(&self.general.transfer_logs),
            ("General", "instance") => s(&self.general.instance),
            ("JobType", "pluginName") => s(&self.job_type.plugin_name),
            ("JobType", "psetName") => s(&self.job_type.pset_name),
            ("JobType", "pyCfgParams") => l(&self.job_type.py_cfg_params),
            ("JobType", "inputFiles") => l(&self.job_type.input_files),
            ("JobType", "outputFiles") => l(&self.job_type.output_files),
            ("JobType", "allowUndistributedCMSSW") => b(&self.job_type.allow_undistributed_cmssw),
            ("JobType", "maxMemoryMB") => i(&self.job_type.max_memory_mb),
            ("JobType", "numCores") => i(&self.job_type.num_cores),
            ("JobType", "maxJobRuntimeMin") => i(&self.job_type.max_job_runtime_min),
            ("JobType", "sendExternalFolder") => b(&self.job_type.send_external_folder),
            ("Data", "inputDataset") => s(&self.data.input_dataset),
            ("Data", "inputDBS") => s(&self.data.input_dbs),
            ("Data", "splitting") => s(&self.data.splitting),
            ("Data", "unitsPerJob") => i(&self.data.units_per_job),
            ("Data", "totalUnits") => i(&self.data.total_units),
            ("Data", "lumiMask") => s(&self.data.lumi_mask),
            ("Data", "runRange") => s(&self.data.run_range),
            ("Data", "publication") => b(&self.data.publication),
            ("Data", "outputDatasetTag") => s(&self.data.output_dataset_tag),
            ("Data", "outLFNDirBase") => s(&self.data.out_lfn_dir_base),
            ("Data", "ignoreLocality") => b(&self.data.ignore_locality),
            ("Data", "allowNonValidInputDataset") => b(&self.data.allow_non_valid_input_dataset),
            ("Site", "storageSite") => s(&self.site.storage_site),
            ("Site", "whitelist") => l(&self.site.whitelist),
            ("Site", "blacklist") => l(&self.site.blacklist),
            ("User", "voGroup") => s(&self.user.vo_group),
            ("User", "voRole") => s(&self.user.vo_role),
            _ => return Err(unknown(section, field)),
        };
        Ok(value)
    }

    /// Apply a dotted `Section.field` override from a manifest.
    ///
    /// Only the first dot separates section from field, so deeper paths are
    /// reported as unknown fields.
    pub fn set_path(&mut self, path: &str, value: &JsonValue) -> GridResult<()> {
        let (section, field) = path.split_once('.').ok_or_else(|| {
            GridError::invalid_value(path, "a 'Section.field' key", "no '.' separator")
        })?;
        let value = FieldValue::from_json(path, value)?;
        self.slot_mut(section, field)?.assign(path, value)
    }

    /// Functional update: a copy with one override applied.
    pub fn with(&self, section: &str, field: &str, value: FieldValue) -> GridResult<Self> {
        let mut updated = self.clone();
        let path = format!("{}.{}", section, field);
        updated.slot_mut(section, field)?.assign(&path, Some(value))?;
        Ok(updated)
    }

    pub fn request_name(&self) -> Option<&str> {
        self.general.request_name.as_deref()
    }
}

fn unknown(section: &str, field: &str) -> GridError {
    match known_fields(section) {
        Some(known) => GridError::UnknownField {
            section: section.to_string(),
            field: field.to_string(),
            known: known.to_vec(),
        },
        None => GridError::UnknownSection { section: section.to_string() },
    }
}
