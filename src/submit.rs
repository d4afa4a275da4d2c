//! Hand generated configurations to the submission client.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{GridError, GridResult};

pub struct CrabSubmitter {
    executable: PathBuf,
}

impl CrabSubmitter {
    /// Find `crab` on `PATH`.
    pub fn locate() -> GridResult<Self> {
        let executable = which::which("crab").map_err(|e| GridError::Submission {
            path: PathBuf::from("crab"),
            message: format!("submission client not found ({}); source the CRAB environment first", e),
        })?;
        Ok(Self::with_executable(executable))
    }

    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self { executable: executable.into() }
    }

    pub fn command(&self, config: &Path) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg("submit").arg("--config").arg(config);
        command
    }

    pub fn submit(&self, config: &Path) -> GridResult<()> {
        log::info!("Submitting {}", config.display());
        let status = self
            .command(config)
            .status()
            .map_err(|e| GridError::Submission {
                path: config.to_path_buf(),
                message: e.to_string(),
            })?;
        if !status.success() {
            return Err(GridError::Submission {
                path: config.to_path_buf(),
                message: format!(
                    "{} exited with code {}",
                    self.executable.display(),
                    status.code().unwrap_or(-1)
                ),
            });
        }
        Ok(())
    }
}
