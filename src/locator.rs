use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{GridError, GridResult};

/// Resolve a processing configuration file.
///
/// `pset` is returned as an absolute path when it names an existing file.
/// Otherwise `root` is walked top-down: the files of a directory are checked
/// before its subdirectories, each group in file-name order, and the first
/// file with the same base name wins. Every call walks the tree again.
pub fn find_pset(pset: &Path, root: &Path) -> GridResult<PathBuf> {
    if pset.is_file() {
        return absolute(pset);
    }
    let filename = pset
        .file_name()
        .map(|name| name.to_os_string())
        .ok_or_else(|| GridError::PsetNotFound {
            filename: pset.display().to_string(),
            root: root.to_path_buf(),
        })?;

    log::debug!("Searching {} for {:?}", root.display(), filename);
    let found = WalkDir::new(root)
        .sort_by(|a, b| {
            b.file_type()
                .is_file()
                .cmp(&a.file_type().is_file())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == filename.as_os_str());

    match found {
        Some(entry) => absolute(entry.path()),
        None => Err(GridError::PsetNotFound {
            filename: filename.to_string_lossy().into_owned(),
            root: root.to_path_buf(),
        }),
    }
}

fn absolute(path: &Path) -> GridResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| GridError::io(path, e))?;
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_existing_path_is_returned() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("topNano_v6-1-1_2017_MC_cfg.py");
        fs::write(&file, "# cfg").unwrap();
        assert_eq!(find_pset(&file, Path::new("/nonexistent")).unwrap(), file);
    }

    #[test]
    fn test_searches_tree() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("test").join("topNano");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("topNano_v6-1-1_2018_data_cfg.py"), "# cfg").unwrap();
        fs::write(nested.join("other_cfg.py"), "# cfg").unwrap();

        let found = find_pset(Path::new("topNano_v6-1-1_2018_data_cfg.py"), dir.path()).unwrap();
        assert_eq!(found, nested.join("topNano_v6-1-1_2018_data_cfg.py"));
    }

    #[test]
    fn test_first_match_in_name_order() {
        let dir = TempDir::new().unwrap();
        for sub in ["b", "a"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
            fs::write(dir.path().join(sub).join("cfg.py"), sub).unwrap();
        }
        let found = find_pset(Path::new("cfg.py"), dir.path()).unwrap();
        assert_eq!(found, dir.path().join("a").join("cfg.py"));
    }

    #[test]
    fn test_root_level_file_shadows_nested_copy() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("python");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("zz_cfg.py"), "nested").unwrap();
        fs::write(dir.path().join("zz_cfg.py"), "root").unwrap();

        let found = find_pset(Path::new("zz_cfg.py"), dir.path()).unwrap();
        assert_eq!(found, dir.path().join("zz_cfg.py"));
    }

    #[test]
    fn test_shallower_file_wins_over_earlier_directory() {
        let dir = TempDir::new().unwrap();
        let deep = dir.path().join("a").join("deep");
        let shallow = dir.path().join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::create_dir_all(&shallow).unwrap();
        fs::write(deep.join("cfg.py"), "deep").unwrap();
        fs::write(dir.path().join("a").join("other.py"), "").unwrap();
        fs::write(shallow.join("cfg.py"), "shallow").unwrap();

        // Top-down order still descends into `a` before visiting `b`.
        let found = find_pset(Path::new("cfg.py"), dir.path()).unwrap();
        assert_eq!(found, deep.join("cfg.py"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = find_pset(Path::new("topNano_v6-1-1_2016_MC_cfg.py"), dir.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration file \"topNano_v6-1-1_2016_MC_cfg.py\" not found"
        );
    }
}
