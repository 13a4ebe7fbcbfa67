use crate::core::describe::{Fields, Model, Parameters};
use crate::core::error::WorkError;
use crate::core::task::{Returned, WorkLogic};
use crate::describe_model;
use crate::tasks::TaskError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopySpec {
    pub src_directory: PathBuf,
    pub dest_directory: PathBuf,
    /// Top-level entry names to leave behind.
    pub exclude: Vec<String>,
}

impl Model for CopySpec {
    fn fields(fields: Fields) -> Fields {
        fields
            .required::<PathBuf>("src_directory")
            .required::<PathBuf>("dest_directory")
            .with_default("exclude", Vec::<String>::new())
    }
}

describe_model!(CopySpec);

#[derive(Debug, Deserialize)]
pub struct CopyDirectoryParams {
    pub data: CopySpec,
}

impl Parameters for CopyDirectoryParams {
    fn declare(params: Fields) -> Fields {
        params.required::<CopySpec>("data")
    }
}

/// Copies the entries of one directory into another, recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyDirectory;

impl WorkLogic for CopyDirectory {
    type Params = CopyDirectoryParams;
    type Output = ();

    fn name(&self) -> &str {
        "copy_directory"
    }

    fn run(&self, params: CopyDirectoryParams) -> Result<Returned<()>, WorkError> {
        let spec = params.data;
        log::info!(
            "Copy Directory: {} -> {}",
            spec.src_directory.display(),
            spec.dest_directory.display()
        );

        fs::create_dir_all(&spec.dest_directory).map_err(TaskError::io(&spec.dest_directory))?;
        for entry in fs::read_dir(&spec.src_directory).map_err(TaskError::io(&spec.src_directory))? {
            let entry = entry.map_err(TaskError::io(&spec.src_directory))?;
            let name = entry.file_name();
            if spec.exclude.iter().any(|excluded| name.as_os_str() == excluded.as_str()) {
                log::debug!("Skipping excluded entry {}", name.to_string_lossy());
                continue;
            }
            copy_entry(&entry.path(), &spec.dest_directory.join(&name))?;
        }
        Ok(().into())
    }
}

/// Symlinks are recreated rather than followed, so a link back up the tree
/// cannot recurse forever.
fn copy_entry(src: &Path, dest: &Path) -> Result<(), TaskError> {
    let file_type = fs::symlink_metadata(src).map_err(TaskError::io(src))?.file_type();
    if file_type.is_symlink() {
        copy_link(src, dest)
    } else if file_type.is_dir() {
        fs::create_dir_all(dest).map_err(TaskError::io(dest))?;
        for entry in fs::read_dir(src).map_err(TaskError::io(src))? {
            let entry = entry.map_err(TaskError::io(src))?;
            copy_entry(&entry.path(), &dest.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        fs::copy(src, dest).map_err(TaskError::io(src))?;
        Ok(())
    }
}

#[cfg(unix)]
fn copy_link(src: &Path, dest: &Path) -> Result<(), TaskError> {
    let target = fs::read_link(src).map_err(TaskError::io(src))?;
    if fs::symlink_metadata(dest).is_ok() {
        fs::remove_file(dest).map_err(TaskError::io(dest))?;
    }
    std::os::unix::fs::symlink(&target, dest).map_err(TaskError::io(dest))
}

#[cfg(not(unix))]
fn copy_link(src: &Path, _dest: &Path) -> Result<(), TaskError> {
    log::warn!("Skipping symlink {}", src.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ExecuteError;
    use crate::core::task::Task;
    use crate::core::{ConfigValue, RawConfig};
    use serde_json::json;

    fn raw(value: ConfigValue) -> RawConfig {
        match value {
            ConfigValue::Object(map) => map,
            _ => panic!("test configs are mappings"),
        }
    }

    #[test]
    fn test_copies_tree_and_skips_excluded() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::write(src.path().join("a.txt"), "a").unwrap();
        fs::create_dir_all(src.path().join("nested/deeper")).unwrap();
        fs::write(src.path().join("nested/deeper/b.txt"), "b").unwrap();
        fs::create_dir(src.path().join(".git")).unwrap();
        fs::write(src.path().join(".git/HEAD"), "ref").unwrap();

        let target = dest.path().join("out");
        let task = Task::new(CopyDirectory).unwrap();
        task.execute(&raw(json!({"data": {
            "src_directory": src.path(),
            "dest_directory": target,
            "exclude": "[.git]"
        }})))
        .unwrap();

        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "a");
        assert_eq!(
            fs::read_to_string(target.join("nested/deeper/b.txt")).unwrap(),
            "b"
        );
        assert!(!target.join(".git").exists());
    }

    #[test]
    fn test_missing_source_is_a_work_error() {
        let dest = tempfile::tempdir().unwrap();
        let task = Task::new(CopyDirectory).unwrap();
        let err = task
            .execute(&raw(json!({"data": {
                "src_directory": dest.path().join("missing"),
                "dest_directory": dest.path().join("out")
            }})))
            .unwrap_err();
        assert!(matches!(err, ExecuteError::Work { .. }));
    }

    #[test]
    fn test_schema_shows_exclude_without_default() {
        let task = Task::new(CopyDirectory).unwrap();
        assert_eq!(
            task.compact_schema().to_yaml(),
            "data:\n  src_directory: path\n  dest_directory: path\n  exclude: list\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_copied_as_a_link() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir(src.path().join("docs")).unwrap();
        fs::write(src.path().join("docs/readme.txt"), "hi").unwrap();
        std::os::unix::fs::symlink("..", src.path().join("docs/up")).unwrap();

        let target = dest.path().join("out");
        let task = Task::new(CopyDirectory).unwrap();
        task.execute(&raw(json!({"data": {
            "src_directory": src.path(),
            "dest_directory": target
        }})))
        .unwrap();

        let link = target.join("docs/up");
        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), PathBuf::from(".."));
        assert_eq!(fs::read_to_string(target.join("docs/readme.txt")).unwrap(), "hi");
    }
}
