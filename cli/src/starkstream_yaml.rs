use std::path::{Path, PathBuf};

use starkstream::manifest::yaml::YAML_CONFIG_NAME;

pub fn starkstream_yaml_path(project_path: &Path) -> PathBuf {
    project_path.join(YAML_CONFIG_NAME)
}

pub fn validate_starkstream_yaml_exist(project_path: &Path) -> Result<PathBuf, String> {
    let manifest_path = starkstream_yaml_path(project_path);
    if manifest_path.is_file() {
        Ok(manifest_path)
    } else {
        Err(format!(
            "{} does not exist in {}. Create one or pass --path to the directory holding it.",
            YAML_CONFIG_NAME,
            project_path.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_manifest_is_reported() {
        let dir = tempdir().unwrap();

        let err = validate_starkstream_yaml_exist(dir.path()).unwrap_err();

        assert!(err.starts_with("starkstream.yaml does not exist"));
    }

    #[test]
    fn test_existing_manifest_path() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(YAML_CONFIG_NAME), "name: idx\n").unwrap();

        let path = validate_starkstream_yaml_exist(dir.path()).unwrap();

        assert_eq!(path, dir.path().join("starkstream.yaml"));
    }
}
