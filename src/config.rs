use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MkquizError, Result};

pub const CONFIG_FILENAME: &str = ".mkquizrc";

/// Project settings stored in `.mkquizrc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub project_path: PathBuf,
    pub template_file: PathBuf,
    pub all_quizzez_json_path: PathBuf,
}

/// `.mkquizrc` in the working directory unless an explicit path is given.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CONFIG_FILENAME),
    }
}

fn missing(field: &str) -> MkquizError {
    MkquizError::config(format!("Configuration missing or invalid {}", field))
}

/// Every field must be a non-empty string.
pub fn validate_fields(value: &serde_json::Value) -> Result<Config> {
    let obj = value
        .as_object()
        .ok_or_else(|| MkquizError::config("Configuration must be an object"))?;

    let field = |name: &str| -> Result<PathBuf> {
        obj.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| missing(name))
    };

    Ok(Config {
        project_path: field("projectPath")?,
        template_file: field("templateFile")?,
        all_quizzez_json_path: field("allQuizzezJsonPath")?,
    })
}

pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::error!(path = %path.display(), "configuration file not found");
        return Err(MkquizError::ConfigMissing(path.to_path_buf()));
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| MkquizError::config(format!("Invalid configuration file: {}", e)))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| MkquizError::config(format!("Invalid configuration file: {}", e)))?;

    let config = validate_fields(&value)?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

pub fn save(path: &Path, config: &Config) -> Result<()> {
    validate_fields(&serde_json::to_value(config).map_err(|e| MkquizError::config(e.to_string()))?)?;
    let content = crate::manifest::to_pretty_string(config, b"  ")?;
    std::fs::write(path, content).map_err(|e| {
        MkquizError::fs(format!("Failed to save configuration: {}", e), path)
    })?;
    tracing::info!(path = %path.display(), "configuration saved");
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

pub fn check_project_path(path: &Path) -> std::result::Result<(), String> {
    if !path.exists() {
        return Err("Path does not exist".into());
    }
    Ok(())
}

pub fn check_template_file(path: &Path) -> std::result::Result<(), String> {
    if !path.exists() {
        return Err("Path does not exist".into());
    }
    if !has_extension(path, "html") {
        return Err("Valid .html file required".into());
    }
    Ok(())
}

pub fn check_manifest_file(path: &Path) -> std::result::Result<(), String> {
    if !path.exists() {
        return Err("Path does not exist".into());
    }
    if !has_extension(path, "json") {
        return Err("Not a valid .json file".into());
    }
    Ok(())
}

/// Project directory, template and manifest must all exist with the right
/// extensions.
pub fn validate_paths(config: &Config) -> Result<()> {
    check_project_path(&config.project_path).map_err(|_| {
        MkquizError::config(format!(
            "Project path does not exist: {}",
            config.project_path.display()
        ))
    })?;
    check_template_file(&config.template_file).map_err(|_| {
        MkquizError::config(format!(
            "Template file invalid or does not exist: {}",
            config.template_file.display()
        ))
    })?;
    check_manifest_file(&config.all_quizzez_json_path).map_err(|_| {
        MkquizError::config(format!(
            "All quizzes JSON file invalid or does not exist: {}",
            config.all_quizzez_json_path.display()
        ))
    })?;
    Ok(())
}

pub fn load_and_validate(path: &Path) -> Result<Config> {
    let config = load(path)?;
    validate_paths(&config)?;
    Ok(config)
}

// ---- Tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn project(dir: &Path) -> Config {
        let template = dir.join("template.html");
        let manifest = dir.join("all.json");
        std::fs::write(&template, "<html></html>").unwrap();
        std::fs::write(&manifest, r#"[{"Year":{}}]"#).unwrap();
        Config {
            project_path: dir.to_path_buf(),
            template_file: template,
            all_quizzez_json_path: manifest,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let config = project(dir.path());
        let path = dir.path().join(CONFIG_FILENAME);

        save(&path, &config).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"projectPath\""));
        assert!(raw.contains("allQuizzezJsonPath"));

        assert_eq!(load_and_validate(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join(CONFIG_FILENAME)).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
        assert!(err.to_string().contains("Run `mkquiz config` first"));
    }

    #[test]
    fn test_invalid_fields() {
        let err = validate_fields(&json!({"projectPath": "/p", "templateFile": ""})).unwrap_err();
        assert_eq!(err.to_string(), "Configuration missing or invalid templateFile");
        let err = validate_fields(&json!(["x"])).unwrap_err();
        assert_eq!(err.to_string(), "Configuration must be an object");
    }

    #[test]
    fn test_validate_paths() {
        let dir = TempDir::new().unwrap();
        let mut config = project(dir.path());
        assert!(validate_paths(&config).is_ok());

        let txt = dir.path().join("template.txt");
        std::fs::write(&txt, "").unwrap();
        config.template_file = txt;
        let err = validate_paths(&config).unwrap_err();
        assert!(err.to_string().starts_with("Template file invalid"));

        let mut config = project(dir.path());
        config.project_path = dir.path().join("nope");
        assert!(validate_paths(&config).unwrap_err().to_string().starts_with("Project path"));
    }

    #[test]
    fn test_field_checks() {
        let dir = TempDir::new().unwrap();
        let config = project(dir.path());
        assert!(check_manifest_file(&config.all_quizzez_json_path).is_ok());
        assert_eq!(check_manifest_file(&config.template_file).unwrap_err(), "Not a valid .json file");
        assert_eq!(check_project_path(&dir.path().join("x")).unwrap_err(), "Path does not exist");
    }
}
