// FILE: src/cli/config.rs

use crate::error::{InlinerError, Result};
use crate::read_source;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    pub root_selector: Option<String>,
    pub warn_undefined: Option<bool>,
    pub output_directory: Option<String>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = read_source(config_path)?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| InlinerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| InlinerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(InlinerError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        });
    };

    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("inline.toml");
        fs::write(&path, "root_selector = \"html\"\nwarn_undefined = true\n").unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.root_selector.as_deref(), Some("html"));
        assert_eq!(config.warn_undefined, Some(true));
        assert_eq!(config.output_directory, None);
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("inline.json");
        fs::write(&path, r#"{ "output_directory": "dist" }"#).unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.output_directory.as_deref(), Some("dist"));
    }

    #[test]
    fn test_rejects_unknown_extension_and_bad_content() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = temp_dir.path().join("inline.yaml");
        fs::write(&yaml, "root_selector: html").unwrap();
        assert!(matches!(load(yaml.to_str().unwrap()), Err(InlinerError::InvalidFormat { .. })));

        let broken = temp_dir.path().join("inline.toml");
        fs::write(&broken, "root_selector = ").unwrap();
        assert!(matches!(load(broken.to_str().unwrap()), Err(InlinerError::InvalidFormat { .. })));

        let missing = temp_dir.path().join("missing.toml");
        assert!(matches!(load(missing.to_str().unwrap()), Err(InlinerError::FileNotFound { .. })));
    }
}
