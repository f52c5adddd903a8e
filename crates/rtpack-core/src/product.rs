//! Product name and version, as the version/metadata collaborator sees them.

use std::path::Path;

use serde::Deserialize;

use crate::config::{ConfigError, ProductConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub name: String,
    pub version: String,
}

#[derive(Deserialize)]
struct PackageJson {
    name: Option<String>,
    version: Option<String>,
}

impl ProductInfo {
    /// Resolve name and version. Values set in `[product]` win; anything
    /// missing is read from `package.json` relative to `base`.
    pub fn load(config: &ProductConfig, base: &Path) -> Result<Self, ConfigError> {
        if let (Some(name), Some(version)) = (&config.name, &config.version) {
            return Ok(Self {
                name: name.clone(),
                version: version.clone(),
            });
        }

        let path = base.join(&config.package_json);
        let product_err = |reason: String| ConfigError::Product {
            path: path.clone(),
            reason,
        };

        let content = std::fs::read_to_string(&path).map_err(|e| product_err(e.to_string()))?;
        let package: PackageJson =
            serde_json::from_str(&content).map_err(|e| product_err(e.to_string()))?;

        let name = config
            .name
            .clone()
            .or(package.name)
            .ok_or_else(|| product_err("no `name` field".to_string()))?;
        let version = config
            .version
            .clone()
            .or(package.version)
            .ok_or_else(|| product_err("no `version` field".to_string()))?;

        Ok(Self { name, version })
    }
}
