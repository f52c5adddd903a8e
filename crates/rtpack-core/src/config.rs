//! Pipeline configuration.
//!
//! Loaded from `rtpack.toml` (or the file named by `RTPACK_CONFIG`), with
//! every field defaulted so an empty or missing file is a valid setup.
//! A handful of environment variables override file values; signing
//! credentials are only ever read from the environment or a key file.

use std::path::{Path, PathBuf};

use rtpack_schema::PlatformTarget;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "rtpack.toml";

pub const ENV_CONFIG: &str = "RTPACK_CONFIG";
pub const ENV_RUNTIME_VERSION: &str = "RTPACK_RUNTIME_VERSION";
pub const ENV_BASE_URL: &str = "RTPACK_BASE_URL";
pub const ENV_SIGNING_KEY: &str = "RTPACK_SIGNING_KEY";
pub const ENV_SIGNING_KEY_FILE: &str = "RTPACK_SIGNING_KEY_FILE";
pub const ENV_SIGNING_PASSPHRASE: &str = "RTPACK_SIGNING_PASSPHRASE";

/// Upper bound on concurrently built targets.
pub const MAX_JOBS: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("{0} is set but RTPACK_SIGNING_PASSPHRASE is not")]
    MissingPassphrase(&'static str),

    #[error("failed to read product metadata from {path}: {reason}")]
    Product { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub product: ProductConfig,
    pub runtime: RuntimeConfig,
    pub build: BuildConfig,
    pub signing: SigningConfig,
    pub hooks: HooksConfig,
}

/// The `[product]` section: what is being packaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProductConfig {
    /// Overrides the `name` read from `package.json`.
    pub name: Option<String>,
    /// Overrides the `version` read from `package.json`.
    pub version: Option<String>,
    /// Extension of produced packages, without the dot.
    pub extension: String,
    /// Where the version/metadata provider reads from.
    pub package_json: PathBuf,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: None,
            version: None,
            extension: "vsix".to_string(),
            package_json: PathBuf::from("package.json"),
        }
    }
}

/// The `[runtime]` section: where runtime bundles come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RuntimeConfig {
    /// Runtime major version to bundle.
    pub version: u32,
    /// Distribution root; manifests live at `{base}/{version}/downloads/latest/`.
    pub base_url: String,
    /// Manifest file name under the `latest` directory.
    pub manifest: String,
    /// Substring identifying the bundle family in manifest lines.
    pub bundle_marker: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            version: 17,
            base_url: "https://download.eclipse.org/justj/jres".to_string(),
            manifest: "justj.manifest".to_string(),
            bundle_marker: "org.eclipse.justj.openjdk.hotspot.jre.full.stripped".to_string(),
        }
    }
}

/// The `[build]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    pub targets: Vec<PlatformTarget>,
    /// Shared staging directory for downloaded and extracted runtimes.
    pub scratch_dir: PathBuf,
    /// Where packages, signatures and `build-info.json` are written.
    pub output_dir: PathBuf,
    /// Targets built at once; clamped to `1..=MAX_JOBS`.
    pub jobs: usize,
    /// Packager command. Placeholders: `{output}`, `{runtime}`, `{version}`.
    pub packager: Vec<String>,
    /// Appended to the packager command for platform builds. Placeholder: `{platform}`.
    pub packager_target_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            targets: PlatformTarget::DEFAULT_TARGETED.to_vec(),
            scratch_dir: PathBuf::from("jre"),
            output_dir: PathBuf::from("."),
            jobs: 1,
            packager: ["npx", "vsce", "package", "--out", "{output}"]
                .map(String::from)
                .to_vec(),
            packager_target_args: ["--target", "{platform}"].map(String::from).to_vec(),
        }
    }
}

impl BuildConfig {
    pub fn effective_jobs(&self) -> usize {
        self.jobs.clamp(1, MAX_JOBS)
    }
}

/// The `[signing]` section. Key text and passphrase never live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SigningConfig {
    /// ASCII-armored OpenPGP private key file.
    pub key_file: Option<PathBuf>,
    /// Glob patterns, relative to the output directory, of files to sign.
    pub patterns: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            key_file: None,
            patterns: ["*.vsix", "*-cyclonedx.json"].map(String::from).to_vec(),
        }
    }
}

/// The `[hooks]` section: external steps run around the core pipeline.
///
/// An unset hook is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HooksConfig {
    pub bump_version: Option<Vec<String>>,
    pub sbom: Option<Vec<String>>,
    pub deploy_build_info: Option<Vec<String>>,
    pub deploy: Option<Vec<String>>,
}

impl Config {
    /// Load configuration and apply environment overrides.
    ///
    /// `path` wins over `RTPACK_CONFIG`, which wins over `./rtpack.toml`.
    /// Only an explicitly named file is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

        let mut config = match explicit {
            Some(p) => Self::from_file(&p)?,
            None if Path::new(CONFIG_FILE).exists() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Apply overrides looked up through `get` (the process environment in
    /// production).
    pub fn apply_overrides(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = get(ENV_RUNTIME_VERSION) {
            self.runtime.version = v.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_RUNTIME_VERSION,
                value: v.clone(),
            })?;
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.runtime.base_url = url;
        }
        Ok(())
    }
}

/// Armored signing key and its passphrase.
#[derive(Clone)]
pub struct SigningCredentials {
    pub armored_key: String,
    pub passphrase: String,
}

impl std::fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("armored_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

impl SigningCredentials {
    /// Credentials from the process environment, falling back to the
    /// configured key file. `Ok(None)` when no key is configured at all.
    pub fn from_env(config: &SigningConfig) -> Result<Option<Self>, ConfigError> {
        Self::lookup(config, |var| std::env::var(var).ok())
    }

    pub fn lookup(
        config: &SigningConfig,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, ConfigError> {
        let (armored_key, source) = if let Some(key) = get(ENV_SIGNING_KEY) {
            (key, ENV_SIGNING_KEY)
        } else if let Some(file) = get(ENV_SIGNING_KEY_FILE).map(PathBuf::from) {
            (read_key_file(&file)?, ENV_SIGNING_KEY_FILE)
        } else if let Some(file) = &config.key_file {
            (read_key_file(file)?, "signing.key-file")
        } else {
            return Ok(None);
        };

        let passphrase = get(ENV_SIGNING_PASSPHRASE).ok_or(ConfigError::MissingPassphrase(source))?;
        Ok(Some(Self {
            armored_key,
            passphrase,
        }))
    }
}

fn read_key_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
