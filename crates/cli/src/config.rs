use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use fn_error_context::context;
use serde::Deserialize;

/// The environment variable naming an optional TOML configuration file.
const CONFIG_VAR: &str = "NYDUS_BUILD_CONFIG";

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct BuildConfig {
    /// Path to the nydus-image binary.
    pub(crate) nydus_image: Option<Utf8PathBuf>,
    /// Defaults for `create`; command line flags take precedence.
    #[serde(default)]
    pub(crate) create: CreateDefaults,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct CreateDefaults {
    /// RAFS version; `6` if unset here and on the command line.
    pub(crate) fs_version: Option<String>,
    /// Compression algorithm; nydus-image picks its own if unset.
    pub(crate) compressor: Option<String>,
    /// Chunk size, e.g. `0x100000`.
    pub(crate) chunk_size: Option<String>,
    /// Whiteout convention; `oci` if unset here and on the command line.
    pub(crate) whiteout_spec: Option<String>,
}

impl BuildConfig {
    #[context("Loading configuration")]
    pub(crate) fn load() -> Result<Option<Self>> {
        let Some(path) = std::env::var_os(CONFIG_VAR) else {
            return Ok(None);
        };
        let buf = std::fs::read_to_string(&path)
            .with_context(|| format!("Opening {path:?}"))?;
        let r = Self::parse(&buf).with_context(|| format!("Parsing config from {path:?}"))?;
        tracing::debug!("Loaded configuration from {path:?}");
        Ok(Some(r))
    }

    pub(crate) fn parse(buf: &str) -> Result<Self> {
        Ok(toml::from_str(buf)?)
    }
}
