/*++

Licensed under the Apache-2.0 license.

File Name:

   config.rs

Abstract:

    File contains utilities for parsing blob configuration files

--*/

use acr_image_types::{FalconId, SubWprUseCase};
use anyhow::Context;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Dependency on another falcon's image
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DependencyConfig {
    pub id: FalconId,

    /// 4 byte hash contribution, hex encoded
    pub hash: String,
}

/// LS falcon firmware configuration
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FalconConfig {
    pub id: FalconId,

    pub desc: PathBuf,

    pub image: PathBuf,

    /// Unsigned debug image when absent
    pub sig: Option<PathBuf>,

    #[serde(default)]
    pub lazy: bool,

    /// LSB flag names, e.g. `DMACTL_REQ_CTX`; falcon defaults when absent
    pub flags: Option<Vec<String>>,

    #[serde(default)]
    pub ctx_dma: u32,

    #[serde(default)]
    pub argc: u32,

    #[serde(default)]
    pub argv: u32,

    #[serde(default)]
    pub dependencies: Vec<DependencyConfig>,
}

/// Driver supplied WPR region
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RegionConfig {
    pub region_id: u32,

    pub start: u64,

    pub end: u64,

    #[serde(default)]
    pub read_mask: u32,

    #[serde(default)]
    pub write_mask: u32,

    #[serde(default)]
    pub client_mask: u32,
}

// Blob Configuration
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BlobConfig {
    pub owner: Option<FalconId>,

    pub nonwpr_base: u64,

    pub wpr_base: u64,

    pub mmu_mem_range: Option<u32>,

    /// Hardware defined geometry when empty
    #[serde(default)]
    pub regions: Vec<RegionConfig>,

    #[serde(default)]
    pub sub_wprs: Vec<SubWprUseCase>,

    pub falcons: Vec<FalconConfig>,
}

/// Load Blob Configuration from file
pub(crate) fn load_blob_config(path: &Path) -> anyhow::Result<BlobConfig> {
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read the config file {}", path.display()))?;

    let config: BlobConfig = toml::from_str(&config_str)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    Ok(config)
}
