/*++

Licensed under the Apache-2.0 license.

File Name:

   mod.rs

Abstract:

    File contains implementation of the ACR blob creation command.

--*/

mod config;

use acr_image_gen::*;
use acr_image_lsfw::LsFirmwareImage;
use acr_image_serde::AcrBlobWriter;
use acr_image_types::*;
use anyhow::{anyhow, bail, Context};
use clap::ArgMatches;
use std::path::{Path, PathBuf};

use config::{DependencyConfig, FalconConfig, RegionConfig};

fn lsb_flags(names: &[String]) -> anyhow::Result<LsbFlags> {
    names.iter().try_fold(LsbFlags::empty(), |flags, name| {
        LsbFlags::from_name(name)
            .map(|flag| flags | flag)
            .ok_or_else(|| anyhow!("Unknown LSB flag {name}"))
    })
}

fn dependency(config: &DependencyConfig) -> anyhow::Result<DepMapEntry> {
    let bytes = hex::decode(&config.hash)
        .with_context(|| format!("Invalid dependency hash for {}", config.id))?;
    let hash: [u8; 4] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("Dependency hash for {} must be 4 bytes", config.id))?;
    Ok(DepMapEntry {
        falcon_id: config.id,
        hash,
    })
}

fn falcon_config(
    config_dir: &Path,
    config: &FalconConfig,
) -> anyhow::Result<LsFalconConfig<LsFirmwareImage>> {
    let firmware = LsFirmwareImage::open(
        config.id,
        &config_dir.join(&config.desc),
        &config_dir.join(&config.image),
        config.sig.as_ref().map(|sig| config_dir.join(sig)).as_deref(),
    )?;

    let mut falcon = LsFalconConfig::new(firmware);
    falcon.lazy_bootstrap = config.lazy;
    falcon.flags = config.flags.as_deref().map(lsb_flags).transpose()?;
    falcon.dependencies = config
        .dependencies
        .iter()
        .map(dependency)
        .collect::<anyhow::Result<_>>()?;
    falcon.ctx_dma = config.ctx_dma;
    falcon.argc = config.argc;
    falcon.argv = config.argv;
    Ok(falcon)
}

fn region_geometry(regions: &[RegionConfig]) -> RegionGeometry {
    if regions.is_empty() {
        return RegionGeometry::HardwareDefined;
    }
    RegionGeometry::DriverSupplied(
        regions
            .iter()
            .map(|region| WprRegion {
                region_id: region.region_id,
                start: region.start,
                end: region.end,
                read_mask: region.read_mask,
                write_mask: region.write_mask,
                client_mask: region.client_mask,
            })
            .collect(),
    )
}

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let config_path: &PathBuf = args
        .get_one::<PathBuf>("config")
        .with_context(|| "config arg not specified")?;

    let out_path: &PathBuf = args
        .get_one::<PathBuf>("out")
        .with_context(|| "out arg not specified")?;

    let desc_out_path: Option<&PathBuf> = args.get_one::<PathBuf>("desc-out");

    let config = config::load_blob_config(config_path)?;
    if config.falcons.is_empty() {
        bail!("No falcons in {}", config_path.display());
    }

    let config_dir = config_path
        .parent()
        .with_context(|| "Invalid parent path")?;

    let gen_config = BlobGeneratorConfig::<LsFirmwareImage> {
        falcons: config
            .falcons
            .iter()
            .map(|falcon| falcon_config(config_dir, falcon))
            .collect::<anyhow::Result<_>>()?,
        bootstrap_owner: config.owner,
        nonwpr_base: config.nonwpr_base,
        wpr_base: config.wpr_base,
        region: region_geometry(&config.regions),
        sub_wprs: config.sub_wprs,
        mmu_mem_range: config.mmu_mem_range,
    };

    let gen = BlobGenerator::new();
    let blob = gen
        .generate(&gen_config)
        .map_err(|err| anyhow!("Failed to generate blob: {err}"))?;

    let out_file = std::fs::File::create(out_path)
        .with_context(|| format!("Failed to create file {}", out_path.display()))?;
    AcrBlobWriter::new(out_file).write(&blob)?;

    if let Some(desc_out_path) = desc_out_path {
        let desc_file = std::fs::File::create(desc_out_path)
            .with_context(|| format!("Failed to create file {}", desc_out_path.display()))?;
        AcrBlobWriter::new(desc_file).write_desc(&blob.acr_desc)?;
    }

    for falcon in &blob.falcons {
        log::info!(
            "{:<8} lsb {:#010x} ucode {:#010x} bl data {:#010x}",
            falcon.falcon_id.name(),
            falcon.lsb_offset,
            falcon.lsb_header.ucode_off,
            falcon.lsb_header.bl_data_off
        );
    }
    log::info!(
        "Wrote {:#x} byte blob to {}, bootstrap owner {}",
        blob.size(),
        out_path.display(),
        blob.wpr_table
            .bootstrap_owner()
            .map(|owner| owner.name())
            .unwrap_or("none")
    );

    Ok(())
}
