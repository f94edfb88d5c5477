/*++

Licensed under the Apache-2.0 license.

File Name:

   mod.rs

Abstract:

    File contains implementation of the ACR blob inspection command.

--*/

use acr_image_serde::{read_acr_desc, AcrBlobReader};
use acr_image_types::*;
use acr_image_verify::BootstrapReport;
use anyhow::{anyhow, Context};
use clap::ArgMatches;
use std::path::PathBuf;

fn status_name(raw: u32) -> String {
    match LsfImageStatus::try_from(raw) {
        Ok(status) => format!("{status:?}"),
        Err(_) => format!("unknown ({raw:#x})"),
    }
}

/// Run the command
pub(crate) fn run_cmd(args: &ArgMatches) -> anyhow::Result<()> {
    let blob_path: &PathBuf = args
        .get_one::<PathBuf>("blob")
        .with_context(|| "blob arg not specified")?;

    let blob = std::fs::read(blob_path)
        .with_context(|| format!("Failed to read blob {}", blob_path.display()))?;

    let desc = match args.get_one::<PathBuf>("desc") {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read descriptor {}", path.display()))?;
            Some(read_acr_desc(&bytes).map_err(|err| anyhow!("{}: {err}", path.display()))?)
        }
        None => None,
    };

    let reader = match &desc {
        Some(desc) => AcrBlobReader::with_desc(&blob, desc)
            .map_err(|err| anyhow!("Descriptor does not match blob: {err}"))?,
        None => AcrBlobReader::new(&blob),
    };

    let table = reader
        .wpr_header_table()
        .map_err(|err| anyhow!("Failed to decode WPR header table: {err}"))?;

    println!(
        "WPR header table: {} falcons, bootstrap owner {}",
        table.len(),
        table
            .bootstrap_owner()
            .map(|owner| owner.name())
            .unwrap_or("none")
    );
    for hdr in table.entries() {
        let falcon_id = FalconId::try_from(hdr.falcon_id)
            .map_err(|_| anyhow!("Invalid falcon id {:#x}", hdr.falcon_id))?;
        let lsb = reader
            .lsb_header(hdr)
            .map_err(|err| anyhow!("{falcon_id}: {err}"))?;
        let bl = reader
            .bl_desc(&lsb)
            .map_err(|err| anyhow!("{falcon_id}: {err}"))?;

        println!(
            "  {:<8} lsb {:#010x} version {:#x} lazy {} status {}",
            falcon_id.name(),
            hdr.lsb_offset,
            hdr.bin_version,
            hdr.is_lazy(),
            status_name(hdr.status)
        );
        println!(
            "           ucode {:#010x} size {:#x} data {:#x} bl data {:#010x} flags {:?}",
            lsb.ucode_off,
            lsb.ucode_size,
            lsb.data_size,
            lsb.bl_data_off,
            lsb.lsb_flags()
        );
        println!(
            "           code dma {:#x} data dma {:#x} entry {:#x} deps {} versioned {}",
            u64::from(bl.code_dma_base),
            u64::from(bl.data_dma_base),
            bl.code_entry_point,
            lsb.signature.dep_map_count,
            lsb.signature.bsupports_versioning != 0
        );
    }

    if let Some(sub_wprs) = reader
        .sub_wpr_table(&table)
        .map_err(|err| anyhow!("Failed to decode sub-WPR table: {err}"))?
    {
        for hdr in sub_wprs.entries() {
            println!(
                "Sub-WPR {} at page {:#x}, {:#x} pages",
                hdr.use_case_id, hdr.start_addr, hdr.size_4k
            );
        }
    }

    if let Some(desc) = &desc {
        println!(
            "ACR descriptor: region {} of {}, wpr offset {:#x}, blob {:#x} bytes at {:#x}",
            desc.wpr_region_id,
            desc.regions.no_regions,
            desc.wpr_offset,
            desc.nonwpr_ucode_blob_size,
            desc.nonwpr_ucode_blob_start
        );
    }

    // Status words as last written to this file, not a live HS run
    let report = BootstrapReport::from_table(&table)
        .map_err(|err| anyhow!("Failed to read bootstrap status: {err}"))?;
    match report.check() {
        Ok(()) => println!("Bootstrap snapshot: all required falcons ready"),
        Err(err) => println!("Bootstrap snapshot: {err}"),
    }

    Ok(())
}
