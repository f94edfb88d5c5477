/*++

Licensed under the Apache-2.0 license.

File Name:

   generator.rs

Abstract:

    ACR non-WPR blob generator

--*/

use acr_image_types::layout::*;
use acr_image_types::*;
use zerocopy::IntoBytes;
use zeroize::Zeroize;

use crate::*;

/// Falcon as staged in the blob
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StagedFalcon {
    pub falcon_id: FalconId,
    pub lsb_offset: u32,
    pub lsb_header: LsfLsbHeader,
    pub bl_desc: FlcnBlDmemDesc,
}

/// Staged non-WPR blob and the descriptor pointing at it
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AcrBlob {
    pub data: Vec<u8>,
    pub wpr_table: WprHeaderTable,
    pub sub_wpr_table: SubWprTable,
    pub falcons: Vec<StagedFalcon>,
    pub acr_desc: FlcnAcrDesc,
}

impl AcrBlob {
    /// Offset of the WPR header table
    pub const WPR_TABLE_OFFSET: u32 = 0;

    /// Offset of the shared sub-WPR header table, when one is provisioned
    pub const SUB_WPR_TABLE_OFFSET: u32 = Self::WPR_TABLE_OFFSET + LSF_WPR_HEADERS_TOTAL_SIZE_MAX;

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Scrub the staged blob so a later bring-up cannot observe its status bytes
    pub fn invalidate(&mut self) {
        self.data.zeroize();
        self.wpr_table = WprHeaderTable::new();
        self.sub_wpr_table = SubWprTable::default();
        self.falcons.clear();
        self.acr_desc = FlcnAcrDesc::default();
    }
}

fn write_at(data: &mut [u8], offset: u32, bytes: &[u8]) -> AcrResult<()> {
    let start = offset as usize;
    data.get_mut(start..start + bytes.len())
        .ok_or(AcrError::LAYOUT_BLOB_TOO_LARGE)?
        .copy_from_slice(bytes);
    Ok(())
}

/// Blob generator
#[derive(Debug, Default)]
pub struct BlobGenerator {}

impl BlobGenerator {
    /// Create an instance `BlobGenerator`
    pub fn new() -> Self {
        Self {}
    }

    /// Generate the non-WPR blob
    ///
    /// # Arguments
    ///
    /// * `config` - Blob generator configuration
    ///
    /// # Returns
    ///
    /// * `AcrBlob` - Blob bytes, the decoded tables and the ACR descriptor
    pub fn generate<T: LsFirmware>(&self, config: &BlobGeneratorConfig<T>) -> AcrResult<AcrBlob> {
        if !is_aligned_u64(config.wpr_base, u64::from(LSF_BL_DATA_ALIGNMENT))
            || !is_aligned_u64(config.nonwpr_base, u64::from(LSF_WPR_HEADER_ALIGNMENT))
        {
            return Err(AcrError::LAYOUT_UNALIGNED_BASE);
        }

        let cursor = checked_offset(AcrBlob::WPR_TABLE_OFFSET, LSF_WPR_HEADERS_TOTAL_SIZE_MAX)?;
        let (sub_wpr_table, mut cursor) = place_sub_wprs(cursor, &config.sub_wprs)?;

        // Stage every falcon behind the tables
        let mut wpr = WprHeaderTableBuilder::new().bootstrap_owner(config.bootstrap_owner);
        let mut falcons = Vec::with_capacity(config.falcons.len());
        for falcon in &config.falcons {
            let (staged, end) = self.stage_falcon(config.wpr_base, falcon, cursor)?;
            wpr.push(
                staged.falcon_id,
                staged.lsb_offset,
                falcon.lazy_bootstrap,
                falcon.firmware.bin_version(),
            )?;
            falcons.push(staged);
            cursor = end;
        }
        let wpr_table = wpr.build()?;

        let mut data = vec![0u8; cursor as usize];
        wpr_table.encode(&mut data[AcrBlob::WPR_TABLE_OFFSET as usize..])?;
        if !sub_wpr_table.is_empty() {
            sub_wpr_table.encode(&mut data[AcrBlob::SUB_WPR_TABLE_OFFSET as usize..])?;
        }
        for (staged, falcon) in falcons.iter().zip(&config.falcons) {
            let hdr = &staged.lsb_header;
            write_at(&mut data, staged.lsb_offset, hdr.as_bytes())?;
            write_at(&mut data, hdr.ucode_off, falcon.firmware.image())?;
            write_at(&mut data, hdr.bl_data_off, staged.bl_desc.as_bytes())?;
        }

        let acr_desc = AcrDescBuilder::new(config.nonwpr_base, cursor)
            .wpr_offset(AcrBlob::WPR_TABLE_OFFSET)
            .mmu_mem_range(config.mmu_mem_range)
            .geometry(config.region.clone())
            .build()?;

        log::info!(
            "Generated ACR blob: {} falcons, {} sub-WPRs, {:#x} bytes",
            falcons.len(),
            sub_wpr_table.len(),
            data.len()
        );

        Ok(AcrBlob {
            data,
            wpr_table,
            sub_wpr_table,
            falcons,
            acr_desc,
        })
    }

    /// Lay out one falcon at `cursor`
    fn stage_falcon<T: LsFirmware>(
        &self,
        wpr_base: u64,
        falcon: &LsFalconConfig<T>,
        cursor: u32,
    ) -> AcrResult<(StagedFalcon, u32)> {
        let fw = &falcon.firmware;
        let falcon_id = fw.falcon_id();

        let signature = UcodeDescBuilder::new(falcon_id, fw.signature())
            .dependencies(&falcon.dependencies)
            .build()?;

        let (lsb_header, placement) = LsbHeaderBuilder::new(fw.desc(), fw.image(), signature)?
            .flags(falcon.lsb_flags())
            .build(cursor)?;

        let bl_desc = BlDescBuilder::new(wpr_base)
            .ctx_dma(falcon.ctx_dma)
            .args(falcon.argc, falcon.argv)
            .build(fw.desc(), &lsb_header)?;

        log::debug!(
            "{}: lsb {:#x} ucode {:#x}+{:#x} bl data {:#x} flags {:?}",
            falcon_id,
            placement.lsb_offset,
            placement.ucode_off,
            placement.payload_size,
            placement.bl_data_off,
            lsb_header.lsb_flags()
        );

        let staged = StagedFalcon {
            falcon_id,
            lsb_offset: placement.lsb_offset,
            lsb_header,
            bl_desc,
        };
        Ok((staged, placement.end))
    }
}
