/*++

Licensed under the Apache-2.0 license.

File Name:

   region.rs

Abstract:

    Builds the ACR descriptor handed to the HS ucode and places the shared
    sub-WPRs of discrete memory chips.

--*/

use acr_image_types::layout::*;
use acr_image_types::*;

/// Driver supplied WPR region, byte addresses
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct WprRegion {
    pub region_id: u32,
    pub start: u64,
    pub end: u64,
    pub read_mask: u32,
    pub write_mask: u32,
    pub client_mask: u32,
}

/// Who determines the WPR region geometry
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub enum RegionGeometry {
    /// The HS ucode fetches the geometry from hardware
    #[default]
    HardwareDefined,

    /// The driver supplies up to `NVGPU_FLCN_ACR_MAX_REGIONS` regions
    DriverSupplied(Vec<WprRegion>),
}

fn region_addr(addr: u64) -> AcrResult<u32> {
    if !is_aligned_u64(addr, 1 << ACR_REGION_ADDR_SHIFT) {
        return Err(AcrError::REGION_ADDRESS_UNALIGNED);
    }
    u32::try_from(addr >> ACR_REGION_ADDR_SHIFT).map_err(|_| AcrError::REGION_ADDRESS_OUT_OF_RANGE)
}

impl RegionGeometry {
    fn encode(&self, nonwpr_base: u64) -> AcrResult<(u32, FlcnAcrRegions)> {
        let mut regions = FlcnAcrRegions::default();

        let supplied = match self {
            RegionGeometry::HardwareDefined => {
                regions.no_regions = 1;
                return Ok((0, regions));
            }
            RegionGeometry::DriverSupplied(supplied) => supplied,
        };

        let first = supplied.first().ok_or(AcrError::REGION_NO_REGIONS)?;
        if supplied.len() > NVGPU_FLCN_ACR_MAX_REGIONS {
            return Err(AcrError::REGION_TOO_MANY_REGIONS);
        }

        let shadow = region_addr(nonwpr_base)?;
        for (prop, region) in regions.region_props.iter_mut().zip(supplied) {
            if region.start >= region.end {
                return Err(AcrError::REGION_INVALID_RANGE);
            }
            *prop = FlcnAcrRegionProp {
                start_addr: region_addr(region.start)?,
                end_addr: region_addr(region.end)?,
                region_id: region.region_id,
                read_mask: region.read_mask,
                write_mask: region.write_mask,
                client_mask: region.client_mask,
                shadow_mem_start_addr: shadow,
            };
        }
        regions.no_regions = supplied.len() as u32;

        Ok((first.region_id, regions))
    }
}

/// ACR descriptor builder
#[derive(Debug, Default)]
pub struct AcrDescBuilder {
    wpr_offset: u32,
    nonwpr_base: u64,
    blob_size: u32,
    mmu_mem_range: Option<u32>,
    geometry: RegionGeometry,
}

impl AcrDescBuilder {
    /// Create an instance of `AcrDescBuilder`
    ///
    /// # Arguments
    ///
    /// * `nonwpr_base` - Physical address of the non-WPR blob
    /// * `blob_size`   - Size of the non-WPR blob
    pub fn new(nonwpr_base: u64, blob_size: u32) -> Self {
        Self {
            nonwpr_base,
            blob_size,
            ..Default::default()
        }
    }

    /// Offset of the WPR header table within the blob
    pub fn wpr_offset(mut self, wpr_offset: u32) -> Self {
        self.wpr_offset = wpr_offset;
        self
    }

    pub fn mmu_mem_range(mut self, range: Option<u32>) -> Self {
        self.mmu_mem_range = range;
        self
    }

    pub fn geometry(mut self, geometry: RegionGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn build(&self) -> AcrResult<FlcnAcrDesc> {
        if !is_aligned_u64(self.nonwpr_base, u64::from(LSF_WPR_HEADER_ALIGNMENT)) {
            return Err(AcrError::LAYOUT_UNALIGNED_BASE);
        }
        if !is_aligned(self.wpr_offset, LSF_WPR_HEADER_ALIGNMENT) {
            return Err(AcrError::WPR_TABLE_OFFSET_UNALIGNED);
        }

        let (wpr_region_id, regions) = self.geometry.encode(self.nonwpr_base)?;

        // The pad before the blob start is private, so fill a zeroed record
        let mut desc = FlcnAcrDesc::default();
        desc.wpr_region_id = wpr_region_id;
        desc.wpr_offset = self.wpr_offset;
        desc.mmu_mem_range = self.mmu_mem_range.unwrap_or(0);
        desc.regions = regions;
        desc.nonwpr_ucode_blob_size = self.blob_size;
        desc.nonwpr_ucode_blob_start = self.nonwpr_base;
        Ok(desc)
    }
}

/// Place the shared sub-WPR header table at `cursor` followed by the sub-WPRs
///
/// # Arguments
///
/// * `cursor`    - Current write offset into the blob
/// * `use_cases` - Sub-WPRs to provision, in table order
///
/// # Returns
///
/// * `(SubWprTable, u32)` - Table and the cursor after the last sub-WPR; the
///   cursor is unchanged when nothing is provisioned
pub fn place_sub_wprs(cursor: u32, use_cases: &[SubWprUseCase]) -> AcrResult<(SubWprTable, u32)> {
    let mut table = SubWprTable::default();
    if use_cases.is_empty() {
        return Ok((table, cursor));
    }

    let table_offset = align_up(cursor, LSF_SUB_WPR_HEADER_ALIGNMENT)?;
    let mut cursor = checked_offset(table_offset, LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX)?;

    for use_case in use_cases {
        let start = align_up(cursor, SUB_WPR_SIZE_ALIGNMENT)?;
        let size_4k = use_case.size_in_4k();
        table.push(LsfSharedSubWprHeader {
            use_case_id: (*use_case).into(),
            start_addr: start >> SHIFT_4KB,
            size_4k,
        })?;
        cursor = checked_offset(start, sub_wpr_size_bytes(size_4k)?)?;

        log::debug!(
            "sub-WPR {:?} at {:#x}, {:#x} pages",
            use_case,
            start,
            size_4k
        );
    }

    Ok((table, cursor))
}
