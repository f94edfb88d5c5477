/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the ACR non-WPR blob generator.

--*/

mod generator;
mod lsb;
mod region;
mod ucode_desc;
mod wpr;

pub use generator::{AcrBlob, BlobGenerator, StagedFalcon};
pub use lsb::{validate_ucode_desc, BlDescBuilder, LsbHeaderBuilder, LsbPlacement};
pub use region::{place_sub_wprs, AcrDescBuilder, RegionGeometry, WprRegion};
pub use ucode_desc::UcodeDescBuilder;
pub use wpr::WprHeaderTableBuilder;

use acr_image_types::*;

/// LS falcon firmware staged into the blob
pub trait LsFirmware {
    /// Falcon the firmware runs on
    fn falcon_id(&self) -> FalconId;

    /// Ucode descriptor shipped with the image
    fn desc(&self) -> &LsFalconUcodeDesc;

    /// Signature metadata shipped with the image
    fn signature(&self) -> &LsSignature;

    /// Ucode image: bootloader, application code and data
    fn image(&self) -> &[u8];

    /// Binary version recorded in the WPR header
    fn bin_version(&self) -> u32 {
        self.desc().app_version
    }
}

/// Per falcon generator configuration
#[derive(Debug, Clone)]
pub struct LsFalconConfig<T: LsFirmware> {
    pub firmware: T,

    /// Stage and validate, but leave the bootstrap to the driver
    pub lazy_bootstrap: bool,

    /// Overrides `FalconId::default_lsb_flags`
    pub flags: Option<LsbFlags>,

    /// Dependencies appended after the ones recorded in the signature
    pub dependencies: Vec<DepMapEntry>,

    /// DMA aperture index used by the bootloader
    pub ctx_dma: u32,

    pub argc: u32,

    pub argv: u32,
}

impl<T: LsFirmware> LsFalconConfig<T> {
    pub fn new(firmware: T) -> Self {
        Self {
            firmware,
            lazy_bootstrap: false,
            flags: None,
            dependencies: Vec::new(),
            ctx_dma: 0,
            argc: 0,
            argv: 0,
        }
    }

    pub fn lsb_flags(&self) -> LsbFlags {
        self.flags
            .unwrap_or_else(|| self.firmware.falcon_id().default_lsb_flags())
    }
}

/// Blob generator configuration
#[derive(Debug, Clone)]
pub struct BlobGeneratorConfig<T: LsFirmware> {
    /// Falcons to manage, in WPR header table order
    pub falcons: Vec<LsFalconConfig<T>>,

    /// Falcon running the HS ucode; the first capable falcon when `None`
    pub bootstrap_owner: Option<FalconId>,

    /// Physical address of the non-WPR blob
    pub nonwpr_base: u64,

    /// Physical address the HS ucode copies the blob to
    pub wpr_base: u64,

    pub region: RegionGeometry,

    /// Shared sub-WPRs to provision, discrete memory chips only
    pub sub_wprs: Vec<SubWprUseCase>,

    pub mmu_mem_range: Option<u32>,
}

impl<T: LsFirmware> Default for BlobGeneratorConfig<T> {
    fn default() -> Self {
        Self {
            falcons: Vec::new(),
            bootstrap_owner: None,
            nonwpr_base: 0,
            wpr_base: 0,
            region: RegionGeometry::HardwareDefined,
            sub_wprs: Vec::new(),
            mmu_mem_range: None,
        }
    }
}
