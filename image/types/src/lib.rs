/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains data structures for the Light Secure (LS) ucode blob that
    is staged in non-WPR memory and consumed by the ACR High Secure (HS) ucode.

    Blob Pattern:

    [ WPR Header Table      | 256B aligned ]
    [ Sub-WPR Header Table  | 256B aligned, discrete memory only ]
    [ Shared Sub-WPR data   | 4KiB aligned, discrete memory only ]
    [ LSB Header #0         | 256B aligned ]
    [ ucode code+data #0    | 4KiB aligned ]
    [ bootloader data #0    | 256B aligned ]
    [ LSB Header #1 ] ...

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod falcon;
pub mod layout;
mod signature;
mod status;
mod table;

use core::mem::{offset_of, size_of};
use core::ops::Range;

use memoffset::span_of;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

pub use falcon::{FalconId, SubWprUseCase};
pub use signature::{DepMap, DepMapEntry, LsSignature};
pub use status::LsfImageStatus;
pub use table::{SubWprTable, WprHeaderTable};

pub use acr_error::{AcrError, AcrResult};

/// One past the largest Falcon identity; also the WPR header table capacity
pub const FALCON_ID_END: u32 = 11;
pub const FALCON_ID_INVALID: u32 = 0xFFFF_FFFF;
pub const MAX_FALCON_COUNT: usize = FALCON_ID_END as usize;

//
// Light Secure WPR content alignments
//
pub const LSF_WPR_HEADER_ALIGNMENT: u32 = 256;
pub const LSF_SUB_WPR_HEADER_ALIGNMENT: u32 = 256;
pub const LSF_LSB_HEADER_ALIGNMENT: u32 = 256;
pub const LSF_BL_DATA_ALIGNMENT: u32 = 256;
pub const LSF_BL_DATA_SIZE_ALIGNMENT: u32 = 256;
pub const LSF_BL_CODE_SIZE_ALIGNMENT: u32 = 256;
pub const LSF_DATA_SIZE_ALIGNMENT: u32 = 256;
pub const LSF_CODE_SIZE_ALIGNMENT: u32 = 256;

/// Ucode surface is aligned to a 4K page
pub const LSF_UCODE_DATA_ALIGNMENT: u32 = 4096;

/// MMU expects sub-WPR sizes in units of 4K
pub const SUB_WPR_SIZE_ALIGNMENT: u32 = 4096;
pub const SHIFT_4KB: u32 = 12;

/// Region addresses in the ACR descriptor are stored in 256 byte units
pub const ACR_REGION_ADDR_SHIFT: u32 = 8;

pub const LSF_UCODE_KEY_SIZE: usize = 16;
pub const LSF_KDF_SIZE: usize = 16;

/// Dependency map capacity in 32-bit words; one entry is a (falcon id, hash) word pair
pub const LSF_DEP_MAP_WORD_COUNT: usize = MAX_FALCON_COUNT * 2;
pub const LSF_DEP_MAP_BYTE_SIZE: usize = LSF_DEP_MAP_WORD_COUNT * 4;
pub const LSF_DEP_MAP_MAX_ENTRIES: usize = LSF_DEP_MAP_WORD_COUNT / 2;

pub const NVGPU_FLCN_ACR_MAX_REGIONS: usize = 2;
pub const LSF_BOOTSTRAP_OWNER_RESERVED_DMEM_SIZE: usize = 0x200;

pub const LSF_SHARED_DATA_SUB_WPR_USE_CASE_ID_INVALID: u32 = 0xFFFF_FFFF;
pub const MAX_SUPPORTED_SHARED_SUB_WPR_USE_CASES: usize = 2;

/// Static sizes of shared sub-WPRs, in 4K units
pub const LSF_SHARED_DATA_SUB_WPR_FRTS_VBIOS_TABLES_SIZE_IN_4K: u32 = 0x100;
pub const LSF_SHARED_DATA_SUB_WPR_PLAYREADY_SHARED_DATA_SIZE_IN_4K: u32 = 0x1;

pub const LS_FALCON_UCODE_DATE_SIZE: usize = 64;
pub const LS_FALCON_UCODE_MAX_OVERLAYS: usize = 64;

bitflags::bitflags! {
    /// LSB header flag word
    #[derive(Default, Copy, Clone, Debug, Eq, PartialEq)]
    pub struct LsbFlags : u32 {
        /// Load the bootloader at IMEM offset zero
        const LOAD_CODE_AT_0 = 1 << 0;
        /// The falcon requires a DMA context before issuing DMAs
        const DMACTL_REQ_CTX = 1 << 2;
        /// Use the priv loading method instead of bootloader/DMAs
        const FORCE_PRIV_LOAD = 1 << 3;
    }
}

/// Light Secure WPR header
///
/// One record per managed falcon, allowing the HS ucode to bootstrap it.
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsfWprHeader {
    /// LS falcon ID
    pub falcon_id: u32,

    /// LSB header offset from the non-WPR base
    pub lsb_offset: u32,

    /// Falcon that runs the HS ucode and bootstraps the others
    pub bootstrap_owner: u32,

    /// 1 - skip bootstrapping by the HS ucode
    pub lazy_bootstrap: u32,

    /// LS ucode binary version
    pub bin_version: u32,

    /// Status written by the HS ucode
    pub status: u32,
}

impl LsfWprHeader {
    /// Returns the byte range of the `status` field within the header
    pub fn status_range() -> Range<u32> {
        let span = span_of!(LsfWprHeader, status);
        span.start as u32..span.end as u32
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy_bootstrap != 0
    }
}

/// Code/data signature details of an LS falcon
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsfUcodeDesc {
    /// Production signatures
    pub prd_keys: [[u8; LSF_UCODE_KEY_SIZE]; 2],

    /// Debug signatures
    pub dbg_keys: [[u8; LSF_UCODE_KEY_SIZE]; 2],

    pub b_prd_present: u32,

    pub b_dbg_present: u32,

    pub falcon_id: u32,

    /// Include `version` in the signature calculation
    pub bsupports_versioning: u32,

    pub version: u32,

    /// Valid (falcon id, hash) pairs in `dep_map`
    pub dep_map_count: u32,

    /// Packed dependency map used to compute the DM hashes on code and data
    pub dep_map: [u8; LSF_DEP_MAP_BYTE_SIZE],

    /// Message used to derive key
    pub kdf: [u8; LSF_KDF_SIZE],
}

impl Default for LsfUcodeDesc {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

/// Light Secure Bootstrap header
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsfLsbHeader {
    /// Code/data signature details
    pub signature: LsfUcodeDesc,

    /// Offset from the non-WPR base of the ucode image
    pub ucode_off: u32,

    /// Bytes copied into IMEM by the HS ucode
    pub ucode_size: u32,

    /// Bytes copied into DMEM by the HS ucode
    pub data_size: u32,

    /// Bootloader size loaded by the bootstrap owner
    pub bl_code_size: u32,

    /// Bootloader starting IMEM virtual address
    pub bl_imem_off: u32,

    /// Offset from the non-WPR base of the bootloader data
    pub bl_data_off: u32,

    pub bl_data_size: u32,

    pub app_code_off: u32,

    pub app_code_size: u32,

    pub app_data_off: u32,

    pub app_data_size: u32,

    /// See `LsbFlags`
    pub flags: u32,
}

impl LsfLsbHeader {
    pub fn lsb_flags(&self) -> LsbFlags {
        LsbFlags::from_bits_truncate(self.flags)
    }
}

/// 64-bit DMA address split the way the falcon reads it
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct FalconU64 {
    pub lo: u32,
    pub hi: u32,
}

impl From<u64> for FalconU64 {
    fn from(value: u64) -> Self {
        Self {
            lo: value as u32,
            hi: (value >> 32) as u32,
        }
    }
}

impl From<FalconU64> for u64 {
    fn from(value: FalconU64) -> Self {
        (u64::from(value.hi) << 32) | u64::from(value.lo)
    }
}

/// Descriptor the bootloader copies into DMEM to load the rest of the falcon code
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlcnBlDmemDesc {
    /// Must stay the first member
    pub reserved: [u32; 4],

    /// Signature of the secure code, zero if there is none
    pub signature: [u32; 4],

    /// Memory aperture DMA index
    pub ctx_dma: u32,

    /// 256B aligned physical address of the code
    pub code_dma_base: FalconU64,

    /// Offset from `code_dma_base` of the non-secure code
    pub non_sec_code_off: u32,

    pub non_sec_code_size: u32,

    /// Offset from `code_dma_base` of the secure code
    pub sec_code_off: u32,

    pub sec_code_size: u32,

    pub code_entry_point: u32,

    /// 256B aligned physical address of the data
    pub data_dma_base: FalconU64,

    pub data_size: u32,

    pub argc: u32,

    pub argv: u32,
}

/// Properties of an individual WPR region
///
/// All zero tells the HS ucode to fetch the region from hardware.
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlcnAcrRegionProp {
    /// Start address, 256B units
    pub start_addr: u32,

    /// End address, 256B units
    pub end_addr: u32,

    pub region_id: u32,

    pub read_mask: u32,

    pub write_mask: u32,

    /// Clients currently using this region
    pub client_mask: u32,

    /// Location the region contents are copied from, 256B units
    pub shadow_mem_start_addr: u32,
}

#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlcnAcrRegions {
    pub no_regions: u32,

    pub region_props: [FlcnAcrRegionProp; NVGPU_FLCN_ACR_MAX_REGIONS],
}

/// Room for the bootstrap owner's own DMEM image
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Debug, Copy, Clone, Eq, PartialEq)]
pub struct UcodeReservedSpace {
    pub reserved_dmem: [u32; LSF_BOOTSTRAP_OWNER_RESERVED_DMEM_SIZE / 4],
}

impl Default for UcodeReservedSpace {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

/// Descriptor the HS ucode reads to locate the WPR and non-WPR blob
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct FlcnAcrDesc {
    /// Overwritten by the bootstrap owner's LS DMEM image; must stay first
    pub ucode_reserved_space: UcodeReservedSpace,

    /// Signature of the ACR ucode
    pub signatures: [u32; 4],

    /// WPR region holding the WPR header, 0 to fetch from hardware
    pub wpr_region_id: u32,

    /// Offset from the non-WPR base of the WPR header table
    pub wpr_offset: u32,

    /// Usable memory ranges
    pub mmu_mem_range: u32,

    pub regions: FlcnAcrRegions,

    pub nonwpr_ucode_blob_size: u32,

    _rsvd: u32,

    pub nonwpr_ucode_blob_start: u64,

    pub dummy: [u32; 4],
}

impl FlcnAcrDesc {
    /// Returns the `Range<u32>` of the fields that survive the reserved space being overwritten
    pub fn live_range() -> Range<u32> {
        let span = span_of!(FlcnAcrDesc, signatures..);
        span.start as u32..span.end as u32
    }
}

/// Shared sub-WPR header
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsfSharedSubWprHeader {
    pub use_case_id: u32,

    /// Start offset from the WPR base, 4K units
    pub start_addr: u32,

    pub size_4k: u32,
}

#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsFalconUcodeOverlay {
    pub start: u32,
    pub size: u32,
}

/// Descriptor shipped alongside every LS falcon ucode image
#[repr(C)]
#[derive(IntoBytes, FromBytes, Immutable, KnownLayout, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsFalconUcodeDesc {
    pub descriptor_size: u32,
    pub image_size: u32,
    pub tools_version: u32,
    pub app_version: u32,
    pub date: [u8; LS_FALCON_UCODE_DATE_SIZE],
    pub bootloader_start_offset: u32,
    pub bootloader_size: u32,
    pub bootloader_imem_offset: u32,
    pub bootloader_entry_point: u32,
    pub app_start_offset: u32,
    pub app_size: u32,
    pub app_imem_offset: u32,
    pub app_imem_entry: u32,
    pub app_dmem_offset: u32,
    pub app_resident_code_offset: u32,
    pub app_resident_code_size: u32,
    pub app_resident_data_offset: u32,
    pub app_resident_data_size: u32,
    pub nb_imem_overlays: u32,
    pub nb_dmem_overlays: u32,
    pub load_ovl: [LsFalconUcodeOverlay; LS_FALCON_UCODE_MAX_OVERLAYS],
    pub compressed: u32,
}

impl Default for LsFalconUcodeDesc {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

impl LsFalconUcodeDesc {
    pub fn bootloader_range(&self) -> Range<u64> {
        let start = u64::from(self.bootloader_start_offset);
        start..start + u64::from(self.bootloader_size)
    }

    pub fn app_range(&self) -> Range<u64> {
        let start = u64::from(self.app_start_offset);
        start..start + u64::from(self.app_size)
    }
}

pub const LSF_WPR_HEADER_SIZE: usize = size_of::<LsfWprHeader>();
pub const LSF_LSB_HEADER_SIZE: usize = size_of::<LsfLsbHeader>();
pub const FLCN_BL_DMEM_DESC_SIZE: usize = size_of::<FlcnBlDmemDesc>();
pub const FLCN_ACR_DESC_SIZE: usize = size_of::<FlcnAcrDesc>();
pub const LSF_SUB_WPR_HEADER_SIZE: usize = size_of::<LsfSharedSubWprHeader>();
pub const LS_FALCON_UCODE_DESC_SIZE: usize = size_of::<LsFalconUcodeDesc>();

const _: () = assert!(size_of::<LsfWprHeader>() == 24);
const _: () = assert!(size_of::<LsfUcodeDesc>() == 192);
const _: () = assert!(size_of::<LsfLsbHeader>() == 240);
const _: () = assert!(size_of::<FlcnBlDmemDesc>() == 84);
const _: () = assert!(size_of::<FlcnAcrRegionProp>() == 28);
const _: () = assert!(size_of::<UcodeReservedSpace>() == LSF_BOOTSTRAP_OWNER_RESERVED_DMEM_SIZE);
const _: () = assert!(offset_of!(FlcnAcrDesc, ucode_reserved_space) == 0);
const _: () = assert!(offset_of!(FlcnAcrDesc, nonwpr_ucode_blob_start) % 8 == 0);
const _: () = assert!(size_of::<FlcnAcrDesc>() == 632);
const _: () = assert!(size_of::<LsfSharedSubWprHeader>() == 12);
const _: () = assert!(size_of::<LsFalconUcodeDesc>() == 656);
