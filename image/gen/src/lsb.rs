/*++

Licensed under the Apache-2.0 license.

File Name:

   lsb.rs

Abstract:

    Lays out one falcon's LSB header, ucode payload and bootloader data,
    and builds the bootloader descriptor stored in the bootloader data.

--*/

use acr_image_types::layout::*;
use acr_image_types::*;

/// Check a ucode descriptor against the image it describes
pub fn validate_ucode_desc(desc: &LsFalconUcodeDesc, image_len: usize) -> AcrResult<()> {
    if image_len == 0 {
        return Err(AcrError::FW_IMAGE_EMPTY);
    }
    let image_len = image_len as u64;

    let bl = desc.bootloader_range();
    let app = desc.app_range();
    if bl.end > image_len || app.end > image_len {
        return Err(AcrError::FW_SECTION_OUT_OF_BOUNDS);
    }

    // The LSB copy sizes count the bootloader and the application separately
    if !bl.is_empty() && !app.is_empty() && bl.start < app.end && app.start < bl.end {
        return Err(AcrError::FW_SECTION_OVERLAP);
    }

    // These become DMA bases and offsets in the bootloader descriptor or
    // LSB header
    for offset in [
        desc.bootloader_imem_offset,
        desc.app_start_offset,
        desc.app_resident_code_offset,
        desc.app_resident_data_offset,
    ] {
        if !is_aligned(offset, LSF_CODE_SIZE_ALIGNMENT) {
            return Err(AcrError::FW_SECTION_UNALIGNED);
        }
    }

    if desc.app_resident_data_offset > desc.app_size {
        return Err(AcrError::FW_SECTION_SIZE_UNDERFLOW);
    }

    let app_size = u64::from(desc.app_size);
    let code_end =
        u64::from(desc.app_resident_code_offset) + u64::from(desc.app_resident_code_size);
    let data_end =
        u64::from(desc.app_resident_data_offset) + u64::from(desc.app_resident_data_size);
    if code_end > app_size || data_end > app_size {
        return Err(AcrError::FW_SECTION_OUT_OF_BOUNDS);
    }

    Ok(())
}

/// Where one falcon's sections landed in the blob
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct LsbPlacement {
    /// LSB header offset, referenced by the WPR header
    pub lsb_offset: u32,

    /// Ucode payload offset
    pub ucode_off: u32,

    /// Image size padded to the code size alignment
    pub payload_size: u32,

    /// Bootloader descriptor offset
    pub bl_data_off: u32,

    /// Cursor after the bootloader data
    pub end: u32,
}

/// LSB header builder
pub struct LsbHeaderBuilder<'a> {
    desc: &'a LsFalconUcodeDesc,
    image_len: u32,
    signature: LsfUcodeDesc,
    flags: LsbFlags,
}

impl<'a> LsbHeaderBuilder<'a> {
    /// Create an instance of `LsbHeaderBuilder`
    ///
    /// # Arguments
    ///
    /// * `desc`      - Ucode descriptor of the image
    /// * `image`     - Ucode image
    /// * `signature` - Descriptor built by `UcodeDescBuilder`
    pub fn new(
        desc: &'a LsFalconUcodeDesc,
        image: &[u8],
        signature: LsfUcodeDesc,
    ) -> AcrResult<Self> {
        validate_ucode_desc(desc, image.len())?;
        let image_len = u32::try_from(image.len()).map_err(|_| AcrError::LAYOUT_BLOB_TOO_LARGE)?;
        Ok(Self {
            desc,
            image_len,
            signature,
            flags: LsbFlags::empty(),
        })
    }

    pub fn flags(mut self, flags: LsbFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Place the sections at `cursor` and fill the header
    ///
    /// # Arguments
    ///
    /// * `cursor` - Current write offset into the non-WPR blob
    ///
    /// # Returns
    ///
    /// * `(LsfLsbHeader, LsbPlacement)` - Header and the advanced cursor
    pub fn build(&self, cursor: u32) -> AcrResult<(LsfLsbHeader, LsbPlacement)> {
        let desc = self.desc;

        let lsb_offset = align_up(cursor, LSF_LSB_HEADER_ALIGNMENT)?;
        let ucode_off = align_up(
            checked_offset(lsb_offset, LSF_LSB_HEADER_SIZE as u32)?,
            LSF_UCODE_DATA_ALIGNMENT,
        )?;
        let payload_size = align_up(self.image_len, LSF_CODE_SIZE_ALIGNMENT)?;
        let bl_data_off = align_up(
            checked_offset(ucode_off, payload_size)?,
            LSF_BL_DATA_ALIGNMENT,
        )?;
        let end = checked_offset(bl_data_off, LSF_BL_DATA_TOTAL_SIZE)?;

        let bl_code_size = align_up(desc.bootloader_size, LSF_BL_CODE_SIZE_ALIGNMENT)?;
        let ucode_size = checked_offset(
            align_up(desc.app_resident_data_offset, LSF_CODE_SIZE_ALIGNMENT)?,
            bl_code_size,
        )?;
        let data_size = checked_offset(align_up(desc.app_size, LSF_DATA_SIZE_ALIGNMENT)?, bl_code_size)?
            .checked_sub(ucode_size)
            .ok_or(AcrError::FW_SECTION_SIZE_UNDERFLOW)?;

        // The HS ucode copies ucode_size + data_size bytes from ucode_off
        if u64::from(ucode_size) + u64::from(data_size) > u64::from(payload_size) {
            return Err(AcrError::FW_SECTION_OUT_OF_BOUNDS);
        }

        let header = LsfLsbHeader {
            signature: self.signature,
            ucode_off,
            ucode_size,
            data_size,
            bl_code_size,
            bl_imem_off: desc.bootloader_imem_offset,
            bl_data_off,
            bl_data_size: LSF_BL_DATA_TOTAL_SIZE,
            app_code_off: checked_offset(desc.app_start_offset, desc.app_resident_code_offset)?,
            app_code_size: align_up(desc.app_resident_code_size, LSF_CODE_SIZE_ALIGNMENT)?,
            app_data_off: checked_offset(desc.app_start_offset, desc.app_resident_data_offset)?,
            app_data_size: align_up(desc.app_resident_data_size, LSF_DATA_SIZE_ALIGNMENT)?,
            flags: self.flags.bits(),
        };

        let placement = LsbPlacement {
            lsb_offset,
            ucode_off,
            payload_size,
            bl_data_off,
            end,
        };

        Ok((header, placement))
    }
}

/// Bootloader descriptor builder
#[derive(Debug, Default, Copy, Clone)]
pub struct BlDescBuilder {
    wpr_base: u64,
    ctx_dma: u32,
    argc: u32,
    argv: u32,
}

impl BlDescBuilder {
    /// Create an instance of `BlDescBuilder`
    ///
    /// # Arguments
    ///
    /// * `wpr_base` - Physical address the HS ucode copies the blob to
    pub fn new(wpr_base: u64) -> Self {
        Self {
            wpr_base,
            ..Default::default()
        }
    }

    pub fn ctx_dma(mut self, ctx_dma: u32) -> Self {
        self.ctx_dma = ctx_dma;
        self
    }

    pub fn args(mut self, argc: u32, argv: u32) -> Self {
        self.argc = argc;
        self.argv = argv;
        self
    }

    /// Build the descriptor addressing the image at its WPR location
    pub fn build(
        &self,
        desc: &LsFalconUcodeDesc,
        header: &LsfLsbHeader,
    ) -> AcrResult<FlcnBlDmemDesc> {
        let code_base = self
            .wpr_base
            .checked_add(u64::from(header.ucode_off) + u64::from(desc.app_start_offset))
            .ok_or(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)?;
        let data_base = code_base
            .checked_add(u64::from(desc.app_resident_data_offset))
            .ok_or(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)?;

        if !is_aligned_u64(code_base, u64::from(LSF_BL_DATA_ALIGNMENT))
            || !is_aligned_u64(data_base, u64::from(LSF_BL_DATA_ALIGNMENT))
        {
            return Err(AcrError::LAYOUT_UNALIGNED_BASE);
        }

        Ok(FlcnBlDmemDesc {
            ctx_dma: self.ctx_dma,
            code_dma_base: code_base.into(),
            non_sec_code_off: desc.app_resident_code_offset,
            non_sec_code_size: desc.app_resident_code_size,
            code_entry_point: desc.app_imem_entry,
            data_dma_base: data_base.into(),
            data_size: desc.app_resident_data_size,
            argc: self.argc,
            argv: self.argv,
            ..Default::default()
        })
    }
}
