/*++

Licensed under the Apache-2.0 license.

File Name:

   layout.rs

Abstract:

    Alignment helpers and maximum region sizes of the non-WPR blob.

--*/

use crate::*;

/// Round `value` up to `align`, evaluated at compile time.
///
/// Only for constants: overflow fails const evaluation.
pub const fn align_up_const(value: u32, align: u32) -> u32 {
    (value + align - 1) & !(align - 1)
}

/// Round `value` up to the next multiple of `align`
///
/// # Arguments
///
/// * `value` - Raw size or offset
/// * `align` - Power of two alignment
///
/// # Returns
///
/// * `u32` - Smallest multiple of `align` not below `value`
pub fn align_up(value: u32, align: u32) -> AcrResult<u32> {
    if !align.is_power_of_two() {
        return Err(AcrError::LAYOUT_INVALID_ALIGNMENT);
    }
    value
        .checked_add(align - 1)
        .map(|v| v & !(align - 1))
        .ok_or(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)
}

pub fn align_up_u64(value: u64, align: u64) -> AcrResult<u64> {
    if !align.is_power_of_two() {
        return Err(AcrError::LAYOUT_INVALID_ALIGNMENT);
    }
    value
        .checked_add(align - 1)
        .map(|v| v & !(align - 1))
        .ok_or(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)
}

pub const fn is_aligned(value: u32, align: u32) -> bool {
    value & (align - 1) == 0
}

pub const fn is_aligned_u64(value: u64, align: u64) -> bool {
    value & (align - 1) == 0
}

/// Add two blob offsets, failing instead of wrapping
pub fn checked_offset(base: u32, len: u32) -> AcrResult<u32> {
    base.checked_add(len).ok_or(AcrError::LAYOUT_BLOB_TOO_LARGE)
}

/// Size reserved for the WPR header table
pub const LSF_WPR_HEADERS_TOTAL_SIZE_MAX: u32 = align_up_const(
    LSF_WPR_HEADER_SIZE as u32 * FALCON_ID_END,
    LSF_WPR_HEADER_ALIGNMENT,
);

/// Size reserved for one LSB header
pub const LSF_LSB_HEADER_TOTAL_SIZE_MAX: u32 =
    align_up_const(LSF_LSB_HEADER_SIZE as u32, LSF_LSB_HEADER_ALIGNMENT);

/// Size reserved for the shared sub-WPR header table
pub const LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX: u32 = align_up_const(
    LSF_SUB_WPR_HEADER_SIZE as u32 * MAX_SUPPORTED_SHARED_SUB_WPR_USE_CASES as u32,
    LSF_SUB_WPR_HEADER_ALIGNMENT,
);

/// Size reserved for one bootloader descriptor
pub const LSF_BL_DATA_TOTAL_SIZE: u32 =
    align_up_const(FLCN_BL_DMEM_DESC_SIZE as u32, LSF_BL_DATA_SIZE_ALIGNMENT);

/// Bytes covered by a sub-WPR of `size_4k` 4K units
pub fn sub_wpr_size_bytes(size_4k: u32) -> AcrResult<u32> {
    size_4k
        .checked_mul(SUB_WPR_SIZE_ALIGNMENT)
        .ok_or(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 256), Ok(0));
        assert_eq!(align_up(1, 256), Ok(256));
        assert_eq!(align_up(256, 256), Ok(256));
        assert_eq!(align_up(1500, 4096), Ok(4096));
        assert_eq!(align_up(4097, 4096), Ok(8192));
    }

    #[test]
    fn test_align_up_overflow() {
        assert_eq!(
            align_up(u32::MAX - 10, 256),
            Err(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)
        );
        assert_eq!(align_up(u32::MAX - 255, 256), Ok(u32::MAX - 255));
    }

    #[test]
    fn test_align_up_rejects_non_power_of_two() {
        assert_eq!(align_up(10, 0), Err(AcrError::LAYOUT_INVALID_ALIGNMENT));
        assert_eq!(align_up(10, 100), Err(AcrError::LAYOUT_INVALID_ALIGNMENT));
    }

    #[test]
    fn test_region_maximums() {
        assert_eq!(LSF_WPR_HEADERS_TOTAL_SIZE_MAX, 512);
        assert_eq!(LSF_LSB_HEADER_TOTAL_SIZE_MAX, 256);
        assert_eq!(LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX, 256);
        assert_eq!(LSF_BL_DATA_TOTAL_SIZE, 256);
    }

    #[test]
    fn test_sub_wpr_size_bytes() {
        assert_eq!(sub_wpr_size_bytes(0x100), Ok(1024 * 1024));
        assert_eq!(
            sub_wpr_size_bytes(0x10_0000),
            Err(AcrError::LAYOUT_ALIGNMENT_OVERFLOW)
        );
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(4096, LSF_UCODE_DATA_ALIGNMENT));
        assert!(!is_aligned(4096 + 256, LSF_UCODE_DATA_ALIGNMENT));
        assert!(is_aligned_u64(0x1_0000_0100, 256));
    }
}
