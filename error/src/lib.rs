/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains API and macros used by the ACR blob libraries for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::num::{NonZeroU32, TryFromIntError};

/// ACR Error Type
/// Derives debug, copy, clone, eq, and partial eq
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AcrError(pub NonZeroU32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code, plus a lookup returning the
/// doc string of a code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:literal, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: AcrError = AcrError::new_const($value);
        )*

        /// Returns the human readable description of the error code
        pub fn description(&self) -> &'static str {
            match self.0.get() {
                $(
                    $value => $doc,
                )*
                _ => "Unknown error",
            }
        }

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl AcrError {
    /// Create an ACR error; intended to only be used from const contexts, as we don't want
    /// runtime panics if val is zero. The preferred way to get an AcrError from a u32 is to
    /// use `AcrError::try_from()` from the `TryFrom` trait impl.
    const fn new_const(val: u32) -> Self {
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("AcrError cannot be 0"),
        }
    }

    define_error_constants![
        (
            LAYOUT_ALIGNMENT_OVERFLOW,
            0x00010001,
            "Layout Error: aligned value overflows 32 bits"
        ),
        (
            LAYOUT_BLOB_TOO_LARGE,
            0x00010002,
            "Layout Error: non-WPR blob exceeds the addressable size"
        ),
        (
            LAYOUT_INVALID_ALIGNMENT,
            0x00010003,
            "Layout Error: alignment is not a power of two"
        ),
        (
            LAYOUT_UNALIGNED_BASE,
            0x00010004,
            "Layout Error: base address is not 256 byte aligned"
        ),
        (
            LAYOUT_BLOB_TRUNCATED,
            0x00010005,
            "Layout Error: record extends past the end of the blob"
        ),
        (
            UCODE_DESC_DEP_MAP_OVERFLOW,
            0x00020001,
            "Ucode Descriptor Error: dependency map count exceeds capacity"
        ),
        (
            UCODE_DESC_FALCON_ID_MISMATCH,
            0x00020002,
            "Ucode Descriptor Error: signature names a different falcon"
        ),
        (
            UCODE_DESC_INVALID_DEP_FALCON,
            0x00020003,
            "Ucode Descriptor Error: dependency map names an unknown falcon"
        ),
        (
            UCODE_DESC_MALFORMED,
            0x00020004,
            "Ucode Descriptor Error: signature record is truncated"
        ),
        (
            FW_DESC_MALFORMED,
            0x00030001,
            "Firmware Error: ucode descriptor is truncated"
        ),
        (
            FW_DESC_SIZE_MISMATCH,
            0x00030002,
            "Firmware Error: descriptor image size does not match the image"
        ),
        (
            FW_SECTION_OUT_OF_BOUNDS,
            0x00030003,
            "Firmware Error: section extends past the end of the image"
        ),
        (
            FW_SECTION_UNALIGNED,
            0x00030004,
            "Firmware Error: section offset is not 256 byte aligned"
        ),
        (
            FW_SECTION_SIZE_UNDERFLOW,
            0x00030005,
            "Firmware Error: resident data offset lies past the application end"
        ),
        (
            FW_IMAGE_EMPTY,
            0x00030006,
            "Firmware Error: ucode image is empty"
        ),
        (
            FW_SECTION_OVERLAP,
            0x00030007,
            "Firmware Error: bootloader overlaps the application"
        ),
        (
            WPR_TABLE_DUPLICATE_FALCON,
            0x00040001,
            "WPR Table Error: falcon appears more than once"
        ),
        (
            WPR_TABLE_NO_BOOTSTRAP_OWNER,
            0x00040002,
            "WPR Table Error: no falcon is eligible to be bootstrap owner"
        ),
        (
            WPR_TABLE_OWNER_NOT_ELIGIBLE,
            0x00040003,
            "WPR Table Error: requested bootstrap owner cannot run the HS ucode"
        ),
        (
            WPR_TABLE_OWNER_NOT_MANAGED,
            0x00040004,
            "WPR Table Error: requested bootstrap owner is not a managed falcon"
        ),
        (
            WPR_TABLE_OWNER_LAZY,
            0x00040005,
            "WPR Table Error: bootstrap owner cannot be lazily bootstrapped"
        ),
        (
            WPR_TABLE_FULL,
            0x00040006,
            "WPR Table Error: more falcons than table slots"
        ),
        (
            WPR_TABLE_EMPTY,
            0x00040007,
            "WPR Table Error: no falcons to manage"
        ),
        (
            WPR_TABLE_OFFSET_UNALIGNED,
            0x00040008,
            "WPR Table Error: LSB header offset is not 256 byte aligned"
        ),
        (
            WPR_TABLE_OFFSET_NOT_MONOTONIC,
            0x00040009,
            "WPR Table Error: LSB header offsets are not increasing"
        ),
        (
            WPR_TABLE_TRUNCATED,
            0x0004000A,
            "WPR Table Error: buffer is smaller than the header table"
        ),
        (
            REGION_TOO_MANY_REGIONS,
            0x00050001,
            "Region Error: more WPR regions than the descriptor holds"
        ),
        (
            REGION_NO_REGIONS,
            0x00050002,
            "Region Error: driver supplied geometry without regions"
        ),
        (
            REGION_ADDRESS_UNALIGNED,
            0x00050003,
            "Region Error: region address is not 256 byte aligned"
        ),
        (
            REGION_INVALID_RANGE,
            0x00050004,
            "Region Error: region end does not follow region start"
        ),
        (
            REGION_ADDRESS_OUT_OF_RANGE,
            0x00050005,
            "Region Error: region address does not fit the descriptor"
        ),
        (
            REGION_SUB_WPR_DUPLICATE,
            0x00050006,
            "Region Error: shared sub-WPR use case requested twice"
        ),
        (
            REGION_SUB_WPR_TOO_MANY,
            0x00050007,
            "Region Error: more shared sub-WPR use cases than supported"
        ),
        (
            STATUS_HS_TIMEOUT,
            0x00060001,
            "Status Error: HS ucode did not complete in time"
        ),
        (
            STATUS_VALIDATION_CODE_FAILED,
            0x00060002,
            "Status Error: LS falcon code validation failed"
        ),
        (
            STATUS_VALIDATION_DATA_FAILED,
            0x00060003,
            "Status Error: LS falcon data validation failed"
        ),
        (
            STATUS_NOT_READY,
            0x00060004,
            "Status Error: LS falcon did not reach bootstrap ready"
        ),
        (
            STATUS_INVALID_CODE,
            0x00060005,
            "Status Error: LS falcon reported an unknown status code"
        ),
        (
            STATUS_ILLEGAL_TRANSITION,
            0x00060006,
            "Status Error: LS falcon status moved along an illegal edge"
        ),
        (
            STATUS_TABLE_MISMATCH,
            0x00060007,
            "Status Error: header table differs from the staged table"
        ),
        (
            STATUS_BLOB_READ_FAILURE,
            0x00060008,
            "Status Error: failed to read the non-WPR blob"
        ),
    ];
}

impl core::fmt::Display for AcrError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:08x})", self.description(), self.0.get())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AcrError {}

impl From<core::num::NonZeroU32> for crate::AcrError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::AcrError(val)
    }
}

impl From<AcrError> for core::num::NonZeroU32 {
    fn from(val: AcrError) -> Self {
        val.0
    }
}

impl From<AcrError> for u32 {
    fn from(val: AcrError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for AcrError {
    type Error = TryFromIntError;
    fn try_from(val: u32) -> Result<Self, TryFromIntError> {
        match NonZeroU32::try_from(val) {
            Ok(val) => Ok(AcrError(val)),
            Err(err) => Err(err),
        }
    }
}

pub type AcrResult<T> = Result<T, AcrError>;
