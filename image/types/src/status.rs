/*++

Licensed under the Apache-2.0 license.

File Name:

   status.rs

Abstract:

    LS falcon image status codes written by the HS ucode.

--*/

use crate::AcrError;

/// Image status of an LS falcon, written only by the HS ucode
///
/// ```text
///            +--> VALIDATION_CODE_FAILED
///            +--> VALIDATION_DATA_FAILED
///   COPY ----+--> VALIDATION_DONE    --+--> BOOTSTRAP_READY
///            +--> VALIDATION_SKIPPED --+
/// ```
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LsfImageStatus {
    /// Image copied from non-WPR to WPR
    Copy = 1,

    ValidationCodeFailed = 2,

    ValidationDataFailed = 3,

    /// Both code and data validation passed
    ValidationDone = 4,

    /// Debug image without a signature
    ValidationSkipped = 5,

    BootstrapReady = 6,
}

impl LsfImageStatus {
    /// Terminal, non-retryable failure
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            LsfImageStatus::ValidationCodeFailed | LsfImageStatus::ValidationDataFailed
        )
    }

    /// Validation finished without failure
    pub fn is_validated(self) -> bool {
        matches!(
            self,
            LsfImageStatus::ValidationDone
                | LsfImageStatus::ValidationSkipped
                | LsfImageStatus::BootstrapReady
        )
    }

    pub fn is_terminal(self) -> bool {
        self.is_failure() || self == LsfImageStatus::BootstrapReady
    }

    /// Whether `next` can be observed after `self`, possibly skipping
    /// intermediate states between two reads.
    pub fn can_reach(self, next: LsfImageStatus) -> bool {
        use LsfImageStatus::*;

        if self == next {
            return true;
        }
        match self {
            Copy => true,
            ValidationDone | ValidationSkipped => next == BootstrapReady,
            ValidationCodeFailed | ValidationDataFailed | BootstrapReady => false,
        }
    }

    /// Error reported when a falcon stops in this state
    pub fn error(self) -> Option<AcrError> {
        match self {
            LsfImageStatus::ValidationCodeFailed => Some(AcrError::STATUS_VALIDATION_CODE_FAILED),
            LsfImageStatus::ValidationDataFailed => Some(AcrError::STATUS_VALIDATION_DATA_FAILED),
            LsfImageStatus::BootstrapReady => None,
            _ => Some(AcrError::STATUS_NOT_READY),
        }
    }
}

impl From<LsfImageStatus> for u32 {
    /// Converts to this type from the input type.
    fn from(value: LsfImageStatus) -> Self {
        value as u32
    }
}

impl TryFrom<u32> for LsfImageStatus {
    type Error = AcrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(LsfImageStatus::Copy),
            2 => Ok(LsfImageStatus::ValidationCodeFailed),
            3 => Ok(LsfImageStatus::ValidationDataFailed),
            4 => Ok(LsfImageStatus::ValidationDone),
            5 => Ok(LsfImageStatus::ValidationSkipped),
            6 => Ok(LsfImageStatus::BootstrapReady),
            _ => Err(AcrError::STATUS_INVALID_CODE),
        }
    }
}
