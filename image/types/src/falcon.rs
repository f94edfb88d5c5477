/*++

Licensed under the Apache-2.0 license.

File Name:

   falcon.rs

Abstract:

    Falcon identities and shared sub-WPR use cases.

--*/

use crate::{
    LsbFlags, FALCON_ID_END, LSF_SHARED_DATA_SUB_WPR_FRTS_VBIOS_TABLES_SIZE_IN_4K,
    LSF_SHARED_DATA_SUB_WPR_PLAYREADY_SHARED_DATA_SIZE_IN_4K,
};

/// LS falcon identity
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(
    feature = "std",
    derive(serde_derive::Serialize, serde_derive::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum FalconId {
    /// Power management unit
    Pmu = 0,

    GspLite = 1,

    /// Front end context switch
    Fecs = 2,

    /// GPC context switch
    Gpccs = 3,

    Nvdec = 4,

    Sec2 = 7,

    Minion = 10,
}

const _: () = assert!((FalconId::Minion as u32) < FALCON_ID_END);

impl FalconId {
    pub const ALL: [FalconId; 7] = [
        FalconId::Pmu,
        FalconId::GspLite,
        FalconId::Fecs,
        FalconId::Gpccs,
        FalconId::Nvdec,
        FalconId::Sec2,
        FalconId::Minion,
    ];

    /// Falcons able to run the HS ucode and bootstrap the others
    pub fn is_bootstrap_capable(self) -> bool {
        matches!(self, FalconId::Pmu | FalconId::GspLite | FalconId::Sec2)
    }

    /// Flags used when the configuration does not override them
    pub fn default_lsb_flags(self) -> LsbFlags {
        match self {
            FalconId::Pmu => LsbFlags::DMACTL_REQ_CTX,
            FalconId::Gpccs => LsbFlags::FORCE_PRIV_LOAD,
            _ => LsbFlags::empty(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FalconId::Pmu => "PMU",
            FalconId::GspLite => "GSPLITE",
            FalconId::Fecs => "FECS",
            FalconId::Gpccs => "GPCCS",
            FalconId::Nvdec => "NVDEC",
            FalconId::Sec2 => "SEC2",
            FalconId::Minion => "MINION",
        }
    }
}

impl From<FalconId> for u32 {
    /// Converts to this type from the input type.
    fn from(value: FalconId) -> Self {
        value as u32
    }
}

impl TryFrom<u32> for FalconId {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        FalconId::ALL
            .iter()
            .copied()
            .find(|id| *id as u32 == value)
            .ok_or(())
    }
}

impl core::fmt::Display for FalconId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared sub-WPR use case, discrete memory chips only
#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(
    feature = "std",
    derive(serde_derive::Serialize, serde_derive::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum SubWprUseCase {
    FrtsVbiosTables = 1,

    PlayreadySharedData = 2,
}

impl SubWprUseCase {
    /// Statically assigned region size, in 4K units
    pub fn size_in_4k(self) -> u32 {
        match self {
            SubWprUseCase::FrtsVbiosTables => LSF_SHARED_DATA_SUB_WPR_FRTS_VBIOS_TABLES_SIZE_IN_4K,
            SubWprUseCase::PlayreadySharedData => {
                LSF_SHARED_DATA_SUB_WPR_PLAYREADY_SHARED_DATA_SIZE_IN_4K
            }
        }
    }
}

impl From<SubWprUseCase> for u32 {
    fn from(value: SubWprUseCase) -> Self {
        value as u32
    }
}

impl TryFrom<u32> for SubWprUseCase {
    type Error = ();

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SubWprUseCase::FrtsVbiosTables),
            2 => Ok(SubWprUseCase::PlayreadySharedData),
            _ => Err(()),
        }
    }
}
