/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    ACR bootstrap status tracking library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod tracker;

use acr_image_types::*;

pub use tracker::BootstrapTracker;

/// Bootstrap Tracking Environment
pub trait BootstrapEnv {
    /// Block until the HS ucode signals completion
    ///
    /// # Returns
    ///
    /// * `bool` - `false` when `timeout_ms` expired first
    fn wait_for_completion(&mut self, timeout_ms: u32) -> AcrResult<bool>;

    /// Read `buf.len()` bytes of the blob starting at `offset`
    fn read_blob(&mut self, offset: u32, buf: &mut [u8]) -> AcrResult<()>;
}

/// Status of one managed falcon as last read
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootstrapEntry {
    pub falcon_id: FalconId,

    /// Excluded from the readiness requirement
    pub lazy: bool,

    /// Raw status word written by the HS ucode
    pub status: u32,
}

impl BootstrapEntry {
    pub fn status(&self) -> AcrResult<LsfImageStatus> {
        LsfImageStatus::try_from(self.status)
    }
}

/// Per falcon status after an HS run
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BootstrapReport {
    entries: [Option<BootstrapEntry>; MAX_FALCON_COUNT],
    len: usize,
}

impl Default for BootstrapReport {
    fn default() -> Self {
        Self {
            entries: [None; MAX_FALCON_COUNT],
            len: 0,
        }
    }
}

impl BootstrapReport {
    pub(crate) fn push(&mut self, entry: BootstrapEntry) -> AcrResult<()> {
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(AcrError::WPR_TABLE_FULL)?;
        *slot = Some(entry);
        self.len += 1;
        Ok(())
    }

    /// Snapshot of the status words in a table read back from the blob.
    ///
    /// No transition or staging checks are made; use `BootstrapTracker` when
    /// the staged table is at hand.
    pub fn from_table(table: &WprHeaderTable) -> AcrResult<Self> {
        let mut report = Self::default();
        for hdr in table.entries() {
            let falcon_id =
                FalconId::try_from(hdr.falcon_id).map_err(|_| AcrError::STATUS_TABLE_MISMATCH)?;
            report.push(BootstrapEntry {
                falcon_id,
                lazy: hdr.is_lazy(),
                status: hdr.status,
            })?;
        }
        Ok(report)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = &BootstrapEntry> {
        self.entries[..self.len].iter().flatten()
    }

    pub fn find(&self, falcon_id: FalconId) -> Option<&BootstrapEntry> {
        self.entries().find(|entry| entry.falcon_id == falcon_id)
    }

    /// Aggregate the bring-up result.
    ///
    /// A failed falcon fails the run even when it is lazy; lazy falcons are
    /// otherwise not required to be ready.
    pub fn check(&self) -> AcrResult<()> {
        if let Some(err) = self
            .entries()
            .filter_map(|entry| entry.status().ok())
            .find(|status| status.is_failure())
            .and_then(LsfImageStatus::error)
        {
            return Err(err);
        }

        for entry in self.entries() {
            entry.status()?;
        }

        if self
            .entries()
            .filter(|entry| !entry.lazy)
            .any(|entry| entry.status != u32::from(LsfImageStatus::BootstrapReady))
        {
            return Err(AcrError::STATUS_NOT_READY);
        }

        Ok(())
    }
}
