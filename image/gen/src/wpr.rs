/*++

Licensed under the Apache-2.0 license.

File Name:

   wpr.rs

Abstract:

    Builds the WPR header table and elects the bootstrap owner.

--*/

use acr_image_types::*;

/// WPR header table builder
#[derive(Debug, Default)]
pub struct WprHeaderTableBuilder {
    table: WprHeaderTable,
    bootstrap_owner: Option<FalconId>,
}

impl WprHeaderTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the owner instead of electing the first capable falcon
    pub fn bootstrap_owner(mut self, owner: Option<FalconId>) -> Self {
        self.bootstrap_owner = owner;
        self
    }

    /// Append the entry for a staged falcon
    ///
    /// # Arguments
    ///
    /// * `falcon_id`   - Falcon the LSB header belongs to
    /// * `lsb_offset`  - LSB header offset from the non-WPR base
    /// * `lazy`        - Leave the bootstrap to the driver
    /// * `bin_version` - LS ucode binary version
    pub fn push(
        &mut self,
        falcon_id: FalconId,
        lsb_offset: u32,
        lazy: bool,
        bin_version: u32,
    ) -> AcrResult<()> {
        if self.table.find(falcon_id).is_some() {
            return Err(AcrError::WPR_TABLE_DUPLICATE_FALCON);
        }
        if !layout::is_aligned(lsb_offset, LSF_LSB_HEADER_ALIGNMENT) {
            return Err(AcrError::WPR_TABLE_OFFSET_UNALIGNED);
        }
        if let Some(last) = self.table.entries().last() {
            if lsb_offset <= last.lsb_offset {
                return Err(AcrError::WPR_TABLE_OFFSET_NOT_MONOTONIC);
            }
        }

        self.table.push(LsfWprHeader {
            falcon_id: falcon_id.into(),
            lsb_offset,
            bootstrap_owner: 0,
            lazy_bootstrap: lazy.into(),
            bin_version,
            status: LsfImageStatus::Copy.into(),
        })
    }

    fn elect_owner(&self) -> AcrResult<FalconId> {
        let entries = self.table.entries();

        let Some(owner) = self.bootstrap_owner else {
            return entries
                .iter()
                .filter(|hdr| !hdr.is_lazy())
                .filter_map(|hdr| FalconId::try_from(hdr.falcon_id).ok())
                .find(|id| id.is_bootstrap_capable())
                .ok_or(AcrError::WPR_TABLE_NO_BOOTSTRAP_OWNER);
        };

        let (_, hdr) = self
            .table
            .find(owner)
            .ok_or(AcrError::WPR_TABLE_OWNER_NOT_MANAGED)?;
        if !owner.is_bootstrap_capable() {
            return Err(AcrError::WPR_TABLE_OWNER_NOT_ELIGIBLE);
        }
        if hdr.is_lazy() {
            return Err(AcrError::WPR_TABLE_OWNER_LAZY);
        }
        Ok(owner)
    }

    /// Elect the owner and stamp it into every entry
    pub fn build(mut self) -> AcrResult<WprHeaderTable> {
        if self.table.is_empty() {
            return Err(AcrError::WPR_TABLE_EMPTY);
        }

        let owner = self.elect_owner()?;
        for hdr in self.table.entries_mut() {
            hdr.bootstrap_owner = owner.into();
        }

        log::debug!(
            "WPR header table: {} falcons, bootstrap owner {}",
            self.table.len(),
            owner
        );
        Ok(self.table)
    }
}
