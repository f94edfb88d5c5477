/*++

Licensed under the Apache-2.0 license.

File Name:

   table.rs

Abstract:

    Bounded WPR and shared sub-WPR header tables.

    Both tables carry an explicit entry count. The sentinel terminator is
    only produced when encoding for the HS ucode and only consumed when
    decoding a staged blob.

--*/

use zerocopy::{FromBytes, IntoBytes};

use crate::layout::{LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX, LSF_WPR_HEADERS_TOTAL_SIZE_MAX};
use crate::*;

/// Ordered WPR header table, one entry per managed falcon
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WprHeaderTable {
    entries: [LsfWprHeader; MAX_FALCON_COUNT],
    len: usize,
}

impl Default for WprHeaderTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WprHeaderTable {
    pub const fn new() -> Self {
        Self {
            entries: [LsfWprHeader {
                falcon_id: 0,
                lsb_offset: 0,
                bootstrap_owner: 0,
                lazy_bootstrap: 0,
                bin_version: 0,
                status: 0,
            }; MAX_FALCON_COUNT],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn entries(&self) -> &[LsfWprHeader] {
        &self.entries[..self.len]
    }

    pub fn entries_mut(&mut self) -> &mut [LsfWprHeader] {
        &mut self.entries[..self.len]
    }

    pub fn push(&mut self, header: LsfWprHeader) -> AcrResult<()> {
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(AcrError::WPR_TABLE_FULL)?;
        *slot = header;
        self.len += 1;
        Ok(())
    }

    /// Find the entry and its index for `falcon_id`
    pub fn find(&self, falcon_id: FalconId) -> Option<(usize, &LsfWprHeader)> {
        self.entries()
            .iter()
            .enumerate()
            .find(|(_, hdr)| hdr.falcon_id == u32::from(falcon_id))
    }

    /// Owner recorded in the first entry
    pub fn bootstrap_owner(&self) -> Option<FalconId> {
        self.entries()
            .first()
            .and_then(|hdr| FalconId::try_from(hdr.bootstrap_owner).ok())
    }

    /// Blob offset of the `status` field of entry `index`
    pub fn status_offset(table_offset: u32, index: usize) -> u32 {
        table_offset + (index * LSF_WPR_HEADER_SIZE) as u32 + LsfWprHeader::status_range().start
    }

    /// Encode the table into the `LSF_WPR_HEADERS_TOTAL_SIZE_MAX` bytes reserved for it.
    ///
    /// Unused bytes are zeroed and the slot after the last entry is tagged
    /// with an invalid falcon id.
    pub fn encode(&self, out: &mut [u8]) -> AcrResult<()> {
        let out = out
            .get_mut(..LSF_WPR_HEADERS_TOTAL_SIZE_MAX as usize)
            .ok_or(AcrError::WPR_TABLE_TRUNCATED)?;
        out.fill(0);

        let mut slots = out.chunks_exact_mut(LSF_WPR_HEADER_SIZE);
        for (slot, hdr) in slots.by_ref().zip(self.entries()) {
            slot.copy_from_slice(hdr.as_bytes());
        }
        if let Some(slot) = slots.next() {
            let terminator = LsfWprHeader {
                falcon_id: FALCON_ID_INVALID,
                ..Default::default()
            };
            slot.copy_from_slice(terminator.as_bytes());
        }
        Ok(())
    }

    /// Decode a table from the start of `bytes`, stopping at the first slot
    /// that does not name a managed falcon.
    pub fn decode(bytes: &[u8]) -> AcrResult<Self> {
        let bytes = bytes
            .get(..LSF_WPR_HEADERS_TOTAL_SIZE_MAX as usize)
            .ok_or(AcrError::WPR_TABLE_TRUNCATED)?;

        let mut table = Self::new();
        for slot in bytes.chunks_exact(LSF_WPR_HEADER_SIZE).take(MAX_FALCON_COUNT) {
            let hdr =
                LsfWprHeader::read_from_bytes(slot).map_err(|_| AcrError::WPR_TABLE_TRUNCATED)?;
            if FalconId::try_from(hdr.falcon_id).is_err() {
                break;
            }
            table.push(hdr)?;
        }
        Ok(table)
    }
}

/// Shared sub-WPR header table
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SubWprTable {
    entries: [LsfSharedSubWprHeader; MAX_SUPPORTED_SHARED_SUB_WPR_USE_CASES],
    len: usize,
}

impl Default for SubWprTable {
    fn default() -> Self {
        Self {
            entries: [LsfSharedSubWprHeader::default(); MAX_SUPPORTED_SHARED_SUB_WPR_USE_CASES],
            len: 0,
        }
    }
}

impl SubWprTable {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn entries(&self) -> &[LsfSharedSubWprHeader] {
        &self.entries[..self.len]
    }

    pub fn push(&mut self, header: LsfSharedSubWprHeader) -> AcrResult<()> {
        if self
            .entries()
            .iter()
            .any(|hdr| hdr.use_case_id == header.use_case_id)
        {
            return Err(AcrError::REGION_SUB_WPR_DUPLICATE);
        }
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(AcrError::REGION_SUB_WPR_TOO_MANY)?;
        *slot = header;
        self.len += 1;
        Ok(())
    }

    /// Encode into the `LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX` bytes reserved for it
    pub fn encode(&self, out: &mut [u8]) -> AcrResult<()> {
        let out = out
            .get_mut(..LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX as usize)
            .ok_or(AcrError::WPR_TABLE_TRUNCATED)?;
        out.fill(0);

        let mut slots = out.chunks_exact_mut(LSF_SUB_WPR_HEADER_SIZE);
        for (slot, hdr) in slots.by_ref().zip(self.entries()) {
            slot.copy_from_slice(hdr.as_bytes());
        }
        if let Some(slot) = slots.next() {
            let terminator = LsfSharedSubWprHeader {
                use_case_id: LSF_SHARED_DATA_SUB_WPR_USE_CASE_ID_INVALID,
                ..Default::default()
            };
            slot.copy_from_slice(terminator.as_bytes());
        }
        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> AcrResult<Self> {
        let bytes = bytes
            .get(..LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX as usize)
            .ok_or(AcrError::WPR_TABLE_TRUNCATED)?;

        let mut table = Self::default();
        for slot in bytes
            .chunks_exact(LSF_SUB_WPR_HEADER_SIZE)
            .take(MAX_SUPPORTED_SHARED_SUB_WPR_USE_CASES)
        {
            let hdr = LsfSharedSubWprHeader::read_from_bytes(slot)
                .map_err(|_| AcrError::WPR_TABLE_TRUNCATED)?;
            if SubWprUseCase::try_from(hdr.use_case_id).is_err() {
                break;
            }
            table.push(hdr)?;
        }
        Ok(table)
    }
}
