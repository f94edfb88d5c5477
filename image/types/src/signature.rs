/*++

Licensed under the Apache-2.0 license.

File Name:

   signature.rs

Abstract:

    Typed view of the signature metadata shipped with an LS falcon ucode.

--*/

use crate::*;

/// Dependency map entry: a dependent falcon and its hash contribution
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DepMapEntry {
    pub falcon_id: FalconId,
    pub hash: [u8; 4],
}

/// Bounded, insertion ordered dependency map.
///
/// The HS ucode hashes the packed entries in order, so the order entries are
/// pushed in is the order they are encoded in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DepMap {
    entries: [Option<DepMapEntry>; LSF_DEP_MAP_MAX_ENTRIES],
    len: usize,
}

impl Default for DepMap {
    fn default() -> Self {
        Self::new()
    }
}

impl DepMap {
    pub const fn new() -> Self {
        Self {
            entries: [None; LSF_DEP_MAP_MAX_ENTRIES],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an entry, failing closed once the map is full
    pub fn push(&mut self, entry: DepMapEntry) -> AcrResult<()> {
        let slot = self
            .entries
            .get_mut(self.len)
            .ok_or(AcrError::UCODE_DESC_DEP_MAP_OVERFLOW)?;
        *slot = Some(entry);
        self.len += 1;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DepMapEntry> {
        self.entries[..self.len].iter().flatten()
    }

    /// Pack the entries; bytes past the last entry stay zero
    pub fn encode(&self) -> ([u8; LSF_DEP_MAP_BYTE_SIZE], u32) {
        let mut packed = [0u8; LSF_DEP_MAP_BYTE_SIZE];
        for (chunk, entry) in packed.chunks_exact_mut(8).zip(self.iter()) {
            chunk[..4].copy_from_slice(&u32::from(entry.falcon_id).to_ne_bytes());
            chunk[4..].copy_from_slice(&entry.hash);
        }
        (packed, self.len as u32)
    }

    /// Unpack `count` entries; bytes past them are ignored
    pub fn decode(packed: &[u8; LSF_DEP_MAP_BYTE_SIZE], count: u32) -> AcrResult<Self> {
        if count as usize > LSF_DEP_MAP_MAX_ENTRIES {
            return Err(AcrError::UCODE_DESC_DEP_MAP_OVERFLOW);
        }
        let mut map = DepMap::new();
        for chunk in packed.chunks_exact(8).take(count as usize) {
            let mut id = [0u8; 4];
            id.copy_from_slice(&chunk[..4]);
            let falcon_id = FalconId::try_from(u32::from_ne_bytes(id))
                .map_err(|_| AcrError::UCODE_DESC_INVALID_DEP_FALCON)?;
            let mut hash = [0u8; 4];
            hash.copy_from_slice(&chunk[4..]);
            map.push(DepMapEntry { falcon_id, hash })?;
        }
        Ok(map)
    }
}

/// Signature metadata of an LS falcon ucode
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct LsSignature {
    /// Falcon the signature was produced for, as recorded in the signature file
    pub falcon_id: u32,

    /// Production code and data signatures
    pub prd_keys: Option<[[u8; LSF_UCODE_KEY_SIZE]; 2]>,

    /// Debug code and data signatures
    pub dbg_keys: Option<[[u8; LSF_UCODE_KEY_SIZE]; 2]>,

    /// Version folded into the signature, present when versioning is supported
    pub version: Option<u32>,

    pub dep_map: DepMap,

    pub kdf: [u8; LSF_KDF_SIZE],
}

impl LsSignature {
    /// Metadata of a debug image that carries no signature
    pub fn unsigned(falcon_id: FalconId) -> Self {
        Self {
            falcon_id: falcon_id.into(),
            ..Default::default()
        }
    }

    pub fn is_signed(&self) -> bool {
        self.prd_keys.is_some() || self.dbg_keys.is_some()
    }
}

impl TryFrom<&LsfUcodeDesc> for LsSignature {
    type Error = AcrError;

    fn try_from(desc: &LsfUcodeDesc) -> Result<Self, Self::Error> {
        Ok(Self {
            falcon_id: desc.falcon_id,
            prd_keys: (desc.b_prd_present != 0).then_some(desc.prd_keys),
            dbg_keys: (desc.b_dbg_present != 0).then_some(desc.dbg_keys),
            version: (desc.bsupports_versioning != 0).then_some(desc.version),
            dep_map: DepMap::decode(&desc.dep_map, desc.dep_map_count)?,
            kdf: desc.kdf,
        })
    }
}
