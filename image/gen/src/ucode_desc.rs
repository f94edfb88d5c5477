/*++

Licensed under the Apache-2.0 license.

File Name:

   ucode_desc.rs

Abstract:

    Builds the per falcon signature and dependency map descriptor.

--*/

use acr_image_types::*;

/// Ucode descriptor builder
pub struct UcodeDescBuilder<'a> {
    falcon_id: FalconId,
    signature: &'a LsSignature,
    dependencies: &'a [DepMapEntry],
}

impl<'a> UcodeDescBuilder<'a> {
    /// Create an instance of `UcodeDescBuilder`
    ///
    /// # Arguments
    ///
    /// * `falcon_id` - Falcon the descriptor is built for
    /// * `signature` - Signature metadata parsed from the firmware
    pub fn new(falcon_id: FalconId, signature: &'a LsSignature) -> Self {
        Self {
            falcon_id,
            signature,
            dependencies: &[],
        }
    }

    /// Dependencies appended after the ones recorded in the signature
    pub fn dependencies(mut self, dependencies: &'a [DepMapEntry]) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Build the descriptor
    ///
    /// # Returns
    ///
    /// * `LsfUcodeDesc` - Descriptor embedded in the falcon's LSB header
    pub fn build(&self) -> AcrResult<LsfUcodeDesc> {
        let sig = self.signature;
        if sig.falcon_id != u32::from(self.falcon_id) {
            return Err(AcrError::UCODE_DESC_FALCON_ID_MISMATCH);
        }

        let mut dep_map = sig.dep_map;
        for dep in self.dependencies {
            dep_map.push(*dep)?;
        }
        let (packed, count) = dep_map.encode();

        let mut desc = LsfUcodeDesc {
            falcon_id: self.falcon_id.into(),
            dep_map_count: count,
            dep_map: packed,
            kdf: sig.kdf,
            ..Default::default()
        };

        if let Some(keys) = sig.prd_keys {
            desc.prd_keys = keys;
            desc.b_prd_present = 1;
        }
        if let Some(keys) = sig.dbg_keys {
            desc.dbg_keys = keys;
            desc.b_dbg_present = 1;
        }
        if let Some(version) = sig.version {
            desc.bsupports_versioning = 1;
            desc.version = version;
        }

        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> LsSignature {
        let mut dep_map = DepMap::new();
        dep_map
            .push(DepMapEntry {
                falcon_id: FalconId::Pmu,
                hash: [1, 2, 3, 4],
            })
            .unwrap();
        LsSignature {
            falcon_id: FalconId::Fecs.into(),
            prd_keys: Some([[0x11; 16], [0x22; 16]]),
            dbg_keys: None,
            version: None,
            dep_map,
            kdf: [0x33; 16],
        }
    }

    #[test]
    fn test_build_copies_signature() {
        let sig = signature();
        let desc = UcodeDescBuilder::new(FalconId::Fecs, &sig).build().unwrap();
        assert_eq!(desc.falcon_id, 2);
        assert_eq!(desc.b_prd_present, 1);
        assert_eq!(desc.prd_keys, [[0x11; 16], [0x22; 16]]);
        assert_eq!(desc.b_dbg_present, 0);
        assert_eq!(desc.dbg_keys, [[0; 16]; 2]);
        assert_eq!(desc.kdf, [0x33; 16]);
    }

    #[test]
    fn test_version_only_when_supported() {
        let mut sig = signature();
        let desc = UcodeDescBuilder::new(FalconId::Fecs, &sig).build().unwrap();
        assert_eq!(desc.bsupports_versioning, 0);
        assert_eq!(desc.version, 0);

        sig.version = Some(0x1234);
        let desc = UcodeDescBuilder::new(FalconId::Fecs, &sig).build().unwrap();
        assert_eq!(desc.bsupports_versioning, 1);
        assert_eq!(desc.version, 0x1234);
    }

    #[test]
    fn test_dependencies_keep_declared_order() {
        let sig = signature();
        let extra = [
            DepMapEntry {
                falcon_id: FalconId::Gpccs,
                hash: [9; 4],
            },
            DepMapEntry {
                falcon_id: FalconId::Sec2,
                hash: [8; 4],
            },
        ];
        let desc = UcodeDescBuilder::new(FalconId::Fecs, &sig)
            .dependencies(&extra)
            .build()
            .unwrap();
        assert_eq!(desc.dep_map_count, 3);

        let decoded = DepMap::decode(&desc.dep_map, desc.dep_map_count).unwrap();
        let order: Vec<_> = decoded.iter().map(|e| e.falcon_id).collect();
        assert_eq!(order, [FalconId::Pmu, FalconId::Gpccs, FalconId::Sec2]);
    }

    #[test]
    fn test_dependency_overflow_fails_closed() {
        let sig = signature();
        let extra = [DepMapEntry {
            falcon_id: FalconId::Gpccs,
            hash: [0; 4],
        }; LSF_DEP_MAP_MAX_ENTRIES];
        assert_eq!(
            UcodeDescBuilder::new(FalconId::Fecs, &sig)
                .dependencies(&extra)
                .build(),
            Err(AcrError::UCODE_DESC_DEP_MAP_OVERFLOW)
        );
    }

    #[test]
    fn test_falcon_mismatch() {
        let sig = signature();
        assert_eq!(
            UcodeDescBuilder::new(FalconId::Gpccs, &sig).build(),
            Err(AcrError::UCODE_DESC_FALCON_ID_MISMATCH)
        );
    }
}
