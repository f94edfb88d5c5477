/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains LS falcon firmware loading and parsing related functionality.

--*/

use std::path::Path;

use acr_image_gen::{validate_ucode_desc, LsFirmware};
use acr_image_types::*;
use anyhow::Context;
use zerocopy::FromBytes;

/// LS falcon firmware: ucode descriptor, image and signature
#[derive(Debug, Clone)]
pub struct LsFirmwareImage {
    falcon_id: FalconId,
    desc: LsFalconUcodeDesc,
    signature: LsSignature,
    image: Vec<u8>,
}

impl LsFirmwareImage {
    /// Read the firmware triple from disk
    ///
    /// # Arguments
    ///
    /// * `falcon_id` - Falcon the firmware runs on
    /// * `desc_path` - Ucode descriptor
    /// * `image_path` - Ucode image
    /// * `sig_path`  - Signature, `None` for an unsigned debug image
    pub fn open(
        falcon_id: FalconId,
        desc_path: &Path,
        image_path: &Path,
        sig_path: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let desc = std::fs::read(desc_path)
            .with_context(|| format!("Failed to read descriptor {}", desc_path.display()))?;
        let image = std::fs::read(image_path)
            .with_context(|| format!("Failed to read image {}", image_path.display()))?;
        let sig = sig_path
            .map(|path| {
                std::fs::read(path)
                    .with_context(|| format!("Failed to read signature {}", path.display()))
            })
            .transpose()?;

        let fw = Self::from_parts(falcon_id, &desc, image, sig.as_deref())
            .with_context(|| format!("Invalid {falcon_id} firmware"))?;
        log::debug!(
            "Loaded {} firmware: {:#x} bytes, version {:#x}, {}",
            falcon_id,
            fw.image.len(),
            fw.desc.app_version,
            if fw.signature.is_signed() {
                "signed"
            } else {
                "unsigned"
            }
        );
        Ok(fw)
    }

    /// Create new instance of `LsFirmwareImage`.
    pub fn from_parts(
        falcon_id: FalconId,
        desc_bytes: &[u8],
        image: Vec<u8>,
        sig_bytes: Option<&[u8]>,
    ) -> AcrResult<Self> {
        let (desc, _) = LsFalconUcodeDesc::read_from_prefix(desc_bytes)
            .map_err(|_| AcrError::FW_DESC_MALFORMED)?;
        if (desc.descriptor_size as usize) < LS_FALCON_UCODE_DESC_SIZE {
            return Err(AcrError::FW_DESC_MALFORMED);
        }
        if desc.image_size as usize != image.len() {
            return Err(AcrError::FW_DESC_SIZE_MISMATCH);
        }
        validate_ucode_desc(&desc, image.len())?;

        let signature = match sig_bytes {
            Some(bytes) => {
                let (sig, _) = LsfUcodeDesc::read_from_prefix(bytes)
                    .map_err(|_| AcrError::UCODE_DESC_MALFORMED)?;
                LsSignature::try_from(&sig)?
            }
            None => LsSignature::unsigned(falcon_id),
        };

        Ok(Self {
            falcon_id,
            desc,
            signature,
            image,
        })
    }
}

impl LsFirmware for LsFirmwareImage {
    fn falcon_id(&self) -> FalconId {
        self.falcon_id
    }

    fn desc(&self) -> &LsFalconUcodeDesc {
        &self.desc
    }

    fn signature(&self) -> &LsSignature {
        &self.signature
    }

    fn image(&self) -> &[u8] {
        &self.image
    }
}
