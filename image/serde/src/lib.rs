/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    ACR non-WPR blob serialization & deserialization routines.

--*/
use acr_image_gen::AcrBlob;
use acr_image_types::layout::LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX;
use acr_image_types::*;
use std::io::Write;
use zerocopy::{FromBytes, IntoBytes};

/// ACR Blob Writer
pub struct AcrBlobWriter<W: Write> {
    writer: W,
}

impl<W: Write> AcrBlobWriter<W> {
    /// Create an instance of `AcrBlobWriter`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write the non-WPR blob
    pub fn write(&mut self, blob: &AcrBlob) -> anyhow::Result<()> {
        self.writer.write_all(blob.as_bytes())?;
        Ok(())
    }

    /// Write the ACR descriptor
    pub fn write_desc(&mut self, desc: &FlcnAcrDesc) -> anyhow::Result<()> {
        self.writer.write_all(desc.as_bytes())?;
        Ok(())
    }
}

/// Decode an ACR descriptor
pub fn read_acr_desc(bytes: &[u8]) -> AcrResult<FlcnAcrDesc> {
    FlcnAcrDesc::read_from_bytes(bytes).map_err(|_| AcrError::LAYOUT_BLOB_TRUNCATED)
}

/// Typed view over a staged non-WPR blob
pub struct AcrBlobReader<'a> {
    blob: &'a [u8],
    wpr_offset: u32,
}

impl<'a> AcrBlobReader<'a> {
    /// Create an instance of `AcrBlobReader` for a blob whose WPR header
    /// table sits at offset zero
    pub fn new(blob: &'a [u8]) -> Self {
        Self {
            blob,
            wpr_offset: AcrBlob::WPR_TABLE_OFFSET,
        }
    }

    /// Locate the WPR header table through the ACR descriptor
    pub fn with_desc(blob: &'a [u8], desc: &FlcnAcrDesc) -> AcrResult<Self> {
        if desc.nonwpr_ucode_blob_size as usize > blob.len() {
            return Err(AcrError::LAYOUT_BLOB_TRUNCATED);
        }
        Ok(Self {
            blob: &blob[..desc.nonwpr_ucode_blob_size as usize],
            wpr_offset: desc.wpr_offset,
        })
    }

    fn slice(&self, offset: u32) -> AcrResult<&'a [u8]> {
        self.blob
            .get(offset as usize..)
            .ok_or(AcrError::LAYOUT_BLOB_TRUNCATED)
    }

    fn record<T: FromBytes>(&self, offset: u32) -> AcrResult<T> {
        T::read_from_prefix(self.slice(offset)?)
            .map(|(record, _)| record)
            .map_err(|_| AcrError::LAYOUT_BLOB_TRUNCATED)
    }

    pub fn wpr_header_table(&self) -> AcrResult<WprHeaderTable> {
        WprHeaderTable::decode(self.slice(self.wpr_offset)?)
    }

    /// Decode the shared sub-WPR table.
    ///
    /// The table is only present when the first LSB header was pushed past
    /// the room reserved for it.
    pub fn sub_wpr_table(&self, wpr_table: &WprHeaderTable) -> AcrResult<Option<SubWprTable>> {
        let table_offset = self.wpr_offset + AcrBlob::SUB_WPR_TABLE_OFFSET;
        let Some(first) = wpr_table.entries().first() else {
            return Ok(None);
        };
        if first.lsb_offset < table_offset + LSF_SUB_WPR_HEADERS_TOTAL_SIZE_MAX {
            return Ok(None);
        }
        SubWprTable::decode(self.slice(table_offset)?).map(Some)
    }

    pub fn lsb_header(&self, wpr_header: &LsfWprHeader) -> AcrResult<LsfLsbHeader> {
        self.record(wpr_header.lsb_offset)
    }

    pub fn bl_desc(&self, lsb_header: &LsfLsbHeader) -> AcrResult<FlcnBlDmemDesc> {
        self.record(lsb_header.bl_data_off)
    }

    /// Ucode payload, including the padding up to the bootloader data
    pub fn ucode(&self, lsb_header: &LsfLsbHeader) -> AcrResult<&'a [u8]> {
        self.blob
            .get(lsb_header.ucode_off as usize..lsb_header.bl_data_off as usize)
            .ok_or(AcrError::LAYOUT_BLOB_TRUNCATED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acr_image_gen::{BlobGenerator, BlobGeneratorConfig, LsFalconConfig, LsFirmware};

    #[derive(Debug, Clone)]
    struct Fw {
        falcon_id: FalconId,
        desc: LsFalconUcodeDesc,
        signature: LsSignature,
        image: Vec<u8>,
    }

    impl Fw {
        fn new(falcon_id: FalconId) -> Self {
            Self {
                falcon_id,
                desc: LsFalconUcodeDesc {
                    image_size: 0x400,
                    bootloader_size: 0x100,
                    app_start_offset: 0x100,
                    app_size: 0x300,
                    app_resident_code_size: 0x200,
                    app_resident_data_offset: 0x200,
                    app_resident_data_size: 0x100,
                    ..Default::default()
                },
                signature: LsSignature::unsigned(falcon_id),
                image: vec![0x5a; 0x400],
            }
        }
    }

    impl LsFirmware for Fw {
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

    fn generate(sub_wprs: Vec<SubWprUseCase>) -> AcrBlob {
        let config = BlobGeneratorConfig {
            falcons: vec![
                LsFalconConfig::new(Fw::new(FalconId::Pmu)),
                LsFalconConfig::new(Fw::new(FalconId::Fecs)),
            ],
            sub_wprs,
            nonwpr_base: 0x10_0000,
            wpr_base: 0x20_0000,
            ..Default::default()
        };
        BlobGenerator::new().generate(&config).unwrap()
    }

    #[test]
    fn test_writer_round_trip() {
        let blob = generate(vec![]);
        let mut buf = Vec::new();
        let mut writer = AcrBlobWriter::new(&mut buf);
        writer.write(&blob).unwrap();
        assert_eq!(buf, blob.data);

        let mut desc_buf = Vec::new();
        AcrBlobWriter::new(&mut desc_buf)
            .write_desc(&blob.acr_desc)
            .unwrap();
        assert_eq!(desc_buf.len(), FLCN_ACR_DESC_SIZE);
        assert_eq!(read_acr_desc(&desc_buf).unwrap(), blob.acr_desc);
    }

    #[test]
    fn test_reader_decodes_records() {
        let blob = generate(vec![]);
        let reader = AcrBlobReader::with_desc(blob.as_bytes(), &blob.acr_desc).unwrap();

        let table = reader.wpr_header_table().unwrap();
        assert_eq!(table, blob.wpr_table);
        assert_eq!(reader.sub_wpr_table(&table).unwrap(), None);

        for (hdr, staged) in table.entries().iter().zip(&blob.falcons) {
            let lsb = reader.lsb_header(hdr).unwrap();
            assert_eq!(lsb, staged.lsb_header);
            assert_eq!(reader.bl_desc(&lsb).unwrap(), staged.bl_desc);
            let ucode = reader.ucode(&lsb).unwrap();
            assert_eq!(&ucode[..0x400], &[0x5a; 0x400]);
        }
    }

    #[test]
    fn test_reader_decodes_sub_wprs() {
        let blob = generate(vec![SubWprUseCase::PlayreadySharedData]);
        let reader = AcrBlobReader::new(blob.as_bytes());
        let table = reader.wpr_header_table().unwrap();
        assert_eq!(
            reader.sub_wpr_table(&table).unwrap(),
            Some(blob.sub_wpr_table)
        );
    }

    #[test]
    fn test_reader_truncated() {
        let blob = generate(vec![]);
        let reader = AcrBlobReader::new(&blob.as_bytes()[..0x300]);
        let table = reader.wpr_header_table().unwrap();
        assert_eq!(
            reader.lsb_header(&table.entries()[1]),
            Err(AcrError::LAYOUT_BLOB_TRUNCATED)
        );

        let mut desc = blob.acr_desc;
        desc.nonwpr_ucode_blob_size += 0x100;
        assert!(AcrBlobReader::with_desc(blob.as_bytes(), &desc).is_err());
        assert_eq!(
            read_acr_desc(&[0u8; 16]),
            Err(AcrError::LAYOUT_BLOB_TRUNCATED)
        );
    }
}
