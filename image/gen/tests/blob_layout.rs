// Licensed under the Apache-2.0 license

use acr_image_gen::*;
use acr_image_types::layout::*;
use acr_image_types::*;
use zerocopy::FromBytes;

const BL_SIZE: u32 = 0x100;

#[derive(Debug, Clone)]
struct TestFirmware {
    falcon_id: FalconId,
    desc: LsFalconUcodeDesc,
    signature: LsSignature,
    image: Vec<u8>,
}

impl TestFirmware {
    /// Bootloader followed by resident code then resident data
    fn new(falcon_id: FalconId, code_size: u32, data_size: u32) -> Self {
        let data_off = align_up(code_size, 256).unwrap();
        let app_size = data_off + data_size;
        let image_size = BL_SIZE + app_size;
        let desc = LsFalconUcodeDesc {
            descriptor_size: LS_FALCON_UCODE_DESC_SIZE as u32,
            image_size,
            app_version: 0x10 + u32::from(falcon_id),
            bootloader_size: BL_SIZE,
            bootloader_imem_offset: 0xfd00,
            app_start_offset: BL_SIZE,
            app_size,
            app_imem_entry: 0x10,
            app_resident_code_offset: 0,
            app_resident_code_size: code_size,
            app_resident_data_offset: data_off,
            app_resident_data_size: data_size,
            ..Default::default()
        };
        Self {
            falcon_id,
            desc,
            signature: LsSignature::unsigned(falcon_id),
            image: vec![u32::from(falcon_id) as u8 + 1; image_size as usize],
        }
    }
}

impl LsFirmware for TestFirmware {
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

fn config(falcons: &[(FalconId, u32, u32)]) -> BlobGeneratorConfig<TestFirmware> {
    BlobGeneratorConfig {
        falcons: falcons
            .iter()
            .map(|(id, code, data)| LsFalconConfig::new(TestFirmware::new(*id, *code, *data)))
            .collect(),
        nonwpr_base: 0x8_0000_0000,
        wpr_base: 0x9_0000_0000,
        ..Default::default()
    }
}

#[test]
fn test_two_falcon_layout() {
    let config = config(&[(FalconId::Pmu, 1000, 500), (FalconId::Fecs, 4096, 4096)]);
    let blob = BlobGenerator::new().generate(&config).unwrap();

    let pmu = &blob.falcons[0];
    assert_eq!(pmu.lsb_offset, 0x200);
    assert_eq!(pmu.lsb_header.ucode_off, 0x1000);
    assert_eq!(pmu.lsb_header.bl_data_off, 0x1700);
    assert_eq!(pmu.lsb_header.flags, LsbFlags::DMACTL_REQ_CTX.bits());

    let fecs = &blob.falcons[1];
    assert!(fecs.lsb_offset >= pmu.lsb_header.bl_data_off + pmu.lsb_header.bl_data_size);
    assert_eq!(fecs.lsb_offset, 0x1800);
    assert_eq!(fecs.lsb_header.ucode_off, 0x2000);
    assert_eq!(fecs.lsb_header.bl_data_off, 0x4100);
    assert_eq!(fecs.lsb_header.flags, 0);

    assert_eq!(blob.size(), 0x4200);
    assert_eq!(blob.acr_desc.nonwpr_ucode_blob_size, 0x4200);
    assert_eq!(blob.acr_desc.nonwpr_ucode_blob_start, 0x8_0000_0000);
    assert_eq!(blob.acr_desc.wpr_offset, 0);
    assert_eq!(blob.acr_desc.regions.no_regions, 1);
}

#[test]
fn test_lsb_headers_are_aligned() {
    let config = config(&[
        (FalconId::Sec2, 0x123, 0x45),
        (FalconId::Fecs, 3000, 100),
        (FalconId::Gpccs, 1, 1),
        (FalconId::Nvdec, 0x2000, 0x1001),
    ]);
    let blob = BlobGenerator::new().generate(&config).unwrap();

    for falcon in &blob.falcons {
        let hdr = &falcon.lsb_header;
        assert_eq!(falcon.lsb_offset % 256, 0);
        assert_eq!(hdr.ucode_off % 4096, 0);
        for field in [
            hdr.ucode_size,
            hdr.data_size,
            hdr.bl_code_size,
            hdr.bl_imem_off,
            hdr.bl_data_off,
            hdr.bl_data_size,
            hdr.app_code_off,
            hdr.app_code_size,
            hdr.app_data_off,
            hdr.app_data_size,
        ] {
            assert_eq!(field % 256, 0, "{falcon:x?}");
        }
        assert!(hdr.ucode_size + hdr.data_size <= hdr.bl_data_off - hdr.ucode_off);
        assert_eq!(u64::from(falcon.bl_desc.code_dma_base) % 256, 0);
        assert_eq!(u64::from(falcon.bl_desc.data_dma_base) % 256, 0);
    }
}

#[test]
fn test_wpr_table_round_trip() {
    let config = config(&[
        (FalconId::Fecs, 100, 100),
        (FalconId::Pmu, 200, 200),
        (FalconId::Gpccs, 300, 300),
    ]);
    let blob = BlobGenerator::new().generate(&config).unwrap();

    let table = WprHeaderTable::decode(blob.as_bytes()).unwrap();
    assert_eq!(table, blob.wpr_table);

    let decoded: Vec<_> = table
        .entries()
        .iter()
        .map(|hdr| (hdr.falcon_id, hdr.lsb_offset))
        .collect();
    let staged: Vec<_> = blob
        .falcons
        .iter()
        .map(|f| (u32::from(f.falcon_id), f.lsb_offset))
        .collect();
    assert_eq!(decoded, staged);

    for hdr in table.entries() {
        assert_eq!(hdr.bootstrap_owner, u32::from(FalconId::Pmu));
        assert_eq!(hdr.status, u32::from(LsfImageStatus::Copy));
    }
    assert_eq!(table.entries()[0].bin_version, 0x12);

    let terminator = LsfWprHeader::read_from_bytes(&blob.as_bytes()[72..96]).unwrap();
    assert_eq!(terminator.falcon_id, FALCON_ID_INVALID);
}

#[test]
fn test_sections_are_written() {
    let config = config(&[(FalconId::Pmu, 1000, 500)]);
    let blob = BlobGenerator::new().generate(&config).unwrap();
    let data = blob.as_bytes();
    let staged = &blob.falcons[0];
    let hdr = &staged.lsb_header;

    let off = staged.lsb_offset as usize;
    let lsb = LsfLsbHeader::read_from_bytes(&data[off..off + LSF_LSB_HEADER_SIZE]).unwrap();
    assert_eq!(&lsb, hdr);

    let image = &config.falcons[0].firmware.image;
    let ucode = hdr.ucode_off as usize;
    assert_eq!(&data[ucode..ucode + image.len()], image.as_slice());
    // Payload padding up to the bootloader data is zero
    assert!(data[ucode + image.len()..hdr.bl_data_off as usize]
        .iter()
        .all(|b| *b == 0));

    let bl = hdr.bl_data_off as usize;
    let bl_desc = FlcnBlDmemDesc::read_from_bytes(&data[bl..bl + FLCN_BL_DMEM_DESC_SIZE]).unwrap();
    assert_eq!(bl_desc, staged.bl_desc);
    assert_eq!(u64::from(bl_desc.code_dma_base), 0x9_0000_1100);
    assert_eq!(u64::from(bl_desc.data_dma_base), 0x9_0000_1500);
    assert_eq!(bl_desc.non_sec_code_size, 1000);
    assert_eq!(bl_desc.data_size, 500);
}

#[test]
fn test_generation_is_deterministic() {
    let config = config(&[(FalconId::Sec2, 0x321, 0x77), (FalconId::Gpccs, 10, 10)]);
    let first = BlobGenerator::new().generate(&config).unwrap();
    let second = BlobGenerator::new().generate(&config).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(first, second);
}

#[test]
fn test_lazy_falcon_is_recorded() {
    let mut config = config(&[(FalconId::Pmu, 100, 100), (FalconId::Fecs, 100, 100)]);
    config.falcons[1].lazy_bootstrap = true;
    let blob = BlobGenerator::new().generate(&config).unwrap();
    assert!(!blob.wpr_table.entries()[0].is_lazy());
    assert!(blob.wpr_table.entries()[1].is_lazy());

    config.falcons[0].lazy_bootstrap = true;
    config.bootstrap_owner = Some(FalconId::Pmu);
    assert_eq!(
        BlobGenerator::new().generate(&config),
        Err(AcrError::WPR_TABLE_OWNER_LAZY)
    );
}

#[test]
fn test_duplicate_falcon() {
    let config = config(&[(FalconId::Pmu, 100, 100), (FalconId::Pmu, 100, 100)]);
    assert_eq!(
        BlobGenerator::new().generate(&config),
        Err(AcrError::WPR_TABLE_DUPLICATE_FALCON)
    );
}

#[test]
fn test_no_eligible_owner() {
    let config = config(&[(FalconId::Fecs, 100, 100), (FalconId::Gpccs, 100, 100)]);
    assert_eq!(
        BlobGenerator::new().generate(&config),
        Err(AcrError::WPR_TABLE_NO_BOOTSTRAP_OWNER)
    );
}

#[test]
fn test_unaligned_bases() {
    let mut config = config(&[(FalconId::Pmu, 100, 100)]);
    config.wpr_base += 0x10;
    assert_eq!(
        BlobGenerator::new().generate(&config),
        Err(AcrError::LAYOUT_UNALIGNED_BASE)
    );
}

#[test]
fn test_sub_wprs_precede_falcons() {
    let mut config = config(&[(FalconId::Pmu, 100, 100)]);
    config.sub_wprs = vec![
        SubWprUseCase::FrtsVbiosTables,
        SubWprUseCase::PlayreadySharedData,
    ];
    let blob = BlobGenerator::new().generate(&config).unwrap();

    let table = SubWprTable::decode(&blob.as_bytes()[AcrBlob::SUB_WPR_TABLE_OFFSET as usize..])
        .unwrap();
    assert_eq!(table, blob.sub_wpr_table);
    assert_eq!(table.len(), 2);

    let last = table.entries()[1];
    let sub_wpr_end = (last.start_addr + last.size_4k) << SHIFT_4KB;
    assert!(blob.falcons[0].lsb_offset >= sub_wpr_end);
    assert_eq!(blob.falcons[0].lsb_offset, 0x10_2000);
    assert_eq!(blob.falcons[0].lsb_header.ucode_off, 0x10_3000);
}

#[test]
fn test_driver_supplied_regions() {
    let mut config = config(&[(FalconId::Pmu, 100, 100)]);
    config.region = RegionGeometry::DriverSupplied(vec![WprRegion {
        region_id: 1,
        start: 0x9_0000_0000,
        end: 0x9_0020_0000,
        read_mask: 0xf,
        write_mask: 0xc,
        client_mask: 0x2,
    }]);
    config.mmu_mem_range = Some(0x3);
    let blob = BlobGenerator::new().generate(&config).unwrap();

    let desc = &blob.acr_desc;
    assert_eq!(desc.wpr_region_id, 1);
    assert_eq!(desc.mmu_mem_range, 0x3);
    assert_eq!(desc.regions.region_props[0].start_addr, 0x900_0000);
    assert_eq!(desc.regions.region_props[0].shadow_mem_start_addr, 0x800_0000);
}

#[test]
fn test_invalidate_scrubs_blob() {
    let config = config(&[(FalconId::Pmu, 100, 100)]);
    let mut blob = BlobGenerator::new().generate(&config).unwrap();
    blob.invalidate();
    assert_eq!(blob.size(), 0);
    assert!(blob.wpr_table.is_empty());
    assert!(blob.falcons.is_empty());
    assert_eq!(blob.acr_desc, FlcnAcrDesc::default());
}
