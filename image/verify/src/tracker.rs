/*++

Licensed under the Apache-2.0 license.

File Name:

   tracker.rs

Abstract:

    Reads back the per falcon status words written by the HS ucode.

--*/

use crate::*;
use acr_image_types::layout::LSF_WPR_HEADERS_TOTAL_SIZE_MAX;

/// Bootstrap status tracker
pub struct BootstrapTracker<Env: BootstrapEnv> {
    env: Env,

    /// Offset of the WPR header table in the blob
    table_offset: u32,

    /// Table as staged by the driver
    expected: WprHeaderTable,

    /// Last known status word of each falcon; unknown codes are not recorded
    previous: [u32; MAX_FALCON_COUNT],
}

impl<Env: BootstrapEnv> BootstrapTracker<Env> {
    /// Create an instance of `BootstrapTracker`
    ///
    /// # Arguments
    ///
    /// * `env`          - Blob accessor and completion wait
    /// * `table_offset` - Offset of the WPR header table in the blob
    pub fn new(env: Env, table_offset: u32) -> Self {
        Self {
            env,
            table_offset,
            expected: WprHeaderTable::new(),
            previous: [0; MAX_FALCON_COUNT],
        }
    }

    /// Wait for the HS ucode and read every falcon's status
    ///
    /// # Arguments
    ///
    /// * `expected`   - Table the blob was staged with
    /// * `timeout_ms` - Bound on the completion wait
    ///
    /// # Returns
    ///
    /// * `BootstrapReport` - Per falcon status; a timeout yields no report
    pub fn run(
        &mut self,
        expected: &WprHeaderTable,
        timeout_ms: u32,
    ) -> AcrResult<BootstrapReport> {
        self.expected = *expected;
        self.previous = [0; MAX_FALCON_COUNT];
        for (prev, hdr) in self.previous.iter_mut().zip(expected.entries()) {
            *prev = hdr.status;
        }

        if !self.env.wait_for_completion(timeout_ms)? {
            log::warn!("HS ucode did not complete within {timeout_ms} ms");
            return Err(AcrError::STATUS_HS_TIMEOUT);
        }

        let report = self.poll()?;
        log::info!(
            "Bootstrap status of {} falcons read back, result {:?}",
            report.len(),
            report.check()
        );
        Ok(report)
    }

    /// Re-read the table and check it against the staged one
    pub fn poll(&mut self) -> AcrResult<BootstrapReport> {
        let mut bytes = [0u8; LSF_WPR_HEADERS_TOTAL_SIZE_MAX as usize];
        self.env.read_blob(self.table_offset, &mut bytes)?;
        let table = WprHeaderTable::decode(&bytes)?;

        if table.len() != self.expected.len() {
            return Err(AcrError::STATUS_TABLE_MISMATCH);
        }

        let mut report = BootstrapReport::default();
        let expected = self.expected;
        for (i, (hdr, staged)) in table
            .entries()
            .iter()
            .zip(expected.entries())
            .enumerate()
        {
            if hdr.falcon_id != staged.falcon_id
                || hdr.lsb_offset != staged.lsb_offset
                || hdr.lazy_bootstrap != staged.lazy_bootstrap
            {
                return Err(AcrError::STATUS_TABLE_MISMATCH);
            }
            let falcon_id =
                FalconId::try_from(hdr.falcon_id).map_err(|_| AcrError::STATUS_TABLE_MISMATCH)?;

            self.advance(i, hdr.status)?;

            let entry = BootstrapEntry {
                falcon_id,
                lazy: hdr.is_lazy(),
                status: hdr.status,
            };
            match entry.status() {
                Ok(status) if status.is_failure() => {
                    log::warn!("{falcon_id}: {status:?}")
                }
                Ok(status) => log::debug!("{falcon_id}: {status:?}"),
                Err(_) => log::warn!("{falcon_id}: unknown status {:#x}", hdr.status),
            }
            report.push(entry)?;
        }

        Ok(report)
    }

    /// Read the status word of a single falcon without re-reading the table
    pub fn status(&mut self, falcon_id: FalconId) -> AcrResult<LsfImageStatus> {
        let (index, _) = self
            .expected
            .find(falcon_id)
            .ok_or(AcrError::STATUS_TABLE_MISMATCH)?;

        let mut word = [0u8; 4];
        self.env.read_blob(
            WprHeaderTable::status_offset(self.table_offset, index),
            &mut word,
        )?;
        let raw = u32::from_ne_bytes(word);

        self.advance(index, raw)?;
        LsfImageStatus::try_from(raw)
    }

    /// Check `next` against the last known status of entry `index`.
    ///
    /// Unknown codes are reported, not rejected here, and leave the last
    /// known status in place for the next comparison.
    fn advance(&mut self, index: usize, next: u32) -> AcrResult<()> {
        let Ok(next_status) = LsfImageStatus::try_from(next) else {
            return Ok(());
        };
        if let Ok(prev) = LsfImageStatus::try_from(self.previous[index]) {
            if !prev.can_reach(next_status) {
                return Err(AcrError::STATUS_ILLEGAL_TRANSITION);
            }
        }
        self.previous[index] = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::IntoBytes;
    use LsfImageStatus::*;

    struct TestEnv {
        blob: Vec<u8>,
        complete: bool,
    }

    impl BootstrapEnv for TestEnv {
        fn wait_for_completion(&mut self, _timeout_ms: u32) -> AcrResult<bool> {
            Ok(self.complete)
        }

        fn read_blob(&mut self, offset: u32, buf: &mut [u8]) -> AcrResult<()> {
            let offset = offset as usize;
            let src = self
                .blob
                .get(offset..offset + buf.len())
                .ok_or(AcrError::STATUS_BLOB_READ_FAILURE)?;
            buf.copy_from_slice(src);
            Ok(())
        }
    }

    fn staged() -> WprHeaderTable {
        let mut table = WprHeaderTable::new();
        for (falcon_id, lsb_offset, lazy) in [
            (FalconId::Pmu, 0x200, false),
            (FalconId::Fecs, 0x3000, false),
            (FalconId::Gpccs, 0x6000, true),
        ] {
            table
                .push(LsfWprHeader {
                    falcon_id: falcon_id.into(),
                    lsb_offset,
                    bootstrap_owner: FalconId::Pmu.into(),
                    lazy_bootstrap: lazy.into(),
                    bin_version: 0,
                    status: Copy.into(),
                })
                .unwrap();
        }
        table
    }

    fn env_with(statuses: [LsfImageStatus; 3]) -> TestEnv {
        let mut table = staged();
        for (hdr, status) in table.entries_mut().iter_mut().zip(statuses) {
            hdr.status = status.into();
        }
        let mut blob = vec![0u8; 0x1000];
        table.encode(&mut blob).unwrap();
        TestEnv {
            blob,
            complete: true,
        }
    }

    fn set_status(env: &mut TestEnv, index: usize, status: u32) {
        let offset = WprHeaderTable::status_offset(0, index) as usize;
        env.blob[offset..offset + 4].copy_from_slice(status.as_bytes());
    }

    #[test]
    fn test_run_success() {
        let env = env_with([BootstrapReady, BootstrapReady, ValidationDone]);
        let mut tracker = BootstrapTracker::new(env, 0);
        let report = tracker.run(&staged(), 100).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report.check(), Ok(()));

        let gpccs = report.find(FalconId::Gpccs).unwrap();
        assert!(gpccs.lazy);
        assert_eq!(gpccs.status(), Ok(ValidationDone));
    }

    #[test]
    fn test_run_timeout() {
        let mut env = env_with([BootstrapReady; 3]);
        env.complete = false;
        let mut tracker = BootstrapTracker::new(env, 0);
        assert_eq!(
            tracker.run(&staged(), 100),
            Err(AcrError::STATUS_HS_TIMEOUT)
        );
    }

    #[test]
    fn test_failed_falcon() {
        let env = env_with([BootstrapReady, ValidationCodeFailed, ValidationDone]);
        let mut tracker = BootstrapTracker::new(env, 0);
        let report = tracker.run(&staged(), 100).unwrap();
        assert_eq!(
            report.check(),
            Err(AcrError::STATUS_VALIDATION_CODE_FAILED)
        );
    }

    #[test]
    fn test_poll_progress() {
        let env = env_with([Copy, Copy, Copy]);
        let mut tracker = BootstrapTracker::new(env, 0);
        let report = tracker.run(&staged(), 100).unwrap();
        assert_eq!(report.check(), Err(AcrError::STATUS_NOT_READY));

        set_status(&mut tracker.env, 0, ValidationSkipped.into());
        set_status(&mut tracker.env, 1, ValidationDone.into());
        assert_eq!(
            tracker.poll().unwrap().check(),
            Err(AcrError::STATUS_NOT_READY)
        );

        set_status(&mut tracker.env, 0, BootstrapReady.into());
        set_status(&mut tracker.env, 1, BootstrapReady.into());
        assert_eq!(tracker.poll().unwrap().check(), Ok(()));
    }

    #[test]
    fn test_illegal_transition() {
        let env = env_with([ValidationCodeFailed, Copy, Copy]);
        let mut tracker = BootstrapTracker::new(env, 0);
        tracker.run(&staged(), 100).unwrap();

        set_status(&mut tracker.env, 0, BootstrapReady.into());
        assert_eq!(
            tracker.poll(),
            Err(AcrError::STATUS_ILLEGAL_TRANSITION)
        );
    }

    #[test]
    fn test_unknown_code_keeps_last_known_status() {
        let env = env_with([Copy, Copy, Copy]);
        let mut tracker = BootstrapTracker::new(env, 0);
        tracker.run(&staged(), 100).unwrap();

        set_status(&mut tracker.env, 0, ValidationDone.into());
        tracker.poll().unwrap();

        set_status(&mut tracker.env, 0, 0x20);
        let report = tracker.poll().unwrap();
        assert_eq!(report.check(), Err(AcrError::STATUS_INVALID_CODE));

        set_status(&mut tracker.env, 0, Copy.into());
        assert_eq!(
            tracker.poll(),
            Err(AcrError::STATUS_ILLEGAL_TRANSITION)
        );

        set_status(&mut tracker.env, 0, BootstrapReady.into());
        assert_eq!(tracker.status(FalconId::Pmu), Ok(BootstrapReady));
    }

    #[test]
    fn test_table_mismatch() {
        let mut env = env_with([BootstrapReady; 3]);
        let offset = LSF_WPR_HEADER_SIZE + core::mem::offset_of!(LsfWprHeader, lsb_offset);
        env.blob[offset..offset + 4].copy_from_slice(0x4000u32.as_bytes());
        let mut tracker = BootstrapTracker::new(env, 0);
        assert_eq!(
            tracker.run(&staged(), 100),
            Err(AcrError::STATUS_TABLE_MISMATCH)
        );

        let env = env_with([BootstrapReady; 3]);
        let mut tracker = BootstrapTracker::new(env, 0);
        let mut fewer = WprHeaderTable::new();
        fewer.push(staged().entries()[0]).unwrap();
        assert_eq!(
            tracker.run(&fewer, 100),
            Err(AcrError::STATUS_TABLE_MISMATCH)
        );
    }

    #[test]
    fn test_targeted_status_read() {
        let env = env_with([Copy, Copy, Copy]);
        let mut tracker = BootstrapTracker::new(env, 0);
        tracker.run(&staged(), 100).unwrap();

        set_status(&mut tracker.env, 2, ValidationDone.into());
        assert_eq!(tracker.status(FalconId::Gpccs), Ok(ValidationDone));
        assert_eq!(
            tracker.status(FalconId::Sec2),
            Err(AcrError::STATUS_TABLE_MISMATCH)
        );

        set_status(&mut tracker.env, 2, Copy.into());
        assert_eq!(
            tracker.status(FalconId::Gpccs),
            Err(AcrError::STATUS_ILLEGAL_TRANSITION)
        );
    }

    #[test]
    fn test_read_failure() {
        let mut env = env_with([BootstrapReady; 3]);
        env.blob.truncate(100);
        let mut tracker = BootstrapTracker::new(env, 0);
        assert_eq!(
            tracker.run(&staged(), 100),
            Err(AcrError::STATUS_BLOB_READ_FAILURE)
        );
    }
}
