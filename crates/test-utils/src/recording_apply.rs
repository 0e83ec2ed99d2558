/*
 * Copyright 2024 Fluence Labs Limited
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rdt_hw::HwError;
use rdt_hw::HwResult;
use rdt_hw::ModeApply;
use rdt_shared::types::CpuInfo;
use rdt_shared::types::ModeSet;

use crate::FakeKernel;

/// Records every programmed mode set. Clones share the same records, so a test can
/// keep one and hand another to the manager.
#[derive(Clone, Debug, Default)]
pub struct RecordingApply {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    applied: Mutex<Vec<ModeSet>>,
    delay: Option<Duration>,
    kernel: Option<FakeKernel>,
    fail: Mutex<bool>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingApply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applied modes are also remounted on the fake kernel.
    pub fn with_kernel(kernel: FakeKernel) -> Self {
        Self::build(None, Some(kernel))
    }

    /// Every apply holds for the given time, makes overlapping calls observable.
    pub fn with_kernel_and_delay(kernel: FakeKernel, delay: Duration) -> Self {
        Self::build(Some(delay), Some(kernel))
    }

    fn build(delay: Option<Duration>, kernel: Option<FakeKernel>) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                kernel,
                ..Inner::default()
            }),
        }
    }

    /// Makes subsequent applies fail as a failed mount would.
    pub fn fail_next(&self, fail: bool) {
        *self.inner.fail.lock() = fail;
    }

    pub fn applied(&self) -> Vec<ModeSet> {
        self.inner.applied.lock().clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.inner.max_active.load(Ordering::SeqCst)
    }
}

impl ModeApply for RecordingApply {
    fn apply(&self, modes: &ModeSet, _cpu_info: &CpuInfo) -> HwResult<()> {
        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_active.fetch_max(active, Ordering::SeqCst);

        let result = self.apply_inner(modes);

        self.inner.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl RecordingApply {
    fn apply_inner(&self, modes: &ModeSet) -> HwResult<()> {
        if let Some(delay) = self.inner.delay {
            std::thread::sleep(delay);
        }

        let options = rdt_hw::resctrl_mount_options(modes);
        if *self.inner.fail.lock() {
            let io_error = std::io::Error::new(std::io::ErrorKind::Other, "injected failure");
            return Err(HwError::mount("fake", options, io_error));
        }

        if let Some(kernel) = &self.inner.kernel {
            kernel
                .remount(modes)
                .map_err(|io_error| HwError::mount(&kernel.paths().resctrl, options, io_error))?;
        }

        self.inner.applied.lock().push(*modes);
        Ok(())
    }
}
