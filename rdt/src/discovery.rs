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

use std::path::Path;
use std::path::PathBuf;

use cpu_utils::CpuTopology;
use rdt_config::SystemPaths;
use rdt_probe::OsProbe;
use rdt_probe::ProbeResult;

use crate::errors::DiscoveryError;
use crate::CacheAllocation;
use crate::CacheLevel;
use crate::Capabilities;
use crate::CdpState;
use crate::CpuInfo;
use crate::MbaMode;
use crate::MemBwAllocation;
use crate::Technology;


const MBA_CTRL_MOUNT_OPTION: &str = "mba_MBps";
const MBM_LOCAL_FEATURE: &str = "mbm_local_bytes";
const MAX_BANDWIDTH_PERCENT: u64 = 100;

/// Builds the capability record from what procfs, sysfs and resctrl expose.
///
/// A technology counts as present only if the CPU advertises it and resctrl has an info
/// directory for it. Every probe goes through [OsProbe], nothing is cached between calls.
pub(crate) struct Discovery<'probe> {
    probe: &'probe dyn OsProbe,
    paths: &'probe SystemPaths,
}

impl<'probe> Discovery<'probe> {
    pub(crate) fn new(probe: &'probe dyn OsProbe, paths: &'probe SystemPaths) -> Self {
        Self { probe, paths }
    }

    pub(crate) fn discover(&self) -> Result<(Capabilities, CpuInfo), DiscoveryError> {
        let cpu_info = CpuTopology::new(self.probe, &self.paths.sysfs).discover()?;

        let l3ca = tolerate(
            Technology::L3Cat,
            self.cache_allocation(CacheLevel::L3, &cpu_info),
        );
        let l2ca = tolerate(
            Technology::L2Cat,
            self.cache_allocation(CacheLevel::L2, &cpu_info),
        );
        let mba = tolerate(Technology::Mba, self.mem_bw_allocation());

        let capabilities = Capabilities::new(l3ca, l2ca, mba);
        if capabilities.is_empty() {
            return Err(DiscoveryError::nothing_discovered(&self.paths.resctrl));
        }

        tracing::info!(
            "Discovered L3 CAT: {:?}, L2 CAT: {:?}, MBA: {:?}",
            capabilities.l3ca(),
            capabilities.l2ca(),
            capabilities.mba()
        );

        Ok((capabilities, cpu_info))
    }

    /// None if the level has no CAT, errors only if some probe of a present CAT fails.
    pub(crate) fn cache_allocation(
        &self,
        level: CacheLevel,
        cpu_info: &CpuInfo,
    ) -> ProbeResult<Option<CacheAllocation>> {
        let (cat_flag, cdp_flag) = match level {
            CacheLevel::L2 => ("cat_l2", "cdp_l2"),
            CacheLevel::L3 => ("cat_l3", "cdp_l3"),
        };

        if !self.cpu_flag(cat_flag)? {
            tracing::debug!("CPU doesn't advertise {level} CAT");
            return Ok(None);
        }

        let Some((info_dir, cdp_on)) = self.cat_info_dir(level) else {
            tracing::debug!("resctrl has no info directory for {level} CAT");
            return Ok(None);
        };

        let cdp = if cdp_on {
            CdpState::On
        } else if self.cpu_flag(cdp_flag)? {
            CdpState::Off
        } else {
            CdpState::Unsupported
        };

        let num_classes = self.read_u32(&info_dir.join("num_closids"), 10)?;
        let cbm_mask = self.probe.read_u64(&info_dir.join("cbm_mask"), 16)?;
        let way_contention = self
            .read_optional(&info_dir.join("shareable_bits"), 16)?
            .unwrap_or(0);
        let non_contiguous_cbm = self
            .read_optional(&info_dir.join("sparse_masks"), 10)?
            .map_or(false, |value| value != 0);

        let cache = match level {
            CacheLevel::L2 => cpu_info.l2(),
            CacheLevel::L3 => cpu_info.l3(),
        };
        let way_size = cache.map_or(0, |cache| cache.way_size);

        Ok(Some(CacheAllocation {
            num_classes,
            num_ways: cbm_mask.count_ones(),
            way_size,
            way_contention,
            non_contiguous_cbm,
            cdp,
        }))
    }

    /// None if there is no MBA, errors only if some probe of a present MBA fails.
    pub(crate) fn mem_bw_allocation(&self) -> ProbeResult<Option<MemBwAllocation>> {
        if !self.cpu_flag("mba")? {
            tracing::debug!("CPU doesn't advertise MBA");
            return Ok(None);
        }

        let info_dir = self.info_dir().join("MB");
        if !self.probe.dir_exists(&info_dir) {
            tracing::debug!("resctrl has no info directory for MBA");
            return Ok(None);
        }

        let num_classes = self.read_u32(&info_dir.join("num_closids"), 10)?;
        let min_bandwidth = self.probe.read_u64(&info_dir.join("min_bandwidth"), 10)?;
        let throttle_step = self.read_u32(&info_dir.join("bandwidth_gran"), 10)?;
        // kernels without the file support only linear throttling
        let is_linear = self
            .read_optional(&info_dir.join("delay_linear"), 10)?
            .map_or(true, |value| value != 0);

        let ctrl_enabled = self
            .probe
            .file_contains(&self.paths.procfs.join("mounts"), MBA_CTRL_MOUNT_OPTION)?;
        let ctrl_supported = ctrl_enabled || self.mbm_local_supported()?;

        let mode = if ctrl_enabled {
            MbaMode::Ctrl
        } else {
            MbaMode::Default
        };

        Ok(Some(MemBwAllocation {
            num_classes,
            throttle_max: MAX_BANDWIDTH_PERCENT.saturating_sub(min_bandwidth) as u32,
            throttle_step,
            is_linear,
            ctrl_supported,
            mode,
        }))
    }

    /// The kernel software controller needs local memory bandwidth monitoring.
    fn mbm_local_supported(&self) -> ProbeResult<bool> {
        let mon_features = self.info_dir().join("L3_MON/mon_features");
        match self.probe.file_contains(&mon_features, MBM_LOCAL_FEATURE) {
            Ok(supported) => Ok(supported),
            Err(error) if error.is_not_found() => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// With CDP on the kernel replaces e.g. info/L3 by info/L3CODE and info/L3DATA.
    fn cat_info_dir(&self, level: CacheLevel) -> Option<(PathBuf, bool)> {
        let info_dir = self.info_dir();

        let plain = info_dir.join(level.to_string());
        if self.probe.dir_exists(&plain) {
            return Some((plain, false));
        }

        let code = info_dir.join(format!("{level}CODE"));
        if self.probe.dir_exists(&code) {
            return Some((code, true));
        }

        None
    }

    fn info_dir(&self) -> PathBuf {
        self.paths.resctrl.join("info")
    }

    fn cpu_flag(&self, flag: &str) -> ProbeResult<bool> {
        let cpuinfo = self.probe.read_string(&self.paths.procfs.join("cpuinfo"))?;
        Ok(has_cpu_flag(&cpuinfo, flag))
    }

    fn read_u32(&self, path: &Path, radix: u32) -> ProbeResult<u32> {
        let value = self.probe.read_u64(path, radix)?;
        Ok(u32::try_from(value).unwrap_or(u32::MAX))
    }

    fn read_optional(&self, path: &Path, radix: u32) -> ProbeResult<Option<u64>> {
        match self.probe.read_u64(path, radix) {
            Ok(value) => Ok(Some(value)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Matches whole words of the `flags` lines, `mba` mustn't match e.g. `mba_ext`.
pub(crate) fn has_cpu_flag(cpuinfo: &str, flag: &str) -> bool {
    cpuinfo
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(key, _)| key.trim() == "flags")
        .any(|(_, flags)| flags.split_whitespace().any(|word| word == flag))
}

fn tolerate<T>(technology: Technology, result: ProbeResult<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!("Probing {technology} failed, treating it as unsupported: {error}");
            None
        }
    }
}
