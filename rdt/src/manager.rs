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

use parking_lot::Mutex;
use parking_lot::MutexGuard;
use rdt_config::RdtConfig;
use rdt_config::SystemPaths;
use rdt_hw::ModeApply;
use rdt_hw::NoopApply;
use rdt_hw::ResctrlRemount;
use rdt_probe::OsProbe;
use rdt_probe::SysfsProbe;

use crate::discovery::Discovery;
use crate::errors::RdtError;
use crate::CacheLevel;
use crate::Capabilities;
use crate::CdpMode;
use crate::CdpState;
use crate::CpuInfo;
use crate::MbaMode;
use crate::ModeSet;
use crate::ResetRequest;
use crate::Technology;

#[cfg(test)]
mod tests;

pub type RdtResult<T> = Result<T, RdtError>;

/// Owns the capability and topology records of one initialization cycle.
///
/// Every operation touching them goes through a single mutex, [CapabilityManager::lock]
/// returns its guard and the records are reachable only through that guard.
#[derive(Debug)]
pub struct CapabilityManager {
    state: Mutex<Option<State>>,
    paths: SystemPaths,
    probe: Box<dyn OsProbe>,
    applier: Box<dyn ModeApply>,
}

#[derive(Debug)]
struct State {
    capabilities: Capabilities,
    cpu_info: CpuInfo,
}

/// Holds the API lock, released on drop.
#[derive(Debug)]
pub struct ApiGuard<'manager> {
    state: MutexGuard<'manager, Option<State>>,
    manager: &'manager CapabilityManager,
}

impl CapabilityManager {
    pub fn new(
        paths: SystemPaths,
        probe: Box<dyn OsProbe>,
        applier: Box<dyn ModeApply>,
    ) -> Self {
        Self {
            state: Mutex::new(None),
            paths,
            probe,
            applier,
        }
    }

    pub fn from_config(config: &RdtConfig) -> Self {
        let applier: Box<dyn ModeApply> = if config.hw.enforce {
            Box::new(ResctrlRemount::new(&config.paths.resctrl))
        } else {
            Box::new(NoopApply)
        };

        Self::new(config.paths.clone(), Box::new(SysfsProbe::new()), applier)
    }

    pub fn lock(&self) -> ApiGuard<'_> {
        ApiGuard {
            state: self.state.lock(),
            manager: self,
        }
    }

    pub fn check_init(&self, expect_initialized: bool) -> RdtResult<()> {
        self.lock().check_init(expect_initialized)
    }

    pub fn init(&self) -> RdtResult<()> {
        let mut guard = self.lock();
        guard.check_init(false)?;

        let discovery = Discovery::new(self.probe.as_ref(), &self.paths);
        let (capabilities, cpu_info) = discovery.discover()?;
        *guard.state = Some(State {
            capabilities,
            cpu_info,
        });

        tracing::info!("RDT capability manager initialized");
        Ok(())
    }

    pub fn fini(&self) -> RdtResult<()> {
        let mut guard = self.lock();
        guard.check_init(true)?;

        *guard.state = None;
        tracing::info!("RDT capability manager finalized");
        Ok(())
    }

    /// Owned copies of both records.
    pub fn snapshot(&self) -> RdtResult<(Capabilities, CpuInfo)> {
        let guard = self.lock();
        let (capabilities, cpu_info) = guard.get_capabilities()?;
        Ok((capabilities.clone(), cpu_info.clone()))
    }

    pub fn change_l3_cdp(&self, mode: CdpMode) -> RdtResult<()> {
        self.lock().change_l3_cdp(mode)
    }

    pub fn change_l2_cdp(&self, mode: CdpMode) -> RdtResult<()> {
        self.lock().change_l2_cdp(mode)
    }

    pub fn change_mba(&self, mode: MbaMode) -> RdtResult<()> {
        self.lock().change_mba(mode)
    }

    pub fn reset(&self, request: ResetRequest) -> RdtResult<()> {
        self.lock().reset(request)
    }
}

impl<'manager> ApiGuard<'manager> {
    pub fn check_init(&self, expect_initialized: bool) -> RdtResult<()> {
        match (self.state.is_some(), expect_initialized) {
            (false, true) => Err(RdtError::NotInitialized),
            (true, false) => Err(RdtError::AlreadyInitialized),
            _ => Ok(()),
        }
    }

    pub fn get_capabilities(&self) -> RdtResult<(&Capabilities, &CpuInfo)> {
        let state = self.state.as_ref().ok_or(RdtError::NotInitialized)?;
        Ok((&state.capabilities, &state.cpu_info))
    }

    pub fn change_l3_cdp(&mut self, mode: CdpMode) -> RdtResult<()> {
        self.change_cdp(CacheLevel::L3, mode)
    }

    pub fn change_l2_cdp(&mut self, mode: CdpMode) -> RdtResult<()> {
        self.change_cdp(CacheLevel::L2, mode)
    }

    pub fn change_mba(&mut self, mode: MbaMode) -> RdtResult<()> {
        let (capabilities, _) = self.get_capabilities()?;
        let current = capabilities
            .mba()
            .ok_or_else(|| RdtError::technology_unsupported(Technology::Mba))?;

        if mode == MbaMode::Ctrl && !current.ctrl_supported {
            return Err(RdtError::invalid_config(
                Technology::Mba,
                "the MBA controller isn't supported",
            ));
        }
        if current.mode == mode {
            tracing::debug!("MBA is already in {mode} mode");
            return Ok(());
        }

        let mut modes = capabilities.current_modes();
        modes.mba = mode;
        self.apply(modes)
    }

    /// Validates every requested mode before programming them all at once.
    pub fn reset(&mut self, request: ResetRequest) -> RdtResult<()> {
        let (capabilities, _) = self.get_capabilities()?;
        let mut modes = capabilities.current_modes();

        for (level, cdp_request, field) in [
            (CacheLevel::L3, request.l3_cdp, &mut modes.l3_cdp),
            (CacheLevel::L2, request.l2_cdp, &mut modes.l2_cdp),
        ] {
            match (cdp_request.mode(), capabilities.cdp_state(level)) {
                (None, _) => {}
                (Some(CdpMode::On), CdpState::Unsupported) => {
                    return Err(RdtError::technology_unsupported(Technology::cdp(level)))
                }
                (Some(mode), _) => *field = mode,
            }
        }

        match (request.mba.mode(), capabilities.mba()) {
            (None, _) => {}
            (Some(MbaMode::Ctrl), None) => {
                return Err(RdtError::technology_unsupported(Technology::Mba))
            }
            (Some(MbaMode::Ctrl), Some(mba)) if !mba.ctrl_supported => {
                return Err(RdtError::invalid_config(
                    Technology::Mba,
                    "the MBA controller isn't supported",
                ))
            }
            (Some(mode), _) => modes.mba = mode,
        }

        if modes == capabilities.current_modes() {
            tracing::debug!("Requested modes are already in effect: {modes}");
            return Ok(());
        }

        self.apply(modes)
    }

    fn change_cdp(&mut self, level: CacheLevel, mode: CdpMode) -> RdtResult<()> {
        let (capabilities, _) = self.get_capabilities()?;
        let technology = Technology::cdp(level);

        let current = capabilities
            .cdp_state(level)
            .mode()
            .ok_or_else(|| RdtError::technology_unsupported(technology))?;
        if current == mode {
            tracing::debug!("{technology} is already {mode}");
            return Ok(());
        }

        let mut modes = capabilities.current_modes();
        match level {
            CacheLevel::L2 => modes.l2_cdp = mode,
            CacheLevel::L3 => modes.l3_cdp = mode,
        }
        self.apply(modes)
    }

    /// Programs the modes, re-reads parameters of the changed technologies and only then
    /// commits. The record stays untouched if any step fails.
    fn apply(&mut self, modes: ModeSet) -> RdtResult<()> {
        let manager = self.manager;
        let state = self.state.as_mut().ok_or(RdtError::NotInitialized)?;
        let previous = state.capabilities.current_modes();

        manager.applier.apply(&modes, &state.cpu_info)?;

        let refreshed = manager
            .refresh(&state.capabilities, &state.cpu_info, previous, modes)
            .map_err(|error| {
                tracing::error!("Programmed {modes}, but refreshing the record failed: {error}");
                error
            })?;

        state.capabilities = refreshed;
        tracing::info!("Switched modes from {previous} to {modes}");
        Ok(())
    }
}

impl CapabilityManager {
    /// Re-reads the technologies whose mode differs between `from` and `to` and records
    /// the requested modes for them.
    fn refresh(
        &self,
        capabilities: &Capabilities,
        cpu_info: &CpuInfo,
        from: ModeSet,
        to: ModeSet,
    ) -> RdtResult<Capabilities> {
        let discovery = Discovery::new(self.probe.as_ref(), &self.paths);
        let mut refreshed = capabilities.clone();

        for (level, from, to) in [
            (CacheLevel::L3, from.l3_cdp, to.l3_cdp),
            (CacheLevel::L2, from.l2_cdp, to.l2_cdp),
        ] {
            if from == to {
                continue;
            }

            let mut cat = discovery
                .cache_allocation(level, cpu_info)?
                .ok_or_else(|| RdtError::technology_vanished(Technology::cat(level)))?;
            log_mismatch(Technology::cdp(level), cat.cdp.mode(), to);
            cat.cdp = CdpState::from(to);
            refreshed.set_cache_allocation(level, cat);
        }

        if from.mba != to.mba {
            let mut mba = discovery
                .mem_bw_allocation()?
                .ok_or_else(|| RdtError::technology_vanished(Technology::Mba))?;
            log_mismatch(Technology::Mba, Some(mba.mode), to.mba);
            mba.mode = to.mba;
            refreshed.set_mba(mba);
        }

        Ok(refreshed)
    }
}

/// The kernel state lags behind the request when enforcement is off.
fn log_mismatch<M: PartialEq + std::fmt::Display>(
    technology: Technology,
    observed: Option<M>,
    requested: M,
) {
    match observed {
        Some(observed) if observed != requested => tracing::debug!(
            "{technology} is {observed} according to the kernel, recording {requested}"
        ),
        _ => {}
    }
}
