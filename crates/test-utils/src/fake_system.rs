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

//! A directory tree that mimics /proc, /sys and a mounted resctrl filesystem.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rdt_config::SystemPaths;
use rdt_shared::types::CdpMode;
use rdt_shared::types::MbaMode;
use rdt_shared::types::ModeSet;
use tempfile::TempDir;

const L2_WAYS: u64 = 16;
const L2_SETS: u64 = 1024;
const L3_WAYS: u64 = 12;
const L3_SETS: u64 = 32768;
const LINE_SIZE: u64 = 64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FakeCdp {
    Unsupported,
    Off,
    On,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FakeCat {
    /// Classes of service with CDP off, the kernel halves it when CDP is on.
    pub num_closids: u64,
    pub cbm_mask: u64,
    pub shareable_bits: u64,
    pub sparse_masks: Option<bool>,
    pub cdp: FakeCdp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FakeMbaCtrl {
    Unsupported,
    Supported,
    Enabled,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FakeMba {
    pub num_closids: u64,
    pub min_bandwidth: u64,
    pub bandwidth_gran: u64,
    pub delay_linear: Option<bool>,
    pub ctrl: FakeMbaCtrl,
}

impl FakeCat {
    pub fn new(num_closids: u64, cbm_mask: u64) -> Self {
        Self {
            num_closids,
            cbm_mask,
            shareable_bits: 0,
            sparse_masks: None,
            cdp: FakeCdp::Unsupported,
        }
    }

    pub fn with_cdp(mut self, cdp: FakeCdp) -> Self {
        self.cdp = cdp;
        self
    }

    pub fn with_shareable_bits(mut self, shareable_bits: u64) -> Self {
        self.shareable_bits = shareable_bits;
        self
    }

    pub fn with_sparse_masks(mut self, sparse_masks: bool) -> Self {
        self.sparse_masks = Some(sparse_masks);
        self
    }
}

impl FakeMba {
    pub fn new(num_closids: u64) -> Self {
        Self {
            num_closids,
            min_bandwidth: 10,
            bandwidth_gran: 10,
            delay_linear: Some(true),
            ctrl: FakeMbaCtrl::Unsupported,
        }
    }

    pub fn with_ctrl(mut self, ctrl: FakeMbaCtrl) -> Self {
        self.ctrl = ctrl;
        self
    }

    pub fn with_throttling(mut self, min_bandwidth: u64, bandwidth_gran: u64) -> Self {
        self.min_bandwidth = min_bandwidth;
        self.bandwidth_gran = bandwidth_gran;
        self
    }
}

#[derive(Clone, Debug)]
struct Layout {
    sockets: u32,
    cores_per_socket: u32,
    l2: Option<FakeCat>,
    l3: Option<FakeCat>,
    mba: Option<FakeMba>,
    resctrl_mounted: bool,
}

#[derive(Debug)]
pub struct FakeSystemBuilder {
    layout: Layout,
}

/// Owns the temporary tree, it is removed on drop.
#[derive(Debug)]
pub struct FakeSystem {
    _root: TempDir,
    kernel: FakeKernel,
}

/// Simulates what the kernel does to the tree, e.g. on a resctrl remount.
#[derive(Clone, Debug)]
pub struct FakeKernel {
    layout: Arc<Mutex<Layout>>,
    paths: SystemPaths,
}

impl Default for FakeSystemBuilder {
    fn default() -> Self {
        Self {
            layout: Layout {
                sockets: 1,
                cores_per_socket: 2,
                l2: None,
                l3: None,
                mba: None,
                resctrl_mounted: true,
            },
        }
    }
}

impl FakeSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cores(mut self, sockets: u32, cores_per_socket: u32) -> Self {
        self.layout.sockets = sockets;
        self.layout.cores_per_socket = cores_per_socket;
        self
    }

    pub fn with_l3_cat(mut self, cat: FakeCat) -> Self {
        self.layout.l3 = Some(cat);
        self
    }

    pub fn with_l2_cat(mut self, cat: FakeCat) -> Self {
        self.layout.l2 = Some(cat);
        self
    }

    pub fn with_mba(mut self, mba: FakeMba) -> Self {
        self.layout.mba = Some(mba);
        self
    }

    /// CPU flags stay, but there is no resctrl info directory.
    pub fn without_resctrl(mut self) -> Self {
        self.layout.resctrl_mounted = false;
        self
    }

    pub fn build(self) -> FakeSystem {
        let root = tempfile::tempdir().expect("creating a temporary directory failed");
        let paths = SystemPaths::with_root(root.path());

        let kernel = FakeKernel {
            layout: Arc::new(Mutex::new(self.layout)),
            paths,
        };
        kernel.write_cpus();
        kernel.write_resctrl();

        FakeSystem {
            _root: root,
            kernel,
        }
    }
}

impl FakeSystem {
    pub fn builder() -> FakeSystemBuilder {
        FakeSystemBuilder::new()
    }

    pub fn paths(&self) -> &SystemPaths {
        &self.kernel.paths
    }

    pub fn kernel(&self) -> FakeKernel {
        self.kernel.clone()
    }

    /// Overwrites a file of the tree, e.g. to corrupt it.
    pub fn write(&self, path: impl AsRef<Path>, content: &str) {
        write(path.as_ref(), content);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if path.is_dir() {
            std::fs::remove_dir_all(path).expect("removing a fake directory failed");
        } else {
            std::fs::remove_file(path).expect("removing a fake file failed");
        }
    }
}

impl FakeKernel {
    /// Same as mounting resctrl with options selecting the modes; fails when the modes
    /// aren't supported, as the real mount does.
    pub fn remount(&self, modes: &ModeSet) -> std::io::Result<()> {
        {
            let mut layout = self.layout.lock();
            let l2 = switch_cdp(layout.l2.as_ref(), modes.l2_cdp)?;
            let l3 = switch_cdp(layout.l3.as_ref(), modes.l3_cdp)?;
            let mba = switch_mba_ctrl(layout.mba.as_ref(), modes.mba)?;

            layout.l2 = l2;
            layout.l3 = l3;
            layout.mba = mba;
            layout.resctrl_mounted = true;
        }

        self.write_resctrl();
        Ok(())
    }

    pub fn paths(&self) -> &SystemPaths {
        &self.paths
    }

    fn write_cpus(&self) {
        let layout = self.layout.lock();
        let cpu_dir = self.paths.sysfs.join("devices/system/cpu");

        for socket in 0..layout.sockets {
            for core in 0..layout.cores_per_socket {
                let index = socket * layout.cores_per_socket + core;
                let core_dir = cpu_dir.join(format!("cpu{index}"));

                write(
                    &core_dir.join("topology/physical_package_id"),
                    &format!("{socket}\n"),
                );
                write_cache(&core_dir.join("cache/index0"), 2, index, L2_WAYS, L2_SETS);
                write_cache(&core_dir.join("cache/index1"), 3, socket, L3_WAYS, L3_SETS);
            }
        }
    }

    fn write_resctrl(&self) {
        let layout = self.layout.lock();
        let resctrl = &self.paths.resctrl;

        if resctrl.exists() {
            std::fs::remove_dir_all(resctrl).expect("cleaning fake resctrl failed");
        }

        write(
            &self.paths.procfs.join("cpuinfo"),
            &cpuinfo(&layout),
        );
        write(&self.paths.procfs.join("mounts"), &mounts(&layout, resctrl));

        if !layout.resctrl_mounted {
            return;
        }

        let info = resctrl.join("info");
        std::fs::create_dir_all(&info).expect("creating fake resctrl failed");

        if let Some(l3) = &layout.l3 {
            write_cat(&info, "L3", l3);
        }
        if let Some(l2) = &layout.l2 {
            write_cat(&info, "L2", l2);
        }
        if let Some(mba) = &layout.mba {
            let dir = info.join("MB");
            write(&dir.join("num_closids"), &format!("{}\n", mba.num_closids));
            write(&dir.join("min_bandwidth"), &format!("{}\n", mba.min_bandwidth));
            write(&dir.join("bandwidth_gran"), &format!("{}\n", mba.bandwidth_gran));
            if let Some(linear) = mba.delay_linear {
                write(&dir.join("delay_linear"), if linear { "1\n" } else { "0\n" });
            }
            if mba.ctrl != FakeMbaCtrl::Unsupported {
                write(
                    &info.join("L3_MON/mon_features"),
                    "llc_occupancy\nmbm_total_bytes\nmbm_local_bytes\n",
                );
            }
        }
    }
}

fn switch_cdp(cat: Option<&FakeCat>, mode: CdpMode) -> std::io::Result<Option<FakeCat>> {
    use std::io::Error;
    use std::io::ErrorKind;

    let Some(cat) = cat else {
        return match mode {
            CdpMode::On => Err(Error::new(ErrorKind::Unsupported, "no CAT")),
            CdpMode::Off => Ok(None),
        };
    };

    let cdp = match (cat.cdp, mode) {
        (FakeCdp::Unsupported, CdpMode::On) => {
            return Err(Error::new(ErrorKind::Unsupported, "no CDP"))
        }
        (FakeCdp::Unsupported, CdpMode::Off) => FakeCdp::Unsupported,
        (_, CdpMode::On) => FakeCdp::On,
        (_, CdpMode::Off) => FakeCdp::Off,
    };

    Ok(Some(cat.with_cdp(cdp)))
}

fn switch_mba_ctrl(mba: Option<&FakeMba>, mode: MbaMode) -> std::io::Result<Option<FakeMba>> {
    use std::io::Error;
    use std::io::ErrorKind;

    let Some(mba) = mba else {
        return match mode {
            MbaMode::Ctrl => Err(Error::new(ErrorKind::Unsupported, "no MBA")),
            MbaMode::Default => Ok(None),
        };
    };

    let ctrl = match (mba.ctrl, mode) {
        (FakeMbaCtrl::Unsupported, MbaMode::Ctrl) => {
            return Err(Error::new(ErrorKind::Unsupported, "no MBA CTRL"))
        }
        (FakeMbaCtrl::Unsupported, MbaMode::Default) => FakeMbaCtrl::Unsupported,
        (_, MbaMode::Ctrl) => FakeMbaCtrl::Enabled,
        (_, MbaMode::Default) => FakeMbaCtrl::Supported,
    };

    Ok(Some(mba.with_ctrl(ctrl)))
}

fn cpuinfo(layout: &Layout) -> String {
    let mut flags = vec!["fpu", "vme", "de", "pse", "tsc", "msr"];
    if let Some(l3) = &layout.l3 {
        flags.push("cat_l3");
        if l3.cdp != FakeCdp::Unsupported {
            flags.push("cdp_l3");
        }
    }
    if let Some(l2) = &layout.l2 {
        flags.push("cat_l2");
        if l2.cdp != FakeCdp::Unsupported {
            flags.push("cdp_l2");
        }
    }
    if layout.mba.is_some() {
        flags.push("mba");
    }
    let flags = flags.join(" ");

    (0..layout.sockets * layout.cores_per_socket)
        .map(|index| format!("processor\t: {index}\nvendor_id\t: GenuineIntel\nflags\t\t: {flags}\n\n"))
        .collect()
}

fn mounts(layout: &Layout, resctrl: &Path) -> String {
    let mut lines = vec![
        "sysfs /sys sysfs rw,nosuid,nodev,noexec,relatime 0 0".to_string(),
        "proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0".to_string(),
    ];

    if layout.resctrl_mounted {
        let mut options = vec!["rw", "relatime"];
        if layout.l3.map_or(false, |cat| cat.cdp == FakeCdp::On) {
            options.push("cdp");
        }
        if layout.l2.map_or(false, |cat| cat.cdp == FakeCdp::On) {
            options.push("cdpl2");
        }
        if layout
            .mba
            .map_or(false, |mba| mba.ctrl == FakeMbaCtrl::Enabled)
        {
            options.push("mba_MBps");
        }
        lines.push(format!(
            "resctrl {} resctrl {} 0 0",
            resctrl.display(),
            options.join(",")
        ));
    }

    lines.join("\n") + "\n"
}

fn write_cat(info: &Path, name: &str, cat: &FakeCat) {
    let dirs = match cat.cdp {
        FakeCdp::On => vec![format!("{name}CODE"), format!("{name}DATA")],
        _ => vec![name.to_string()],
    };
    let num_closids = match cat.cdp {
        FakeCdp::On => cat.num_closids / 2,
        _ => cat.num_closids,
    };

    for dir in dirs {
        let dir = info.join(dir);
        write(&dir.join("num_closids"), &format!("{num_closids}\n"));
        write(&dir.join("cbm_mask"), &format!("{:x}\n", cat.cbm_mask));
        write(&dir.join("shareable_bits"), &format!("{:x}\n", cat.shareable_bits));
        if let Some(sparse) = cat.sparse_masks {
            write(&dir.join("sparse_masks"), if sparse { "1\n" } else { "0\n" });
        }
    }
}

fn write_cache(dir: &Path, level: u32, id: u32, ways: u64, sets: u64) {
    write(&dir.join("level"), &format!("{level}\n"));
    write(&dir.join("type"), "Unified\n");
    write(&dir.join("id"), &format!("{id}\n"));
    write(&dir.join("ways_of_associativity"), &format!("{ways}\n"));
    write(&dir.join("number_of_sets"), &format!("{sets}\n"));
    write(&dir.join("physical_line_partition"), "1\n");
    write(&dir.join("coherency_line_size"), &format!("{LINE_SIZE}\n"));
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("creating a fake directory failed");
    }
    std::fs::write(path, content).expect("writing a fake file failed");
}
