//! Capacity inspector: read-only view of pools, volumes and filesystems.
//!
//! Everything format-specific about the external tooling (LVM report JSON,
//! `lsblk` trees, `resize2fs`/`tune2fs` text) is parsed behind this module;
//! the rest of the crate only sees the records below. Nothing in here
//! mounts, unmounts or mutates anything.

mod ext4;
mod lvm;
mod mount;

pub use ext4::{FsckOutcome, min_safe_size};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::debug;

use crate::errors::LvShiftError;

/// An allocation domain (LVM volume group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolInfo {
    pub name: String,
    /// Allocation granularity in bytes; every volume size is a multiple.
    pub extent_size: u64,
    pub size: u64,
    pub free: u64,
}

/// What a volume is for, derived from the volume-type attribute. Only plain
/// volumes are eligible for capacity moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeRole {
    Plain,
    Snapshot,
    Thin,
    Virtual,
    MirroredOther,
}

impl VolumeRole {
    /// Map the first character of `lv_attr` to a role.
    pub fn from_attr(attr: &str) -> Self {
        match attr.chars().next() {
            Some('-') => VolumeRole::Plain,
            Some('s') | Some('S') => VolumeRole::Snapshot,
            Some('t') | Some('T') | Some('V') => VolumeRole::Thin,
            Some('v') => VolumeRole::Virtual,
            _ => VolumeRole::MirroredOther,
        }
    }

    pub fn is_eligible(self) -> bool {
        matches!(self, VolumeRole::Plain)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VolumeRole::Plain => "plain",
            VolumeRole::Snapshot => "snapshot",
            VolumeRole::Thin => "thin",
            VolumeRole::Virtual => "virtual",
            VolumeRole::MirroredOther => "mirrored/other",
        }
    }
}

/// Filesystem kind as reported by `lsblk`. Only ext4 is supported for
/// mutation; anything else is reported and rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FsKind {
    Ext4,
    Other(String),
    Unformatted,
}

impl FsKind {
    pub fn from_fstype(fstype: Option<&str>) -> Self {
        match fstype.map(str::trim) {
            None | Some("") => FsKind::Unformatted,
            Some("ext4") => FsKind::Ext4,
            Some(other) => FsKind::Other(other.to_string()),
        }
    }

    /// Offline shrink is only defined for the ext4 family here.
    pub fn supports_shrink(&self) -> bool {
        matches!(self, FsKind::Ext4)
    }

    /// Online growth while mounted.
    pub fn supports_online_grow(&self) -> bool {
        matches!(self, FsKind::Ext4)
    }

    pub fn describe(&self) -> String {
        match self {
            FsKind::Ext4 => "ext4".into(),
            FsKind::Other(name) => name.clone(),
            FsKind::Unformatted => "(none)".into(),
        }
    }
}

/// Everything the validator needs to know about one volume.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeReport {
    pub name: String,
    pub pool: String,
    pub path: PathBuf,
    /// Current size in bytes; a multiple of the pool extent size.
    pub size: u64,
    pub role: VolumeRole,
    pub fs: FsKind,
    pub mount: Option<PathBuf>,
    /// Smallest size the filesystem can shrink to without data loss, probed
    /// only for unmounted ext4 volumes.
    pub min_safe_size: Option<u64>,
}

impl VolumeReport {
    /// "vg/lv" form used in messages and selection.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.pool, self.name)
    }

    pub fn extent_count(&self, pool: &PoolInfo) -> u64 {
        if pool.extent_size == 0 {
            0
        } else {
            self.size / pool.extent_size
        }
    }
}

/// Snapshot of every pool and volume the volume manager reports.
#[derive(Debug, Clone)]
pub struct Inventory {
    pub pools: BTreeMap<String, PoolInfo>,
    pub volumes: Vec<VolumeReport>,
}

impl Inventory {
    pub fn pool(&self, name: &str) -> Option<&PoolInfo> {
        self.pools.get(name)
    }
}

/// Every device-path spelling that may refer to the volume at `path`.
pub fn device_aliases(path: &Path) -> Vec<String> {
    mount::aliases_for(&path.display().to_string())
}

/// External tools the inspector shells out to.
const INSPECT_TOOLS: &[&str] = &["lvs", "vgs", "lsblk"];
/// Additional tools a mutating run needs.
const MUTATE_TOOLS: &[&str] = &["lvreduce", "lvextend", "resize2fs", "e2fsck", "tune2fs"];

/// Verify the needed external binaries exist before doing any work.
pub fn require_tools(mutating: bool) -> Result<(), LvShiftError> {
    let mut needed: Vec<&str> = INSPECT_TOOLS.to_vec();
    if mutating {
        needed.extend_from_slice(MUTATE_TOOLS);
    }
    for tool in needed {
        if which::which(tool).is_err() {
            return Err(LvShiftError::InspectionFailed {
                subject: tool.to_string(),
                property: "executable",
                detail: "not found in PATH".into(),
            });
        }
    }
    Ok(())
}

/// Run a command and capture stdout, with a hardened locale so numbers and
/// headers are never localized. Non-zero exit is an inspection failure.
pub(crate) fn run_capture(program: &str, args: &[&str]) -> Result<String, LvShiftError> {
    debug!(program, ?args, "running inspection command");
    let output = Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .output()
        .map_err(|e| LvShiftError::InspectionFailed {
            subject: program.to_string(),
            property: "invocation",
            detail: e.to_string(),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(LvShiftError::InspectionFailed {
            subject: program.to_string(),
            property: "exit status",
            detail: format!("{}: {}", output.status, stderr.trim()),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Query the volume manager and mount table and join the results into one
/// consistent snapshot.
pub fn gather() -> Result<Inventory, LvShiftError> {
    let pools = lvm::list_pools()?;
    let records = lvm::list_volumes()?;
    let devices = mount::device_map()?;

    let mut volumes = Vec::with_capacity(records.len());
    for rec in records {
        let state = mount::lookup(&devices, &rec.path);
        volumes.push(VolumeReport {
            name: rec.name,
            pool: rec.pool,
            path: PathBuf::from(&rec.path),
            size: rec.size,
            role: rec.role,
            fs: FsKind::from_fstype(state.as_ref().and_then(|s| s.fstype.as_deref())),
            mount: state.and_then(|s| s.mountpoint.map(PathBuf::from)),
            min_safe_size: None,
        });
    }

    Ok(Inventory { pools, volumes })
}
