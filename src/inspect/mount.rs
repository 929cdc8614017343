//! Mount and filesystem-kind discovery via `lsblk -J`.
//!
//! An LV is reachable under several device paths (`/dev/vg/lv`,
//! `/dev/mapper/vg-lv`, `/dev/dm-N`); the map built here records every alias
//! so later lookups succeed regardless of which form `lvs` reported.
//! Device-mapper escapes '-' inside a VG or LV name as '--', which the alias
//! expansion has to decode.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::run_capture;
use crate::errors::LvShiftError;

/// Per-device state as lsblk sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct DeviceState {
    pub fstype: Option<String>,
    pub mountpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LsblkTree {
    #[serde(default)]
    blockdevices: Vec<LsblkNode>,
}

#[derive(Debug, Deserialize)]
struct LsblkNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    fstype: Option<String>,
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default)]
    children: Vec<LsblkNode>,
}

/// Split a device-mapper name ("vg--a-lv--b") into ("vg-a", "lv-b").
/// The separator is a single '-'; a doubled '-' is a literal dash.
fn split_mapper_name(base: &str) -> Option<(String, String)> {
    let bytes = base.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'-' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'-' {
                i += 2;
                continue;
            }
            let vg = base[..i].replace("--", "-");
            let lv = base[i + 1..].replace("--", "-");
            if vg.is_empty() || lv.is_empty() {
                return None;
            }
            return Some((vg, lv));
        }
        i += 1;
    }
    None
}

fn escape_mapper(part: &str) -> String {
    part.replace('-', "--")
}

/// All path spellings that may refer to the same LV.
pub(super) fn aliases_for(path: &str) -> Vec<String> {
    let mut out = vec![path.to_string()];
    if let Some(base) = path.strip_prefix("/dev/mapper/") {
        if let Some((vg, lv)) = split_mapper_name(base) {
            out.push(format!("/dev/{vg}/{lv}"));
        }
    } else if let Some(rest) = path.strip_prefix("/dev/") {
        let mut parts = rest.splitn(2, '/');
        if let (Some(vg), Some(lv)) = (parts.next(), parts.next()) {
            if !vg.is_empty() && !lv.is_empty() && !lv.contains('/') {
                out.push(format!(
                    "/dev/mapper/{}-{}",
                    escape_mapper(vg),
                    escape_mapper(lv)
                ));
            }
        }
    }
    out
}

fn walk(nodes: &[LsblkNode], map: &mut BTreeMap<String, DeviceState>) {
    for node in nodes {
        let path = node
            .path
            .clone()
            .or_else(|| node.name.as_ref().map(|n| format!("/dev/{n}")));
        if let Some(path) = path {
            let state = DeviceState {
                fstype: node
                    .fstype
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                mountpoint: node
                    .mountpoint
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            };
            for alias in aliases_for(&path) {
                map.insert(alias, state.clone());
            }
        }
        walk(&node.children, map);
    }
}

pub(super) fn parse_lsblk_json(raw: &str) -> Result<BTreeMap<String, DeviceState>, LvShiftError> {
    let tree: LsblkTree =
        serde_json::from_str(raw).map_err(|e| LvShiftError::InspectionFailed {
            subject: "lsblk".into(),
            property: "device tree JSON",
            detail: e.to_string(),
        })?;
    let mut map = BTreeMap::new();
    walk(&tree.blockdevices, &mut map);
    Ok(map)
}

/// Query lsblk for the full device tree.
pub(super) fn device_map() -> Result<BTreeMap<String, DeviceState>, LvShiftError> {
    let raw = run_capture("lsblk", &["-J", "-b", "-o", "NAME,PATH,FSTYPE,MOUNTPOINT"])?;
    parse_lsblk_json(&raw)
}

/// Look a device up under any of its aliases.
pub(super) fn lookup(map: &BTreeMap<String, DeviceState>, path: &str) -> Option<DeviceState> {
    aliases_for(path)
        .into_iter()
        .find_map(|alias| map.get(&alias).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSBLK_SAMPLE: &str = r#"{
      "blockdevices": [
        {
          "name": "sda", "path": "/dev/sda", "fstype": null, "mountpoint": null,
          "children": [
            {
              "name": "sda2", "path": "/dev/sda2", "fstype": "LVM2_member", "mountpoint": null,
              "children": [
                {"name": "vg0-root", "path": "/dev/mapper/vg0-root", "fstype": "ext4", "mountpoint": "/"},
                {"name": "vg0-scratch", "path": "/dev/mapper/vg0-scratch", "fstype": "ext4", "mountpoint": null}
              ]
            }
          ]
        }
      ]
    }"#;

    #[test]
    fn maps_nested_devices_with_aliases() {
        let map = parse_lsblk_json(LSBLK_SAMPLE).unwrap();
        let root = lookup(&map, "/dev/vg0/root").unwrap();
        assert_eq!(root.fstype.as_deref(), Some("ext4"));
        assert_eq!(root.mountpoint.as_deref(), Some("/"));

        let scratch = lookup(&map, "/dev/vg0/scratch").unwrap();
        assert_eq!(scratch.mountpoint, None);
    }

    #[test]
    fn mapper_dashes_are_unescaped() {
        assert_eq!(
            split_mapper_name("vg--data-lv--a"),
            Some(("vg-data".into(), "lv-a".into()))
        );
        assert_eq!(
            split_mapper_name("vg0-root"),
            Some(("vg0".into(), "root".into()))
        );
        assert_eq!(split_mapper_name("nodash"), None);
    }

    #[test]
    fn aliases_cover_both_spellings() {
        let a = aliases_for("/dev/vg-data/home");
        assert!(a.contains(&"/dev/mapper/vg--data-home".to_string()));
        let b = aliases_for("/dev/mapper/vg--data-home");
        assert!(b.contains(&"/dev/vg-data/home".to_string()));
    }

    #[test]
    fn empty_tree_is_fine() {
        let map = parse_lsblk_json(r#"{"blockdevices": []}"#).unwrap();
        assert!(map.is_empty());
    }
}
