//! LVM report parsing.
//! `lvs`/`vgs` are invoked with `--reportformat json --units b --nosuffix`
//! so sizes arrive as exact byte counts and no human formatting has to be
//! reverse-engineered. The report shape is `{"report":[{"lv":[{...}]}]}`.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{PoolInfo, VolumeRole, run_capture};
use crate::errors::LvShiftError;
use crate::units::parse_reported_bytes;

#[derive(Debug, Deserialize)]
struct Report<T> {
    report: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct LvSection {
    #[serde(default)]
    lv: Vec<LvRow>,
}

#[derive(Debug, Deserialize)]
struct LvRow {
    #[serde(default)]
    lv_name: String,
    #[serde(default)]
    vg_name: String,
    #[serde(default)]
    lv_path: String,
    #[serde(default)]
    lv_size: String,
    #[serde(default)]
    lv_attr: String,
}

#[derive(Debug, Deserialize)]
struct VgSection {
    #[serde(default)]
    vg: Vec<VgRow>,
}

#[derive(Debug, Deserialize)]
struct VgRow {
    #[serde(default)]
    vg_name: String,
    #[serde(default)]
    vg_extent_size: String,
    #[serde(default)]
    vg_size: String,
    #[serde(default)]
    vg_free: String,
}

/// One logical volume as reported, before the mount/filesystem join.
#[derive(Debug, Clone)]
pub(super) struct LvRecord {
    pub name: String,
    pub pool: String,
    pub path: String,
    pub size: u64,
    pub role: VolumeRole,
}

fn inspection_failed(subject: &str, property: &'static str, detail: String) -> LvShiftError {
    LvShiftError::InspectionFailed {
        subject: subject.to_string(),
        property,
        detail,
    }
}

pub(super) fn parse_lvs_json(raw: &str) -> Result<Vec<LvRecord>, LvShiftError> {
    let report: Report<LvSection> = serde_json::from_str(raw)
        .map_err(|e| inspection_failed("lvs", "report JSON", e.to_string()))?;

    let mut out = Vec::new();
    for row in report.report.into_iter().flat_map(|s| s.lv) {
        let size = parse_reported_bytes(&row.lv_size).ok_or_else(|| {
            inspection_failed(
                &format!("{}/{}", row.vg_name, row.lv_name),
                "volume size",
                format!("unparseable lv_size '{}'", row.lv_size),
            )
        })?;
        if row.lv_path.is_empty() {
            return Err(inspection_failed(
                &format!("{}/{}", row.vg_name, row.lv_name),
                "device path",
                "lvs reported an empty lv_path".into(),
            ));
        }
        out.push(LvRecord {
            role: VolumeRole::from_attr(&row.lv_attr),
            name: row.lv_name,
            pool: row.vg_name,
            path: row.lv_path,
            size,
        });
    }
    Ok(out)
}

pub(super) fn parse_vgs_json(raw: &str) -> Result<BTreeMap<String, PoolInfo>, LvShiftError> {
    let report: Report<VgSection> = serde_json::from_str(raw)
        .map_err(|e| inspection_failed("vgs", "report JSON", e.to_string()))?;

    let mut pools = BTreeMap::new();
    for row in report.report.into_iter().flat_map(|s| s.vg) {
        let extent_size = parse_reported_bytes(&row.vg_extent_size).ok_or_else(|| {
            inspection_failed(
                &row.vg_name,
                "extent size",
                format!("unparseable vg_extent_size '{}'", row.vg_extent_size),
            )
        })?;
        if extent_size == 0 {
            return Err(inspection_failed(
                &row.vg_name,
                "extent size",
                "volume group reports a zero extent size".into(),
            ));
        }
        let size = parse_reported_bytes(&row.vg_size).ok_or_else(|| {
            inspection_failed(
                &row.vg_name,
                "pool size",
                format!("unparseable vg_size '{}'", row.vg_size),
            )
        })?;
        let free = parse_reported_bytes(&row.vg_free).ok_or_else(|| {
            inspection_failed(
                &row.vg_name,
                "free space",
                format!("unparseable vg_free '{}'", row.vg_free),
            )
        })?;
        pools.insert(
            row.vg_name.clone(),
            PoolInfo {
                name: row.vg_name,
                extent_size,
                size,
                free,
            },
        );
    }
    Ok(pools)
}

pub(super) fn list_volumes() -> Result<Vec<LvRecord>, LvShiftError> {
    let raw = run_capture(
        "lvs",
        &[
            "--reportformat",
            "json",
            "--units",
            "b",
            "--nosuffix",
            "-o",
            "lv_name,vg_name,lv_path,lv_size,lv_attr",
        ],
    )?;
    parse_lvs_json(&raw)
}

pub(super) fn list_pools() -> Result<BTreeMap<String, PoolInfo>, LvShiftError> {
    let raw = run_capture(
        "vgs",
        &[
            "--reportformat",
            "json",
            "--units",
            "b",
            "--nosuffix",
            "-o",
            "vg_name,vg_extent_size,vg_size,vg_free",
        ],
    )?;
    parse_vgs_json(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LVS_SAMPLE: &str = r#"{
      "report": [
        {
          "lv": [
            {"lv_name":"root","vg_name":"vg0","lv_path":"/dev/vg0/root","lv_size":"214748364800","lv_attr":"-wi-ao----"},
            {"lv_name":"snap0","vg_name":"vg0","lv_path":"/dev/vg0/snap0","lv_size":"4294967296","lv_attr":"swi-a-s---"},
            {"lv_name":"scratch","vg_name":"vg0","lv_path":"/dev/vg0/scratch","lv_size":"107374182400","lv_attr":"-wi-a-----"}
          ]
        }
      ]
    }"#;

    const VGS_SAMPLE: &str = r#"{
      "report": [
        {
          "vg": [
            {"vg_name":"vg0","vg_extent_size":"4194304","vg_size":"536870912000","vg_free":"107374182400"}
          ]
        }
      ]
    }"#;

    #[test]
    fn parses_lvs_report() {
        let rows = parse_lvs_json(LVS_SAMPLE).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "root");
        assert_eq!(rows[0].size, 214_748_364_800);
        assert_eq!(rows[0].role, VolumeRole::Plain);
        assert_eq!(rows[1].role, VolumeRole::Snapshot);
        assert_eq!(rows[2].path, "/dev/vg0/scratch");
    }

    #[test]
    fn parses_vgs_report() {
        let pools = parse_vgs_json(VGS_SAMPLE).unwrap();
        let vg0 = pools.get("vg0").unwrap();
        assert_eq!(vg0.extent_size, 4 * 1024 * 1024);
        assert_eq!(vg0.free, 107_374_182_400);
    }

    #[test]
    fn unparseable_size_is_fatal_not_zero() {
        let raw = r#"{"report":[{"lv":[
            {"lv_name":"x","vg_name":"vg0","lv_path":"/dev/vg0/x","lv_size":"4.00g","lv_attr":"-wi-a-----"}
        ]}]}"#;
        let err = parse_lvs_json(raw).unwrap_err();
        assert!(matches!(err, LvShiftError::InspectionFailed { .. }));
    }

    #[test]
    fn zero_extent_size_is_fatal() {
        let raw = r#"{"report":[{"vg":[
            {"vg_name":"vg0","vg_extent_size":"0","vg_size":"1","vg_free":"0"}
        ]}]}"#;
        assert!(parse_vgs_json(raw).is_err());
    }

    #[test]
    fn empty_report_yields_nothing() {
        let rows = parse_lvs_json(r#"{"report":[{"lv":[]}]}"#).unwrap();
        assert!(rows.is_empty());
    }
}
