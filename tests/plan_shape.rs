//! The plan's step list is fixed in shape and exact in its numbers.

use std::path::PathBuf;

use lvshift::inspect::{FsKind, PoolInfo, VolumeReport, VolumeRole};
use lvshift::plan::{StepKind, build};
use lvshift::validate::{MoveRequest, validate};

const G: u64 = 4 * 1024 * 1024;
const GIB: u64 = 1 << 30;

fn volume(name: &str, size: u64, min: Option<u64>) -> VolumeReport {
    VolumeReport {
        name: name.into(),
        pool: "vg0".into(),
        path: PathBuf::from(format!("/dev/vg0/{name}")),
        size,
        role: VolumeRole::Plain,
        fs: FsKind::Ext4,
        mount: None,
        min_safe_size: min,
    }
}

fn reference_plan() -> lvshift::MovePlan {
    let pool = PoolInfo {
        name: "vg0".into(),
        extent_size: G,
        size: 500 * GIB,
        free: 100 * GIB,
    };
    let src = volume("src", 200 * GIB, Some(50 * GIB));
    let dst = volume("dst", 100 * GIB, None);
    let req = MoveRequest {
        source: src.qualified_name(),
        dest: dst.qualified_name(),
        delta: 20 * GIB,
        margin: None,
    };
    let v = validate(&req, &src, &dst, &pool).unwrap();
    build(&src, &dst, v)
}

#[test]
fn six_steps_in_the_only_safe_order() {
    let plan = reference_plan();
    let kinds: Vec<StepKind> = plan.steps.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::CheckSourceFs,
            StepKind::ShrinkSourceFs,
            StepKind::ShrinkSourceVolume,
            StepKind::RegrowSourceFs,
            StepKind::GrowDestVolume,
            StepKind::GrowDestFs,
        ]
    );
}

#[test]
fn commands_carry_the_validated_numbers() {
    let plan = reference_plan();
    let rendered: Vec<String> = plan.steps.iter().map(|s| s.command.render()).collect();

    let new_size = 180 * GIB;
    let fs_target_kib = (new_size - G) / 1024;

    assert_eq!(rendered[0], "e2fsck -f -y /dev/vg0/src");
    assert_eq!(
        rendered[1],
        format!("resize2fs /dev/vg0/src {fs_target_kib}K")
    );
    assert_eq!(
        rendered[2],
        format!("lvreduce --force --size {new_size}b /dev/vg0/src")
    );
    assert_eq!(rendered[3], "resize2fs /dev/vg0/src");
    assert_eq!(
        rendered[4],
        format!("lvextend --size +{}b /dev/vg0/dst", 20 * GIB)
    );
    assert_eq!(rendered[5], "resize2fs /dev/vg0/dst");
}

#[test]
fn filesystem_target_sits_strictly_below_the_volume_target() {
    let plan = reference_plan();
    let n = &plan.numbers;
    // One extent of slack: the fs is never larger than its backing volume.
    let fs_target_kib: u64 = plan.steps[1]
        .command
        .args
        .last()
        .unwrap()
        .trim_end_matches('K')
        .parse()
        .unwrap();
    assert!(fs_target_kib * 1024 < n.new_source_size);
    assert_eq!(fs_target_kib * 1024, n.new_source_size - n.extent_size);
}

#[test]
fn before_and_after_sizes_line_up() {
    let plan = reference_plan();
    assert_eq!(plan.source_size_before, 200 * GIB);
    assert_eq!(plan.numbers.new_source_size, 180 * GIB);
    assert_eq!(plan.dest_size_before, 100 * GIB);
    assert_eq!(plan.dest_size_after(), 120 * GIB);
    assert_eq!(
        plan.source_size_before - plan.numbers.new_source_size,
        plan.dest_size_after() - plan.dest_size_before
    );
}

#[test]
fn every_step_records_an_undo_note() {
    let plan = reference_plan();
    for step in &plan.steps {
        assert!(
            !step.undo.is_empty(),
            "step '{}' has no undo note",
            step.kind.title()
        );
    }
}
