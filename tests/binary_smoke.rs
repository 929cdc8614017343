use std::process::Command;

#[test]
fn binary_help_succeeds() {
    let me = assert_cmd::cargo::cargo_bin!("lvshift");
    let out = Command::new(me)
        .arg("--help")
        .output()
        .expect("spawn binary");
    assert!(out.status.success());
    let help = String::from_utf8_lossy(&out.stdout);
    assert!(help.contains("--dry-run"));
    assert!(help.contains("--size"));
}

#[test]
fn binary_print_config_succeeds() {
    let me = assert_cmd::cargo::cargo_bin!("lvshift");
    let out = Command::new(me)
        .arg("--print-config")
        .output()
        .expect("spawn binary");
    assert!(
        out.status.success(),
        "binary should succeed with --print-config"
    );
}

#[test]
fn missing_size_is_a_usage_error() {
    let me = assert_cmd::cargo::cargo_bin!("lvshift");
    let out = Command::new(me)
        .args(["vg0/src", "vg0/dst"])
        .output()
        .expect("spawn binary");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--size"));
}
