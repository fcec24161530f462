use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn dcreg(dir: &Path, args: &[String]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dcreg"))
        .args(args)
        .current_dir(dir)
        .env_remove("FSLDIR")
        .env_remove("HCPPIPEDIR_Global")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn full_command_line(root: &Path) -> Vec<String> {
    let p = |name: &str| root.join(name).display().to_string();
    vec![
        format!("--workingdir={}", p("wd")),
        format!("--t1={}", p("in/T1w.nii.gz")),
        format!("--t1brain={}", p("in/T1w_brain.nii.gz")),
        format!("--t2={}", p("in/T2w.nii.gz")),
        format!("--t2brain={}", p("in/T2w_brain.nii.gz")),
        format!("--fmapmag={}", p("in/mag.nii.gz")),
        format!("--fmapphase={}", p("in/phase.nii.gz")),
        "--echodiff=2.46".into(),
        "--t1sampspacing=0.0000074".into(),
        "--t2sampspacing=0.0000021".into(),
        "--unwarpdir=z".into(),
        format!("--ot1={}", p("out/T1w_dc")),
        format!("--ot1brain={}", p("out/T1w_dc_brain")),
        format!("--ot1warp={}", p("out/T1w_dc_warp")),
        format!("--ot2={}", p("out/T2w_dc")),
        format!("--ot2warp={}", p("out/T2w_dc_warp")),
        "--gdcoeffs=NONE".into(),
    ]
}

#[test]
fn no_arguments_prints_usage_and_succeeds() {
    let temp = TempDir::new().unwrap();
    let output = dcreg(temp.path(), &[]);

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}

#[test]
fn too_few_arguments_prints_usage_and_fails() {
    let temp = TempDir::new().unwrap();
    let args: Vec<String> = full_command_line(temp.path()).into_iter().take(3).collect();
    let output = dcreg(temp.path(), &args);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
    assert!(!temp.path().join("wd").exists());
}

#[test]
fn missing_input_fails_before_any_work() {
    let temp = TempDir::new().unwrap();
    let output = dcreg(temp.path(), &full_command_line(temp.path()));

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing input --t1"));
    assert!(!temp.path().join("wd").exists());
}
