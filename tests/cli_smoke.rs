use std::path::PathBuf;

use runegrid::{FaultPlan, ModifierKind, ScenarioConfig};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_runegrid")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "runegrid.exe"
            } else {
                "runegrid"
            });
            p
        })
}

#[test]
fn cli_run_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();

    let cfg_path = dir.join("scenario.json");
    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);

    let mut cfg = ScenarioConfig {
        canvas_size: 48,
        pause_ms: 1,
        ..ScenarioConfig::default()
    };
    cfg.phase1 = cfg
        .phase1
        .with_fault(ModifierKind::GridStack, FaultPlan { at_step: 4 });
    std::fs::write(&cfg_path, cfg.to_json_pretty().unwrap()).unwrap();

    let status = std::process::Command::new(exe())
        .args(["run", "--config"])
        .arg(&cfg_path)
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out_path).unwrap();
    assert_eq!((img.width(), img.height()), (48, 48));
}

#[test]
fn cli_dump_config_prints_default_scenario() {
    let output = std::process::Command::new(exe())
        .arg("dump-config")
        .output()
        .unwrap();

    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        ScenarioConfig::from_json_str(&text).unwrap(),
        ScenarioConfig::default()
    );
}
