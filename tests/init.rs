use std::process::Command;

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vitals"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "vitals init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".vitals.toml");
    assert!(config_path.exists(), ".vitals.toml should exist");

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[hotspot]"));
    assert!(content.contains("[clustering]"));

    let config: vitals_core::VitalsConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.knowledge.island_threshold, 0.8);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".vitals.toml"), "# existing").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_vitals"))
        .arg("init")
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert!(!output.status.success());
    let content = std::fs::read_to_string(dir.path().join(".vitals.toml")).unwrap();
    assert_eq!(content, "# existing");
}
