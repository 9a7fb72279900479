use std::fs;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_init_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let output = Command::new(env!("CARGO_BIN_EXE_treewatch"))
        .arg("init")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run init command");

    assert!(output.status.success());

    // Check that config file was created
    let config_path = temp_path.join(".treewatch/settings.toml");
    assert!(config_path.exists());

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("version = 1"));
    assert!(content.contains("[watch]"));
    assert!(content.contains("[logging]"));

    // A second init without --force refuses to overwrite
    let output = Command::new(env!("CARGO_BIN_EXE_treewatch"))
        .arg("init")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run init command");
    assert!(!output.status.success());
}

#[test]
fn test_config_command() {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path();

    let config_dir = temp_path.join(".treewatch");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("settings.toml"),
        "version = 2\n[watch]\nbuffer_size = 99\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_treewatch"))
        .arg("config")
        .current_dir(temp_path)
        .output()
        .expect("Failed to run config command");

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("version = 2"));
    assert!(stdout.contains("buffer_size = 99"));
}

#[test]
fn test_watch_command_reports_existing_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("tree");
    fs::create_dir_all(root.join("d")).unwrap();
    fs::write(root.join("f"), "").unwrap();
    fs::write(root.join("d/g"), "").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_treewatch"))
        .arg("watch")
        .arg(root.join("..."))
        .args(["--send-create", "--count", "3"])
        .current_dir(temp_dir.path())
        .output()
        .expect("Failed to run watch command");

    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.starts_with("CREATE")));
    assert!(lines[0].contains(&format!("{:?}", root.join("f"))));
    assert!(lines[1].contains(&format!("{:?}", root.join("d"))));
    assert!(lines[2].contains(&format!("{:?}", root.join("d/g"))));
}
