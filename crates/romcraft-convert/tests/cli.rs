use std::{fs, path::Path, process::Command};

use romcraft::ndi::ToolDefinition;
use tempfile::TempDir;

const SAW: &str = r#"{
    "id": 12,
    "count": 4,
    "fiducials": [
        {"x": 0.0, "y": 0.0, "z": 0.0},
        {"x": 0.0, "y": 28.59, "z": 41.02},
        {"x": 0.0, "y": 0.0, "z": 88.0},
        {"x": 0.0, "y": -44.32, "z": 40.45}
    ],
    "pivot": {"x": 0.0, "y": 0.0, "z": -10.0}
}"#;

fn rom_convert(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_rom-convert"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .unwrap()
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn json_to_rom_recentres_on_pivot() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tool.json");
    let output = dir.path().join("tool.rom");
    fs::write(&input, SAW).unwrap();

    let out = rom_convert(&[
        "-i",
        path(&input),
        "-o",
        path(&output),
        "--date",
        "2022-07-22",
        "--sequence",
        "5",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("centering coordinate system on pivot"));

    let data = fs::read(&output).unwrap();
    let tool = ToolDefinition::decode(&data).unwrap();
    assert!(ToolDefinition::verify_checksum(&data).unwrap());
    assert_eq!(tool.geometry.marker_count, 4);
    assert_eq!(tool.geometry.markers[2], [0.0, 0.0, 98.0]);
    assert_eq!(tool.header.date.to_string(), "2022-07-22");
    assert_eq!(tool.header.sequence_number, 5);
}

#[test]
fn rom_to_stdout_prints_saw_json() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tool.json");
    let rom = dir.path().join("tool.rom");
    fs::write(&input, SAW).unwrap();
    assert!(rom_convert(&["-i", path(&input), "-o", path(&rom)]).status.success());

    let out = rom_convert(&["-i", path(&rom)]);
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["count"], 4);
    assert_eq!(json["fiducials"][1]["y"], 28.59);
    assert!(json.get("id").is_none());
    assert!(json.get("pivot").is_none());
}

#[test]
fn json_to_ini_keeps_id_and_pivot() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tool.json");
    let output = dir.path().join("tool.ini");
    fs::write(&input, SAW).unwrap();

    assert!(rom_convert(&["-i", path(&input), "-o", path(&output)]).status.success());

    let ini = fs::read_to_string(&output).unwrap();
    assert!(ini.contains("[geometry]\ncount = 4\nid = 12\n"));
    assert!(ini.contains("[fiducial3]\nx = 0.0\ny = -44.32\nz = 40.45\n"));
    assert!(ini.contains("[pivot]\nx = 0.0\ny = 0.0\nz = -10.0\n"));
}

#[test]
fn dump_prints_every_section() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tool.json");
    let rom = dir.path().join("tool.rom");
    fs::write(&input, SAW).unwrap();
    assert!(rom_convert(&["-i", path(&input), "-o", path(&rom)]).status.success());

    let out = rom_convert(&["-i", path(&rom), "--dump"]);
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    for section in ["header", "geometry", "tool_details", "face_geometry"] {
        assert!(json.get(section).is_some(), "{section}");
    }
}

#[test]
fn unsupported_extension_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tool.txt");
    fs::write(&input, "").unwrap();

    let out = rom_convert(&["-i", path(&input)]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("formats are supported"));
}

#[test]
fn mismatched_count_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tool.json");
    fs::write(&input, r#"{"count": 2, "fiducials": []}"#).unwrap();

    let out = rom_convert(&["-i", path(&input)]);
    assert!(!out.status.success());
}
