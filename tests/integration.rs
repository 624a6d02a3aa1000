use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn vf_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("vf");
    path
}

/// Creates `<tmp>/demo` with a small project and `<tmp>/config/vf.toml`.
fn setup_test_env() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let project = root.join("demo");
    fs::create_dir_all(project.join("src/util")).unwrap();
    fs::create_dir_all(project.join("dist")).unwrap();
    fs::write(
        project.join("src/index.js"),
        "import { helper } from './util/helper.js';\n\nasync function main() {\n  for (const x of [1, 2]) {\n    await helper(x);\n  }\n}\n\nmain();\n",
    )
    .unwrap();
    fs::write(
        project.join("src/util/helper.js"),
        "export function helper(x) {\n  return x * 2;\n}\n",
    )
    .unwrap();
    fs::write(project.join("README.md"), "# Demo\n\nA demo project.\n").unwrap();
    fs::write(project.join(".env"), "SECRET=1\n").unwrap();
    fs::write(project.join("src/empty.js"), "").unwrap();
    fs::write(project.join("dist/bundle.js"), "minified();\n").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("vf.toml");
    fs::write(
        &config_path,
        r#"[ingest]
exclude_globs = ["dist/**"]

[provider]
kind = "disabled"
"#,
    )
    .unwrap();

    (tmp, config_path, project)
}

fn run_vf(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = vf_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run vf binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_scan_reports_totals() {
    let (_tmp, config, project) = setup_test_env();
    let (stdout, stderr, success) = run_vf(&config, &["scan", project.to_str().unwrap()]);
    assert!(success, "scan failed: {}", stderr);
    // index.js (10) + helper.js (4) + README.md (4); .env, empty.js and dist/ are skipped
    assert!(stdout.contains("Files:       3"), "stdout: {}", stdout);
    assert!(stdout.contains("Lines:       18"), "stdout: {}", stdout);
    assert!(stdout.contains("demo/src/index.js"));
    assert!(!stdout.contains(".env"));
    assert!(!stdout.contains("bundle.js"));
}

#[test]
fn test_graph_is_single_tree() {
    let (_tmp, config, project) = setup_test_env();
    let (stdout, stderr, success) = run_vf(&config, &["graph", project.to_str().unwrap()]);
    assert!(success, "graph failed: {}", stderr);

    let graph: Value = serde_json::from_str(&stdout).unwrap();
    let nodes = graph["nodes"].as_array().unwrap();
    let edges = graph["edges"].as_array().unwrap();

    let ids: Vec<&str> = nodes
        .iter()
        .map(|n| n["data"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids[0], "root");
    assert!(ids.contains(&"dir:demo/src/util"));
    assert!(ids.contains(&"file:demo/src/util/helper.js"));
    assert_eq!(edges.len(), nodes.len() - 1);

    for id in ids.iter().filter(|id| **id != "root") {
        let incoming = edges
            .iter()
            .filter(|e| e["data"]["target"].as_str() == Some(id))
            .count();
        assert_eq!(incoming, 1, "node {} should have one parent", id);
    }
}

#[test]
fn test_digest_output() {
    let (_tmp, config, project) = setup_test_env();
    let (stdout, stderr, success) = run_vf(&config, &["digest", project.to_str().unwrap()]);
    assert!(success, "digest failed: {}", stderr);
    assert!(stdout.starts_with("PROJECT OVERVIEW:\n- Files: 3\n- Total Lines: 18"));
    assert!(stdout.contains("- Entry Point: demo/src/index.js"));
    assert!(stdout.contains("- Loops: 1"));
    assert!(stdout.contains("- Async Operations: 2"));
    assert!(stdout.contains("- Functions: 2"));
    assert!(stdout.contains("EXTENSIONS:\njs: 2, md: 1"));
    assert!(stdout.contains("\nhash: "));
}

#[test]
fn test_digest_is_stable_across_runs() {
    let (_tmp, config, project) = setup_test_env();
    let (first, _, _) = run_vf(&config, &["digest", project.to_str().unwrap()]);
    let (second, _, _) = run_vf(&config, &["digest", project.to_str().unwrap()]);
    assert_eq!(first, second);
}

#[test]
fn test_export_to_file() {
    let (tmp, config, project) = setup_test_env();
    let out = tmp.path().join("out/project.json");
    let (_, stderr, success) = run_vf(
        &config,
        &[
            "export",
            project.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ],
    );
    assert!(success, "export failed: {}", stderr);
    assert!(stderr.contains("Exported 3 files"));

    let data: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(data["summary"]["totalFiles"], 3);
    assert_eq!(data["summary"]["extensionHistogram"][0]["extension"], "js");
    assert_eq!(data["topFilesByLines"][0]["path"], "demo/src/index.js");
    assert!(data["files"][0].get("content").is_none());
}

#[test]
fn test_ask_falls_back_when_provider_disabled() {
    let (_tmp, config, project) = setup_test_env();
    let (stdout, stderr, success) = run_vf(
        &config,
        &["ask", project.to_str().unwrap(), "What is the entry point?"],
    );
    assert!(success, "ask failed: {}", stderr);
    assert!(stdout.contains("Project contains 3 files and 18 total lines."));
    assert!(stdout.contains("demo/src/index.js leads with 10 lines"));
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_missing_folder_errors() {
    let (tmp, config, _project) = setup_test_env();
    let missing = tmp.path().join("nope");
    let (_, stderr, success) = run_vf(&config, &["scan", missing.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("does not exist"));
}

#[test]
fn test_invalid_config_errors() {
    let (tmp, _config, project) = setup_test_env();
    let bad = tmp.path().join("bad.toml");
    fs::write(&bad, "[limits]\nper_minute = 0\n").unwrap();
    let (_, stderr, success) = run_vf(&bad, &["scan", project.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("per_minute"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let (tmp, _config, project) = setup_test_env();
    let absent = tmp.path().join("absent.toml");
    let (stdout, stderr, success) = run_vf(&absent, &["scan", project.to_str().unwrap()]);
    assert!(success, "scan failed: {}", stderr);
    // without the dist/** exclude the bundle is counted
    assert!(stdout.contains("Files:       4"));
}

#[test]
fn test_jury_declined_disclaimer_sends_nothing() {
    use std::io::Write;
    use std::process::Stdio;

    let (_tmp, config, project) = setup_test_env();
    let mut child = Command::new(vf_binary())
        .arg("--config")
        .arg(&config)
        .arg("--progress")
        .arg("off")
        .arg("jury")
        .arg(&project)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(b"no\n").unwrap();
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("Disclaimer not accepted; nothing was sent."));
}
