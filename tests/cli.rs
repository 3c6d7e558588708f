use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn corpusc() -> Command {
    let mut cmd = Command::cargo_bin("corpusc").expect("Failed to find corpusc binary");
    cmd.env_remove("CORPUSC_OUTPUT_DIR")
        .env_remove("CORPUSC_CHUNK_SIZE")
        .env_remove("CORPUSC_MODEL")
        .env_remove("CORPUSC_LOG");
    cmd
}

/// Run a pack with a JSON summary and return the parsed report
fn pack_json(input: &Path, out: &Path, extra: &[&str]) -> Value {
    let mut cmd = corpusc();
    cmd.arg(input)
        .arg("--output-dir")
        .arg(out)
        .arg("--sorted")
        .arg("--model")
        .arg("heuristic")
        .arg("--format")
        .arg("json")
        .args(extra);

    let assert = cmd.assert().success();
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json summary")
}

fn read_artifact(report: &Value, key: &str) -> String {
    let path = report[key].as_str().expect("artifact path");
    fs::read_to_string(path).unwrap()
}

#[test]
fn directory_pack_wraps_files_in_traversal_order() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("proj");
    let out = temp.path().join("out");

    write_file(&src.join("a.py"), "print('<3')");
    write_file(&src.join("b.md"), "# hi & bye");

    let report = pack_json(&src, &out, &[]);
    assert_eq!(report["kind"], "local_directory");
    assert_eq!(report["files_included"], 2);

    let document = read_artifact(&report, "uncompressed_file");
    assert!(document.starts_with("<source type=\"local_directory\" path=\""));
    assert!(document.ends_with("</source>"));

    let a = document
        .find("<file name=\"a.py\">print('&lt;3')</file>")
        .expect("a.py element");
    let b = document
        .find("<file name=\"b.md\"># hi &amp; bye</file>")
        .expect("b.md element");
    assert!(a < b);
}

#[test]
fn excluded_directories_never_appear() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("proj");
    let out = temp.path().join("out");

    write_file(&src.join("index.js"), "run()");
    write_file(&src.join("node_modules/dep/index.js"), "dependency()");
    write_file(&src.join(".git/HEAD.txt"), "ref: main");
    write_file(&src.join("lib/node_modules/deep/x.js"), "nested()");

    let report = pack_json(&src, &out, &[]);
    assert_eq!(report["files_included"], 1);

    let document = read_artifact(&report, "uncompressed_file");
    assert!(!document.contains("node_modules"));
    assert!(!document.contains(".git"));
    assert!(!document.contains("dependency()"));
}

#[test]
fn compressed_artifact_keeps_markup_and_drops_stopwords() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("proj");
    let out = temp.path().join("out");

    write_file(&src.join("notes.md"), "This is the BEST test!\n\nReally.");

    let report = pack_json(&src, &out, &[]);
    assert_eq!(report["compression_path"], "structured");

    let compressed = read_artifact(&report, "compressed_file");
    assert!(compressed.contains("<file name=\"notes.md\">best test! really.</file>"));
}

#[test]
fn custom_stopword_list_replaces_builtin_set() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("proj");
    let out = temp.path().join("out");
    let stop = temp.path().join("stop.txt");

    write_file(&src.join("notes.txt"), "This is the best test");
    write_file(&stop, "best\n");

    let stop_arg = stop.to_string_lossy().into_owned();
    let report = pack_json(&src, &out, &["--stopwords", &stop_arg]);

    let compressed = read_artifact(&report, "compressed_file");
    assert!(compressed.contains("<file name=\"notes.txt\">this is the test</file>"));
}

#[test]
fn unbalanced_markup_falls_back_to_flat_compression() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("proj");
    let out = temp.path().join("out");

    // The doc comment is passed through verbatim and never closed
    write_file(&src.join("Widget.cs"), "/// <param name=\"x\">\nvoid Draw(int x) {}\n");

    let report = pack_json(&src, &out, &[]);
    assert_eq!(report["compression_path"], "flat");

    let compressed = read_artifact(&report, "compressed_file");
    assert!(!compressed.contains('\n'));
    assert!(compressed.contains("void draw(int x)"));
}

#[test]
fn single_file_mode() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("script.sh");
    let out = temp.path().join("out");
    write_file(&file, "echo \"a > b\"\n");

    let report = pack_json(&file, &out, &[]);
    assert_eq!(report["kind"], "single_file");
    assert!(report["uncompressed_file"]
        .as_str()
        .unwrap()
        .contains("uncom_file_"));

    let document = read_artifact(&report, "uncompressed_file");
    assert!(document.contains("<file name=\"script.sh\">echo \"a &gt; b\"\n</file>"));
}

#[test]
fn ineligible_single_file_fails() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("tool.exe");
    write_file(&file, "MZ");

    corpusc()
        .arg(&file)
        .arg("--output-dir")
        .arg(temp.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not eligible"));

    assert!(!temp.path().join("out").exists());
}

#[test]
fn missing_path_fails() {
    let temp = tempdir().unwrap();

    corpusc()
        .arg(temp.path().join("does-not-exist"))
        .arg("--output-dir")
        .arg(temp.path())
        .assert()
        .failure();
}

#[test]
fn zero_chunk_size_is_rejected() {
    corpusc()
        .arg(".")
        .arg("--chunk-size")
        .arg("0")
        .assert()
        .failure();
}

#[test]
fn text_summary_reports_token_counts() {
    let temp = tempdir().unwrap();
    let src = temp.path().join("proj");
    let out = temp.path().join("out");
    write_file(&src.join("readme.txt"), "The quick brown fox jumps over the lazy dog.");

    corpusc()
        .arg(&src)
        .arg("--model")
        .arg("heuristic")
        .arg("--no-color")
        .env("CORPUSC_OUTPUT_DIR", &out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Uncompressed Token Count:"))
        .stdout(predicate::str::contains("Compressed Token Count:"))
        .stdout(predicate::str::contains("have been created."));

    let written: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(written.len(), 2);
}
