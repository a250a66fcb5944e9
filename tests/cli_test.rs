use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("plugin-interop").unwrap();
    cmd.env("INTEROP_LOG", "off");
    cmd
}

#[test]
fn test_families_lists_python_and_r() {
    cli()
        .arg("families")
        .assert()
        .success()
        .stdout(predicate::str::contains("perseuspy"))
        .stdout(predicate::str::contains("PerseusR"));
}

#[test]
fn test_run_with_missing_code_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    fs::write(&input, "A\n1\n").unwrap();
    cli()
        .args(["run", "--interpreter", "/bin/sh", "--code"])
        .arg(dir.path().join("missing.py"))
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("out.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.py"));
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn test_preview_writes_type_row() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("preview.txt");
    fs::write(&input, "Value\tName\n1.5\tfoo\n").unwrap();
    cli()
        .arg("preview")
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--annotations")
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Value\tName\n#!{Type}E\tT\n1.5\tfoo\n"
    );
}

#[test]
fn test_params_prints_resolved_launch_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let code = dir.path().join("step.py");
    fs::write(&code, "").unwrap();
    let out = cli()
        .args(["params", "--interpreter", "/opt/python3", "--args", "-n 3", "--suppl-tables", "1", "--code"])
        .arg(&code)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["family"], "python");
    assert_eq!(json["code_file_exists"], true);
    assert_eq!(json["code_file_matches_filter"], true);
    assert_eq!(json["suppl_tables"], 1);
    assert_eq!(json["interpreter"]["path"], "/opt/python3");
    assert_eq!(
        json["arguments"],
        serde_json::json!([code.to_str().unwrap(), "-n", "3", "<input>", "<output>", "<suppl1>"])
    );
}

#[cfg(unix)]
#[test]
fn test_output_write_failure_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let code = dir.path().join("copy.py");
    fs::write(&input, "A\n1\n").unwrap();
    fs::write(&code, "cp \"$1\" \"$2\"\n").unwrap();
    cli()
        .args(["run", "--interpreter", "/bin/sh", "--code"])
        .arg(&code)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("missing-dir").join("out.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("writing output matrix"))
        .stderr(predicate::str::contains("out.txt"));
}

#[cfg(unix)]
#[test]
fn test_run_end_to_end_with_suppl_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let output = dir.path().join("out.txt");
    let suppl = dir.path().join("suppl.txt");
    let code = dir.path().join("step.sh");
    fs::write(&input, "A\tB\n1\tx\n2\ty\n").unwrap();
    fs::write(
        &code,
        "echo \"flag $1\"\ncp \"$2\" \"$3\"\nprintf 'N\\n3\\n' > \"$4\"\n",
    )
    .unwrap();

    cli()
        .args(["run", "--interpreter", "/bin/sh", "--args", "-v", "--code"])
        .arg(&code)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .arg("--suppl-output")
        .arg(&suppl)
        .assert()
        .success()
        .stderr(predicate::str::contains("flag -v"))
        .stderr(predicate::str::contains("does not match the python code filter"));

    assert_eq!(fs::read_to_string(&output).unwrap(), "A\tB\n1\tx\n2\ty\n");
    assert_eq!(fs::read_to_string(&suppl).unwrap(), "N\n3\n");
}

#[cfg(unix)]
#[test]
fn test_run_reports_script_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let code = dir.path().join("fail.sh");
    fs::write(&input, "A\n1\n").unwrap();
    fs::write(&code, "echo 'bad input' >&2\nexit 4\n").unwrap();
    cli()
        .args(["run", "--interpreter", "/bin/sh", "--code"])
        .arg(&code)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(dir.path().join("out.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("exit code 4"))
        .stderr(predicate::str::contains("bad input"));
}
