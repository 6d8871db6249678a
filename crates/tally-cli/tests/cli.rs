use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BILL: &str = "Grand Total: Rs. 1,500\nPaid: Rs. 1,000\nBalance Due: Rs. 500";

/// A `tally` command pinned to an empty config file so a user config on the
/// test machine cannot leak in.
fn tally(dir: &TempDir) -> Command {
    let config = dir.path().join("config.json");
    if !config.exists() {
        fs::write(&config, "{}").unwrap();
    }
    let mut cmd = Command::cargo_bin("tally").unwrap();
    cmd.arg("--config").arg(config);
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn process_inline_text() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["process", "--text", BILL])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""guardrail": false"#))
        .stdout(predicate::str::contains(r#""currency": "INR""#))
        .stdout(predicate::str::contains(r#""type": "due""#))
        .stdout(predicate::str::contains("text: 'Total: INR 1500'"));
}

#[test]
fn process_text_file() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "receipt.txt", "Total: $120.50\nThank you!");
    tally(&dir)
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""currency": "USD""#))
        .stdout(predicate::str::contains("120.5"));
}

#[test]
fn process_stdin() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["process", "-"])
        .write_stdin(BILL)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type": "paid""#));
}

#[test]
fn process_garbage_exits_with_guardrail() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["process", "--text", "hello world"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains(r#""status": "no_amounts_found""#))
        .stdout(predicate::str::contains("document too noisy"));
}

#[test]
fn process_text_format() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["process", "--format", "text", "--text", BILL])
        .assert()
        .success()
        .stdout(predicate::str::contains("Currency: INR"))
        .stdout(predicate::str::contains("Paid   1000"));
}

#[test]
fn process_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("result.json");
    tally(&dir)
        .args(["process", "--text", BILL, "--output"])
        .arg(&output)
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["output"]["amounts"][0]["value"], serde_json::json!(1500.0));
}

#[test]
fn process_with_label_file() {
    let dir = TempDir::new().unwrap();
    let labels = write(
        &dir,
        "labels.json",
        r#"{"labels": [{"value": 120.5, "type": "paid"}]}"#,
    );
    tally(&dir)
        .args(["process", "--text", "Total: $120.50", "--labels"])
        .arg(&labels)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type": "paid""#));
}

#[test]
fn process_requires_input() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .arg("process")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to process"));
}

#[test]
fn stage_normalize_from_stdin() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["stage", "normalize", "--request", "-"])
        .write_stdin(r#"{"raw_tokens": ["500", "18%", "l2O"]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""normalized_amounts""#))
        .stdout(predicate::str::contains("120.0"))
        .stdout(predicate::str::contains("18.0"));
}

#[test]
fn stage_extract_hides_raw_text() {
    let dir = TempDir::new().unwrap();
    let request = write(&dir, "extract.json", &serde_json::json!({ "text": BILL }).to_string());
    tally(&dir)
        .args(["stage", "extract", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""currency_hint": "INR""#))
        .stdout(predicate::str::contains("raw_text").not());
}

#[test]
fn stage_finalize_keeps_first_per_role() {
    let dir = TempDir::new().unwrap();
    let request = r#"{
        "amounts": [
            {"type": "total_bill", "value": 100},
            {"type": "total_bill", "value": 150},
            {"type": "paid", "value": 80}
        ],
        "currency": "USD",
        "raw_text": ""
    }"#;
    tally(&dir)
        .args(["stage", "finalize"])
        .write_stdin(request)
        .assert()
        .success()
        .stdout(predicate::str::contains("text: 'Total: $100'"))
        .stdout(predicate::str::contains("150").not());
}

#[test]
fn stage_classify_empty_is_guardrail() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["stage", "classify"])
        .write_stdin(r#"{"normalized_amounts": []}"#)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("no normalized amounts"));
}

#[test]
fn batch_with_summary() {
    let dir = TempDir::new().unwrap();
    let inputs = dir.path().join("inputs");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("good.txt"), BILL).unwrap();
    fs::write(inputs.join("noise.txt"), "nothing here").unwrap();
    fs::write(inputs.join("skip.md"), BILL).unwrap();

    let out = dir.path().join("out");
    let pattern = format!("{}/*", inputs.display());
    tally(&dir)
        .args(["batch", &pattern, "--summary", "--output-dir"])
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("good.json").exists());
    assert!(out.join("noise.json").exists());
    assert!(!out.join("skip.json").exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,currency,total,paid,due"));
    assert!(summary.contains("good.txt,ok,INR,1500,1000,500"));
    assert!(summary.contains("noise.txt,no_amounts_found"));
}

#[test]
fn config_get_and_init() {
    let dir = TempDir::new().unwrap();
    tally(&dir)
        .args(["config", "get", "ocr.timeout_secs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("35"));

    tally(&dir)
        .args(["config", "get", "ocr.nope"])
        .assert()
        .failure();

    let target = dir.path().join("fresh").join("config.json");
    tally(&dir)
        .args(["config", "init", "--output"])
        .arg(&target)
        .assert()
        .success();
    assert!(target.exists());

    tally(&dir)
        .args(["config", "init", "--output"])
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}
