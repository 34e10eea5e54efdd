use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classdeskd");
    let mut child = Command::new(exe)
        .env_remove("CLASSDESK_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classdeskd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> (String, serde_json::Value) {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    let error = value.get("error").cloned().unwrap_or(serde_json::Value::Null);
    let code = error
        .get("code")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();
    (code, error)
}

const TYPES: [&str; 7] = [
    "MULTIPLE_CHOICE",
    "TRUE_FALSE",
    "SHORT_ANSWER",
    "ESSAY",
    "FILL_IN_BLANK",
    "MATCHING",
    "ORDERING",
];

#[test]
fn every_default_payload_validates() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let types = request_ok(&mut stdin, &mut reader, "0", "question.types", json!({}));
    assert_eq!(types["types"], json!(TYPES));

    for (i, t) in TYPES.iter().enumerate() {
        let defaults = request_ok(
            &mut stdin,
            &mut reader,
            &format!("d{}", i),
            "question.defaultData",
            json!({ "type": t }),
        );
        let validated = request_ok(
            &mut stdin,
            &mut reader,
            &format!("v{}", i),
            "question.validate",
            json!({ "type": t, "questionData": defaults["questionData"] }),
        );
        assert_eq!(validated["questionData"], defaults["questionData"], "type {}", t);
    }

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn validation_errors_are_keyed_by_payload_path() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let (code, error) = request_err_code(
        &mut stdin,
        &mut reader,
        "1",
        "question.validate",
        json!({
            "type": "MULTIPLE_CHOICE",
            "questionData": {
                "options": ["4", ""],
                "correctnessMode": "SINGLE_ANSWER",
                "correctAnswers": [0, 1]
            }
        }),
    );
    assert_eq!(code, "validation_failed");
    let paths: Vec<&str> = error["details"]["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .map(|e| e["path"].as_str().expect("path"))
        .collect();
    assert_eq!(
        paths,
        vec!["questionData.options.1", "questionData.correctAnswers"]
    );

    // A matching payload sent for an ordering question is a shape mismatch.
    let (code, error) = request_err_code(
        &mut stdin,
        &mut reader,
        "2",
        "question.validate",
        json!({
            "type": "ORDERING",
            "questionData": { "leftOptions": [], "rightOptions": [], "correctAnswers": {} }
        }),
    );
    assert_eq!(code, "validation_failed");
    assert_eq!(error["details"]["errors"][0]["path"], json!("questionData"));

    let (code, _) = request_err_code(
        &mut stdin,
        &mut reader,
        "3",
        "question.validate",
        json!({
            "type": "FILL_IN_BLANK",
            "body": "the quick",
            "questionData": { "correctAnswers": [3] }
        }),
    );
    assert_eq!(code, "validation_failed");

    let (code, _) = request_err_code(
        &mut stdin,
        &mut reader,
        "4",
        "question.defaultData",
        json!({ "type": "POLL" }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn tokenize_splits_on_whitespace_runs() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "question.tokenize",
        json!({ "body": "  The cat\t sat  on\nthe mat " }),
    );
    assert_eq!(result["tokens"], json!(["The", "cat", "sat", "on", "the", "mat"]));

    drop(stdin);
    let _ = child.wait();
}
