#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    seq: u64,
}

impl Sidecar {
    pub fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_classtrackd");
        let mut child = Command::new(exe)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn classtrackd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            seq: 0,
        }
    }

    /// Spawns and selects `workspace`.
    pub fn open(workspace: &Path) -> Self {
        let mut s = Self::spawn();
        s.request_ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        s
    }

    pub fn send_raw(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.seq += 1;
        let id = self.seq.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let value = self.send_raw(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Returns the error object, asserting the call failed with `code`.
    pub fn request_err(
        &mut self,
        method: &str,
        params: serde_json::Value,
        code: &str,
    ) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        let error = value.get("error").cloned().unwrap_or_else(|| json!({}));
        assert_eq!(
            error.get("code").and_then(|v| v.as_str()),
            Some(code),
            "{} wrong error: {}",
            method,
            value
        );
        error
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Creates a class and saves its weights.
pub fn seed_class(s: &mut Sidecar, name: &str, weights: serde_json::Value) {
    s.request_ok("classes.create", json!({ "name": name, "teacher": "Ms. Rivera" }));
    s.request_ok(
        "weights.save",
        json!({ "className": name, "weights": weights, "confirm": true }),
    );
}

/// Creates an assignment and returns its id.
pub fn add_assignment(
    s: &mut Sidecar,
    class_name: &str,
    title: &str,
    category: &str,
    due: &str,
    points: f64,
) -> String {
    let res = s.request_ok(
        "assignments.create",
        json!({
            "className": class_name,
            "title": title,
            "category": category,
            "due": due,
            "points": points,
        }),
    );
    res.pointer("/assignment/id")
        .and_then(|v| v.as_str())
        .expect("assignment id")
        .to_string()
}

pub fn standard_scheme() -> serde_json::Value {
    json!([
        { "letter": "A", "min": 90, "max": 100, "gpaValue": 4.0 },
        { "letter": "B", "min": 80, "max": 89, "gpaValue": 3.0 },
        { "letter": "C", "min": 70, "max": 79, "gpaValue": 2.0 },
        { "letter": "D", "min": 60, "max": 69, "gpaValue": 1.0 },
        { "letter": "F", "min": 0, "max": 59, "gpaValue": 0.0 }
    ])
}
