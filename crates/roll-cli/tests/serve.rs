//! `roll serve` over stdio: a full mark-and-submit round trip, and clean exit
//! when stdin closes.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tempfile::TempDir;

const ROSTER: &str = r#"
[[class]]
id = "class-1"
name = "Computer Science"

[[class.section]]
id = "sec-a"
name = "Section A"
students = [
    { id = "1", name = "Alice Johnson", roll = "CS001" },
    { id = "2", name = "Bob Smith", roll = "CS002" },
]
"#;

fn roll_binary() -> std::path::PathBuf {
    assert_cmd::cargo::cargo_bin!("roll").into()
}

fn seed(data_dir: &TempDir) {
    let file = data_dir.path().join("roster.toml");
    std::fs::write(&file, ROSTER).unwrap();
    let status = Command::new(roll_binary())
        .arg("seed")
        .arg(&file)
        .env("ROLL_DATA_DIR", data_dir.path())
        .status()
        .unwrap();
    assert!(status.success());
}

fn spawn_serve(data_dir: &TempDir) -> Child {
    Command::new(roll_binary())
        .arg("serve")
        .env("ROLL_DATA_DIR", data_dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn roll serve")
}

/// Send a JSON-RPC message as newline-delimited JSON.
fn send_jsonrpc(stdin: &mut impl Write, msg: &Value) {
    let line = serde_json::to_string(msg).unwrap();
    writeln!(stdin, "{line}").unwrap();
    stdin.flush().unwrap();
}

/// Read lines until the response carrying `id` arrives.
fn read_response(stdout: &mut BufReader<ChildStdout>, id: u64) -> Value {
    let mut line = String::new();
    loop {
        line.clear();
        let n = stdout.read_line(&mut line).unwrap();
        assert!(n > 0, "server closed stdout before answering {id}");
        if let Ok(msg) = serde_json::from_str::<Value>(&line)
            && msg["id"] == id
        {
            return msg;
        }
    }
}

struct Client {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

impl Client {
    fn connect(child: &mut Child) -> Self {
        let mut client = Self {
            stdin: child.stdin.take().expect("stdin pipe"),
            stdout: BufReader::new(child.stdout.take().expect("stdout pipe")),
            next_id: 1,
        };
        let init = client.request(
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0.1.0" }
            }),
        );
        assert!(init.get("result").is_some(), "initialize failed: {init}");
        send_jsonrpc(
            &mut client.stdin,
            &json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        );
        client
    }

    fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        send_jsonrpc(
            &mut self.stdin,
            &json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }),
        );
        read_response(&mut self.stdout, id)
    }

    /// Call a tool and return its decoded JSON payload, or the error object.
    fn call(&mut self, name: &str, arguments: Value) -> Result<Value, Value> {
        let response = self.request(
            "tools/call",
            json!({ "name": name, "arguments": arguments }),
        );
        if let Some(error) = response.get("error") {
            return Err(error.clone());
        }
        let result = &response["result"];
        if result["isError"] == true {
            return Err(result.clone());
        }
        let text = result["content"][0]["text"].as_str().unwrap_or_default();
        Ok(serde_json::from_str(text).unwrap_or(Value::String(text.to_string())))
    }
}

#[test]
fn mark_and_submit_round_trip() {
    let dir = TempDir::new().unwrap();
    seed(&dir);
    let mut child = spawn_serve(&dir);
    let mut client = Client::connect(&mut child);

    let loaded = client
        .call(
            "attendance_load",
            json!({ "class_id": "class-1", "section_id": "sec-a", "date": "2024-09-02" }),
        )
        .unwrap();
    assert_eq!(loaded["counts"]["unmarked"], 2);

    client
        .call("attendance_mark", json!({ "student_id": "1", "status": "present" }))
        .unwrap();
    assert!(client.call("attendance_submit", json!({})).is_err());

    client
        .call("attendance_mark", json!({ "student_id": "2", "status": "absent" }))
        .unwrap();
    let receipt = client.call("attendance_submit", json!({})).unwrap();
    assert_eq!(receipt["counts"]["present"], 1);
    assert_eq!(receipt["counts"]["absent"], 1);

    drop(client);
    let output = child.wait_with_output().expect("wait");
    assert!(output.status.success(), "serve exited with {}", output.status);

    let export = Command::new(roll_binary())
        .args([
            "export", "--class", "class-1", "--section", "sec-a", "--date", "2024-09-02",
            "--format", "csv",
        ])
        .env("ROLL_DATA_DIR", dir.path())
        .output()
        .unwrap();
    assert!(export.status.success());
    let csv = String::from_utf8_lossy(&export.stdout);
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("present"));
    assert!(csv.contains("absent"));
}

/// Closing stdin before MCP init should still exit cleanly (code 0).
#[test]
fn serve_exits_on_early_stdin_eof() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_serve(&dir);
    std::thread::sleep(Duration::from_millis(200));

    drop(child.stdin.take());

    let start = Instant::now();
    let output = child.wait_with_output().expect("wait");
    let elapsed = start.elapsed();

    assert!(
        output.status.success(),
        "early stdin EOF should exit 0, got {}",
        output.status
    );
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
}
