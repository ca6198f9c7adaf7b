#![allow(dead_code)]

use std::{
    fs,
    io::{BufRead, BufReader, Read, Write},
    net::{TcpListener, TcpStream},
    path::Path,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use assert_cmd::Command;
use tempfile::TempDir;

pub const SALARY_MENU: &str = r#"{"Income": ["Salary"]}"#;

pub const SALARY_FIELDS: &str = r#"{"Salary": [
    {"id": 1, "label": "Base", "value": "", "frequency": "Monthly"},
    {"id": 2, "label": "Bonus", "value": "", "frequency": ""}
]}"#;

pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Drives the script-mode binary against an isolated application home.
pub struct WizardHarness {
    home: TempDir,
}

impl WizardHarness {
    pub fn new() -> Self {
        Self {
            home: TempDir::new().expect("create temp dir"),
        }
    }

    /// Harness whose catalog is read from a directory inside the home.
    pub fn with_catalog(menu: &str, fields: &str) -> Self {
        let harness = Self::new();
        harness.write_catalog(menu, fields);
        harness
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn write_catalog(&self, menu: &str, fields: &str) {
        let dir = self.home().join("custom-catalog");
        fs::create_dir_all(&dir).expect("create catalog dir");
        fs::write(dir.join("menu.json"), menu).expect("write menu");
        fs::write(dir.join("fields.json"), fields).expect("write fields");
        self.write_config(serde_json::json!({ "catalog_dir": dir }));
    }

    pub fn write_config(&self, config: serde_json::Value) {
        let dir = self.home().join("config");
        fs::create_dir_all(&dir).expect("create config dir");
        let body = serde_json::to_string_pretty(&config).expect("encode config");
        fs::write(dir.join("config.json"), body).expect("write config");
    }

    /// Persisted rows of one step, if the step was ever saved.
    pub fn stored(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.home().join("storage").join(format!("{key}.json"))).ok()
    }

    pub fn run_script(&self, script: &str) -> CliOutput {
        self.run_script_with_env(script, &[])
    }

    pub fn run_script_with_env(&self, script: &str, extra_env: &[(&str, &str)]) -> CliOutput {
        let mut cmd = Command::cargo_bin("budget_wizard_cli").expect("binary exists");
        cmd.env("BUDGET_WIZARD_HOME", self.home())
            .env("BUDGET_WIZARD_CLI_SCRIPT", "1")
            .env("NO_COLOR", "1")
            .env_remove("BUDGET_WIZARD_TEST_KEYS")
            .write_stdin(script.to_string());
        for (key, value) in extra_env {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("run script CLI");
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            panic!(
                "script CLI failed: status={}\nstdout:\n{}\nstderr:\n{}",
                output.status, stdout, stderr
            );
        }
        CliOutput { stdout, stderr }
    }
}

/// Local HTTP endpoint answering every request with a fixed status and
/// recording the request bodies.
pub struct StubServer {
    pub url: String,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub fn start(status: u16) -> Self {
        Self::start_with_delay(status, Duration::ZERO)
    }

    /// Like `start`, but every reply is held back by `delay`.
    pub fn start_with_delay(status: u16, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        let address = listener.local_addr().expect("stub address");
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&bodies);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                answer(stream, status, delay, &recorded);
            }
        });
        Self {
            url: format!("http://{address}/submissions"),
            bodies,
        }
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().expect("stub bodies").clone()
    }
}

fn answer(
    mut stream: TcpStream,
    status: u16,
    delay: Duration,
    recorded: &Mutex<Vec<String>>,
) -> Option<()> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).ok()?;
    // Record before replying.
    recorded
        .lock()
        .ok()?
        .push(String::from_utf8_lossy(&body).to_string());

    thread::sleep(delay);
    let reason = if status < 300 { "OK" } else { "Error" };
    let response =
        format!("HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()
}
