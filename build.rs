use std::env;
use std::process::Command;

const PREFIX: &str = "BUDGET_WIZARD_BUILD";

fn main() {
    for path in ["build.rs", ".git/HEAD", ".git/refs"] {
        println!("cargo:rerun-if-changed={path}");
    }

    let status = command_output("git", &["status", "--porcelain"]).map(|out| {
        if out.is_empty() {
            "clean".to_string()
        } else {
            "dirty".to_string()
        }
    });
    let metadata = [
        ("HASH", command_output("git", &["rev-parse", "--short", "HEAD"])),
        ("STATUS", status),
        (
            "TIMESTAMP",
            Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        ),
        ("TARGET", env::var("TARGET").ok()),
        ("PROFILE", env::var("PROFILE").ok()),
        ("RUSTC", command_output("rustc", &["--version"])),
    ];

    for (name, value) in metadata {
        let value = value.unwrap_or_else(|| "unknown".to_string());
        println!("cargo:rustc-env={PREFIX}_{name}={value}");
    }
}

/// Trimmed stdout of a successful command.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|text| text.trim().to_string())
}
