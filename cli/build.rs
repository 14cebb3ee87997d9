//! Build script: embeds the version string as `MYCONFIG_VERSION`.

use std::env;
use std::process::Command;

const VERSION_VAR: &str = "MYCONFIG_VERSION";

/// `git describe` output for the checkout, if there is one.
fn describe() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn main() {
    // Release builds pass the version in; local builds describe the checkout.
    if let Some(version) = env::var(VERSION_VAR).ok().or_else(describe) {
        println!("cargo:rustc-env={VERSION_VAR}={version}");
    }

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=../.git/refs/");
    println!("cargo:rerun-if-env-changed={VERSION_VAR}");
}
