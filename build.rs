//! Build script: git hash for `--version` and GPU toolkit checks.
//!
//! whisper-rs-sys fails deep inside its CMake run when a GPU toolkit is
//! missing, so the `cuda` and `vulkan` features check for one up front.

use std::process::Command;

fn main() {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if cfg!(feature = "cuda") {
        check_cuda();
    }
    if cfg!(feature = "vulkan") {
        check_vulkan();
    }
}

fn check_cuda() {
    match Command::new("nvcc").arg("--version").output() {
        Ok(out) if out.status.success() => {
            let text = String::from_utf8_lossy(&out.stdout);
            match parse_cuda_version(&text) {
                Some((major, minor)) => {
                    println!("cargo::warning=Building whisper with CUDA {major}.{minor}")
                }
                None => println!("cargo::warning=Building whisper with CUDA (version unknown)"),
            }
        }
        _ => panic!(
            "the `cuda` feature needs the CUDA toolkit (`nvcc` not found); \
             build without it: cargo build --release --features full"
        ),
    }
}

/// Parse "release X.Y" from nvcc --version output.
fn parse_cuda_version(text: &str) -> Option<(u32, u32)> {
    let release_pos = text.find("release ")?;
    let after = &text[release_pos + 8..];
    let version = &after[..after.find(',')?];
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    Some((major, minor))
}

fn check_vulkan() {
    if Command::new("vulkaninfo").arg("--summary").output().is_err() {
        panic!(
            "the `vulkan` feature needs the Vulkan SDK (`vulkaninfo` not found); \
             build without it: cargo build --release --features full"
        );
    }
    println!("cargo::warning=Vulkan SDK detected");
}
