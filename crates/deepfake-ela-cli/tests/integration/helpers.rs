//! Helpers for invoking the real CLI binary.
//!
//! Every invocation gets an isolated environment: all `DEEPFAKE_*`
//! variables are cleared and the model path points inside a temp dir, so
//! no weights are found unless a test puts them there.

use std::path::Path;
use std::process::Command;

use image::{Rgb, RgbImage};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_MODEL_UNAVAILABLE: i32 = 2;

const ENV_VARS: &[&str] = &[
    "DEEPFAKE_MODEL_PATH",
    "DEEPFAKE_DEVICE",
    "DEEPFAKE_SERIALIZE_INFERENCE",
    "DEEPFAKE_ELA_QUALITY",
    "DEEPFAKE_SCRATCH",
    "DEEPFAKE_FILES_DIR",
];

/// Result of a CLI invocation
#[derive(Debug)]
pub struct CliResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Run `deepfake-ela <args>` with `work_dir` as its sandbox.
pub fn run_cli(work_dir: &Path, args: &[&str]) -> CliResult {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_deepfake-ela"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env(
        "DEEPFAKE_MODEL_PATH",
        work_dir.join("model").join("best_model.safetensors"),
    )
    .env("DEEPFAKE_FILES_DIR", work_dir.join("file_dir"))
    .env("RUST_LOG", "warn")
    .current_dir(work_dir)
    .args(args);

    let output = cmd
        .output()
        .unwrap_or_else(|e| panic!("Failed to spawn CLI with {:?}: {}", args, e));

    CliResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Assert that exit code matches expected with detailed error message
pub fn assert_exit_code(result: &CliResult, expected: i32, context: &str) {
    assert_eq!(
        result.exit_code, expected,
        "{}\nExpected exit code {}, got {}.\nstdout: {}\nstderr: {}",
        context, expected, result.exit_code, result.stdout, result.stderr
    );
}

/// Write a small gradient PNG to `path`.
pub fn write_png(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 9) as u8, (y * 11) as u8, ((x + y) * 4) as u8])
    });
    img.save(path).expect("write test PNG");
}
