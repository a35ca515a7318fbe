//! Exit codes of each command when no model is installed.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Decode, missing file, bad path |
//! | 2 | Model not loaded |

use tempfile::TempDir;

use super::helpers::{
    assert_exit_code, run_cli, write_png, EXIT_FAILED, EXIT_MODEL_UNAVAILABLE, EXIT_SUCCESS,
};

#[test]
fn test_classify_without_model_exits_2() {
    let dir = TempDir::new().unwrap();
    let image = dir.path().join("photo.png");
    write_png(&image, 32, 32);

    let result = run_cli(dir.path(), &["classify", image.to_str().unwrap()]);
    assert_exit_code(&result, EXIT_MODEL_UNAVAILABLE, "classify without weights");
    assert!(result.stdout.is_empty(), "no verdict expected: {}", result.stdout);
}

#[test]
fn test_classify_json_without_model_exits_2() {
    let dir = TempDir::new().unwrap();
    let result = run_cli(
        dir.path(),
        &["classify", "--format", "json", "does-not-matter.jpg"],
    );
    assert_exit_code(&result, EXIT_MODEL_UNAVAILABLE, "classify --format json without weights");
}

#[test]
fn test_stored_missing_file_exits_1() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("file_dir").join("batch")).unwrap();

    let result = run_cli(dir.path(), &["stored", "--folder", "batch", "absent.jpg"]);
    assert_exit_code(&result, EXIT_FAILED, "stored with a missing file");
    assert!(result.stderr.contains("absent.jpg"), "stderr: {}", result.stderr);
}

#[test]
fn test_stored_traversal_exits_1() {
    let dir = TempDir::new().unwrap();
    let result = run_cli(dir.path(), &["stored", "--folder", "..", "passwd"]);
    assert_exit_code(&result, EXIT_FAILED, "stored with a parent-dir folder");
}

#[test]
fn test_ela_on_text_file_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "not an image\n").unwrap();
    let output = dir.path().join("notes-ela.png");

    let result = run_cli(
        dir.path(),
        &["ela", input.to_str().unwrap(), output.to_str().unwrap()],
    );
    assert_exit_code(&result, EXIT_FAILED, "ela on a text file");
    assert!(!output.exists());
}

#[test]
fn test_ela_on_image_writes_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("photo.png");
    write_png(&input, 40, 24);
    let output = dir.path().join("photo-ela.png");

    let result = run_cli(
        dir.path(),
        &["ela", input.to_str().unwrap(), output.to_str().unwrap()],
    );
    assert_exit_code(&result, EXIT_SUCCESS, "ela on a PNG");

    let ela = image::open(&output).unwrap();
    assert_eq!((ela.width(), ela.height()), (40, 24));
}

#[test]
fn test_status_without_weights_exits_2() {
    let dir = TempDir::new().unwrap();
    let result = run_cli(dir.path(), &["status"]);
    assert_exit_code(&result, EXIT_MODEL_UNAVAILABLE, "status without weights");
    assert!(
        result.stdout.contains("Model not loaded"),
        "stdout: {}",
        result.stdout
    );
}

#[test]
fn test_invalid_config_file_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[ela]\nquality = 0\n").unwrap();

    let result = run_cli(dir.path(), &["--config", config.to_str().unwrap(), "status"]);
    assert_exit_code(&result, EXIT_FAILED, "status with an invalid config");
}
