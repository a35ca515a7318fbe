//! Integration tests that run the built `deepfake-ela` binary.

mod exit_code_test;
mod helpers;
