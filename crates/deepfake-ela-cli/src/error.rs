//! Process exit codes.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Every requested image was classified (or the command succeeded) |
//! | 1 | At least one image failed: decode, processing, missing file, config |
//! | 2 | The classifier is not loaded |

use deepfake_ela_core::{DetectError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CliExitCode {
    Success = 0,
    Failed = 1,
    ModelUnavailable = 2,
}

impl CliExitCode {
    /// Combine two outcomes, keeping the more severe one.
    pub fn worst(self, other: CliExitCode) -> CliExitCode {
        if other as i32 > self as i32 {
            other
        } else {
            self
        }
    }
}

pub fn exit_code_for_error(err: &DetectError) -> CliExitCode {
    match err.kind() {
        ErrorKind::ModelUnavailable => CliExitCode::ModelUnavailable,
        _ => CliExitCode::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_mapping() {
        let unavailable = DetectError::ModelUnavailable {
            reason: "missing".to_string(),
        };
        let decode = DetectError::Decode {
            filename: "a.txt".to_string(),
            message: "bad".to_string(),
        };
        let missing = DetectError::FileNotFound {
            path: PathBuf::from("x"),
        };
        assert_eq!(exit_code_for_error(&unavailable), CliExitCode::ModelUnavailable);
        assert_eq!(exit_code_for_error(&decode), CliExitCode::Failed);
        assert_eq!(exit_code_for_error(&missing), CliExitCode::Failed);
    }

    #[test]
    fn test_worst() {
        use CliExitCode::*;
        assert_eq!(Success.worst(Failed), Failed);
        assert_eq!(ModelUnavailable.worst(Failed), ModelUnavailable);
        assert_eq!(Success.worst(Success), Success);
        assert_eq!(ModelUnavailable as i32, 2);
    }
}
