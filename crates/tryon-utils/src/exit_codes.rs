//! Exit code constants and error mapping for the tryon CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `INVALID_INPUT` | Try-on request rejected as invalid |
//! | 69 | `SERVICE_UNAVAILABLE` | Synthesis service busy, throttled or too slow |
//! | 70 | `SYNTHESIS_FAILURE` | Synthesis failed for any other reason |

use crate::error::{ErrorKind, TryOnError};

/// Process exit code.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) for
/// `std::process::exit()`.
///
/// ```rust
/// use tryon_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(70), ExitCode::SYNTHESIS_FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Invalid input - the request was rejected before synthesis
    pub const INVALID_INPUT: ExitCode = ExitCode(3);

    /// Service unavailable - loading, rate limited or timed out
    pub const SERVICE_UNAVAILABLE: ExitCode = ExitCode(69);

    /// Synthesis failure - configuration or unknown upstream failure
    pub const SYNTHESIS_FAILURE: ExitCode = ExitCode(70);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl ErrorKind {
    /// Exit code used by the CLI when a submission ends with this kind.
    #[must_use]
    pub const fn exit_code(self) -> ExitCode {
        match self {
            ErrorKind::Validation => ExitCode::INVALID_INPUT,
            ErrorKind::Timeout | ErrorKind::RateLimited | ErrorKind::ServiceLoading => {
                ExitCode::SERVICE_UNAVAILABLE
            }
            ErrorKind::AuthConfig | ErrorKind::Unknown => ExitCode::SYNTHESIS_FAILURE,
        }
    }
}

impl TryOnError {
    /// Map the error onto the documented exit code table.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            TryOnError::Config(_) => ExitCode::CLI_ARGS,
            TryOnError::Synthesis(e) => e.kind().exit_code(),
            TryOnError::DataUrl(_) | TryOnError::Io(_) => ExitCode::INTERNAL,
        }
    }
}
