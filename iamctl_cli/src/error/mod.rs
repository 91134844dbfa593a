use colored::*;
use iamctl_core::error::InternalError;
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    State,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    /// The command ran but at least one batch item failed
    PartialFailure = 4,
}

impl ExitCode {
    /// Exit code for a finished batch
    pub fn for_batch(failure_count: usize) -> Self {
        if failure_count == 0 {
            Self::Success
        } else {
            Self::PartialFailure
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    fn new(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(message, ErrorCategory::General)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        let mut error = Self::new(message, ErrorCategory::Misuse);
        error
            .suggestions
            .push("Run 'iamctl --help' for usage information".to_string());
        error
    }

    /// Create an error for an unreadable or unwritable directory snapshot
    pub fn state_file(error: iamctl_core::Error, path: &str) -> Self {
        let mut cli_error = Self::new(&error.to_string(), ErrorCategory::State);

        match &error {
            iamctl_core::Error::Internal(InternalError::Serialization(_)) => {
                cli_error
                    .suggestions
                    .push("The file is not a valid iamctl directory snapshot".to_string());
            }
            _ => {
                cli_error.suggestions.push("Check file permissions".to_string());
            }
        }
        cli_error
            .suggestions
            .push("Pass a different location with --state".to_string());

        cli_error.source = Some(Box::new(error));
        cli_error
            .context
            .push(("path".to_string(), path.to_string()));
        cli_error
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General | ErrorCategory::State => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::State => "State Error",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Convert anyhow errors to CLI errors, keeping the full context chain
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        Self::general(&format!("{error:#}"))
    }
}

impl From<iamctl_core::Error> for CliError {
    fn from(error: iamctl_core::Error) -> Self {
        let message = error.to_string();
        let cli_error = if matches!(error, iamctl_core::Error::Validation(_)) {
            Self::misuse(&message)
        } else {
            Self::general(&message)
        };
        cli_error.with_source(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::general("x").exit_code(), ExitCode::GeneralError);
        assert_eq!(CliError::misuse("x").exit_code(), ExitCode::Misuse);
        assert_eq!(ExitCode::for_batch(0), ExitCode::Success);
        assert_eq!(ExitCode::for_batch(3), ExitCode::PartialFailure);
        assert_eq!(ExitCode::PartialFailure as u8, 4);
    }

    #[test]
    fn test_core_validation_error_is_misuse() {
        let err: CliError = iamctl_core::validate_unique_names("user", ["a", "a"])
            .unwrap_err()
            .into();
        assert_eq!(err.exit_code(), ExitCode::Misuse);
        assert!(err.to_string().contains("Duplicate user 'a'"));
        assert!(err.source().is_some());
        assert!(err.format_for_user(true).contains("Caused by"));
    }

    #[test]
    fn test_state_file_error_has_context() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CliError::state_file(
            InternalError::Serialization(source).into(),
            "/root/state.json",
        );

        let text = err.format_for_user(true);
        assert_eq!(err.exit_code(), ExitCode::GeneralError);
        assert!(text.contains("/root/state.json"));
        assert!(text.contains("not a valid iamctl directory snapshot"));
        assert!(text.contains("Caused by"));
    }

    #[test]
    fn test_anyhow_chain_is_kept() {
        let err: CliError = anyhow::anyhow!("inner").context("outer").into();
        assert_eq!(err.to_string(), "Error: outer: inner");
    }
}
