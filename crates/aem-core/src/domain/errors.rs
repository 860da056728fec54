use std::error::Error;
use std::fmt::{Display, Formatter};

/// Which side of a run a failure came from. Each maps to its own process exit
/// code so scripts driving `aem-rs` can tell a bad composition from a missing
/// solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AemErrorCategory {
    /// Identifiers, registry records, run configs, report layouts and
    /// command-line usage.
    InputValidation,
    /// Registry files, run directories, report files.
    IoSystem,
    /// Launching, feeding or probing the solver executable.
    Solver,
    /// Serialization of our own output.
    Internal,
}

impl AemErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidation => 2,
            Self::IoSystem => 3,
            Self::Solver => 4,
            Self::Internal => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidation => "input",
            Self::IoSystem => "io",
            Self::Solver => "solver",
            Self::Internal => "internal",
        }
    }
}

/// Failure surfaced at the command line.
///
/// Module errors (`CompositionError`, `CueError`, `RegistryError`, ...) convert
/// into this type with a stable placeholder token so diagnostics stay greppable
/// across releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AemError {
    category: AemErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl AemError {
    pub fn new(
        category: AemErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn input_validation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AemErrorCategory::InputValidation, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AemErrorCategory::IoSystem, placeholder, message)
    }

    pub fn solver(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AemErrorCategory::Solver, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AemErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> AemErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }

    pub fn exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for AemError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} error [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for AemError {}

#[cfg(test)]
mod tests {
    use super::{AemError, AemErrorCategory};

    #[test]
    fn categories_keep_distinct_exit_codes() {
        let codes = [
            AemErrorCategory::InputValidation,
            AemErrorCategory::IoSystem,
            AemErrorCategory::Solver,
            AemErrorCategory::Internal,
        ]
        .map(AemErrorCategory::exit_code);
        assert_eq!(codes, [2, 3, 4, 5]);
    }

    #[test]
    fn composition_failure_renders_cli_lines() {
        let error = AemError::input_validation(
            "INPUT.INVALID_COMPOSITION",
            "solvent weights 'A_B|5_50' mix digit lengths [1, 2]",
        );

        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.INVALID_COMPOSITION] solvent weights 'A_B|5_50' mix digit lengths [1, 2]"
        );
        assert_eq!(error.exit_line(), "FATAL EXIT CODE: 2");
    }

    #[test]
    fn solver_failures_exit_with_their_own_code() {
        let error = AemError::solver("RUN.SOLVER_SPAWN", "failed to launch solver 'aem.exe'");
        assert_eq!(error.category(), AemErrorCategory::Solver);
        assert_eq!(error.exit_code(), 4);
        assert_eq!(
            error.to_string(),
            "solver error [RUN.SOLVER_SPAWN] failed to launch solver 'aem.exe'"
        );
    }
}
