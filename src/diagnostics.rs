//! Compilation diagnostics.
//!
//! The compiler never prints: every structural problem, capacity overflow,
//! and shadowing warning is collected into a [`Diagnostic`] list for the
//! caller to render. The core carries no source text, so context is given
//! as rule indices and condition names rather than byte spans.

/// How serious a diagnostic is. Errors suppress table encoding for the
/// automata they touch; warnings never block anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Stable machine-readable code for each diagnostic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    /// A macro expands to itself, directly or transitively.
    CyclicMacro,
    /// A pattern references a macro name with no definition.
    UnknownMacro,
    /// Malformed quantifier bounds (`min > max`).
    InvalidExpression,
    /// Rules sharing an action id declare conflicting action result types.
    AmbiguousAction,
    /// An action id exceeds the packed table ceiling.
    InvalidAction,
    /// A rule names a start condition that was never declared.
    UndeclaredCondition,
    /// Combined minimized state count exceeds the table index ceiling.
    TooManyStates,
    /// A rule is fully shadowed by earlier rules and can never produce a match.
    UnmatchableRule,
    /// A rule's pattern can match the empty string; the runtime will never
    /// return the empty match.
    EmptyMatch,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::CyclicMacro => "INVALID_MACRO",
            DiagnosticCode::UnknownMacro => "INVALID_MACRO_NAME",
            DiagnosticCode::InvalidExpression => "INVALID_EXPRESSION",
            DiagnosticCode::AmbiguousAction => "AMBIGUOUS_ACTION",
            DiagnosticCode::InvalidAction => "INVALID_ACTION",
            DiagnosticCode::UndeclaredCondition => "UNDECLARED_CONDITION",
            DiagnosticCode::TooManyStates => "TOO_MANY_STATES",
            DiagnosticCode::UnmatchableRule => "UNMATCHABLE_RULE",
            DiagnosticCode::EmptyMatch => "EMPTY_MATCH",
        }
    }
}

/// One collected diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    /// Human-readable description.
    pub message: String,
    /// Index of the rule this diagnostic is about, if any.
    pub rule: Option<usize>,
    /// Start condition this diagnostic is about, if any.
    pub condition: Option<String>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            rule: None,
            condition: None,
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            code,
            message: message.into(),
            rule: None,
            condition: None,
        }
    }

    pub fn with_rule(mut self, rule: usize) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]", kind, self.code.as_str())?;
        if let Some(rule) = self.rule {
            write!(f, " rule {}", rule)?;
        }
        if let Some(condition) = &self.condition {
            write!(f, " in <{}>", condition)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Whether any diagnostic in the list is an error.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
