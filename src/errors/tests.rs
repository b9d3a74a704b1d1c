//! Unit tests for error handling.
//!
//! This module contains tests for diagnostics, sinks and compiler errors.

use crate::errors::errors::{
    CompilerError, Diagnostic, DiagnosticCode, DiagnosticKind, DiagnosticSink, ErrorTip,
    LoggingSink, Severity,
};
use crate::{Position, Span};

fn span_at(line: u32, column: u32) -> Span {
    let position = Position::new(0, line, column);
    Span::new(position, position)
}

#[test]
fn test_diagnostic_creation() {
    let diagnostic = Diagnostic::new(
        DiagnosticKind::UnrecognisedToken {
            token: "#".to_string(),
        },
        span_at(3, 7),
    );

    assert_eq!(diagnostic.get_error_name(), "UnrecognisedToken");
    assert_eq!(diagnostic.line(), 3);
    assert_eq!(diagnostic.column(), 7);
    assert_eq!(diagnostic.code(), DiagnosticCode::SyntaxError);
    assert!(diagnostic.is_error());
}

#[test]
fn test_assignment_code_is_distinct() {
    let diagnostic = Diagnostic::new(
        DiagnosticKind::AssignmentToNonAssignable {
            message: "mismatched input '='".to_string(),
        },
        span_at(1, 0),
    );

    assert_eq!(diagnostic.code(), DiagnosticCode::AssignmentToNonAssignable);
    assert!(matches!(diagnostic.get_tip(), ErrorTip::Suggestion(_)));
}

#[test]
fn test_semantic_code() {
    let diagnostic = Diagnostic::new(
        DiagnosticKind::VariableNotDeclared {
            variable: "x".to_string(),
        },
        span_at(2, 4),
    );

    assert_eq!(diagnostic.code(), DiagnosticCode::SemanticError);
    assert_eq!(diagnostic.message(), "variable \"x\" not declared");
    assert_eq!(diagnostic.to_string(), "(2:4) variable \"x\" not declared");
}

#[test]
fn test_warnings() {
    let diagnostic = Diagnostic::new(DiagnosticKind::DeadCode, span_at(1, 0));

    assert_eq!(diagnostic.severity(), Severity::Warning);
    assert_eq!(diagnostic.code(), DiagnosticCode::Warning);
    assert!(!diagnostic.is_error());
}

#[test]
fn test_unexpected_arguments_tip() {
    let diagnostic = Diagnostic::new(
        DiagnosticKind::UnexpectedArguments {
            function: "llSay".to_string(),
            expected: 2,
            received: 1,
        },
        span_at(1, 0),
    );

    assert_eq!(
        diagnostic.get_tip().to_string(),
        "Expected 2 arguments, received 1"
    );
}

#[test]
fn test_sinks() {
    let mut collected: Vec<Diagnostic> = vec![];
    collected.report(Diagnostic::new(DiagnosticKind::MissingDefaultState, span_at(1, 0)));
    assert_eq!(collected.len(), 1);

    let mut logging = LoggingSink::default();
    logging.report(Diagnostic::new(DiagnosticKind::MissingDefaultState, span_at(1, 0)));
    logging.report(Diagnostic::new(DiagnosticKind::DeadCode, span_at(2, 0)));
    assert_eq!(logging.errors, 1);
    assert_eq!(logging.warnings, 1);
}

#[test]
fn test_compiler_error_from_io() {
    let error: CompilerError =
        std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();

    assert!(matches!(error, CompilerError::Io(_)));
    assert_eq!(error.to_string(), "missing");
}
