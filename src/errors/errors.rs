use std::fmt::Display;

use thiserror::Error;

use crate::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Coarse classification used by callers to tell diagnostics apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCode {
    SyntaxError,
    AssignmentToNonAssignable,
    SemanticError,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    internal_error: DiagnosticKind,
    span: Span,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span) -> Self {
        Diagnostic {
            internal_error: kind,
            span,
        }
    }

    pub fn kind(&self) -> &DiagnosticKind {
        &self.internal_error
    }

    pub fn get_span(&self) -> &Span {
        &self.span
    }

    pub fn line(&self) -> u32 {
        self.span.start.line
    }

    pub fn column(&self) -> u32 {
        self.span.start.column
    }

    pub fn message(&self) -> String {
        self.internal_error.to_string()
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    pub fn severity(&self) -> Severity {
        match self.internal_error {
            DiagnosticKind::DeadCode
            | DiagnosticKind::ReturnValueFromEventHandler { .. }
            | DiagnosticKind::UnusedLocalVariable { .. }
            | DiagnosticKind::DeprecatedFunction { .. }
            | DiagnosticKind::StateChangeInFunction { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self.internal_error {
            DiagnosticKind::AssignmentToNonAssignable { .. } => {
                DiagnosticCode::AssignmentToNonAssignable
            }
            DiagnosticKind::UnrecognisedToken { .. }
            | DiagnosticKind::UnterminatedString
            | DiagnosticKind::UnterminatedComment
            | DiagnosticKind::GrammarError { .. } => DiagnosticCode::SyntaxError,
            _ if self.severity() == Severity::Warning => DiagnosticCode::Warning,
            _ => DiagnosticCode::SemanticError,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            DiagnosticKind::UnrecognisedToken { .. } => "UnrecognisedToken",
            DiagnosticKind::UnterminatedString => "UnterminatedString",
            DiagnosticKind::UnterminatedComment => "UnterminatedComment",
            DiagnosticKind::GrammarError { .. } => "SyntaxError",
            DiagnosticKind::AssignmentToNonAssignable { .. } => "AssignmentToNonAssignable",
            DiagnosticKind::VariableNotDeclared { .. } => "VariableNotDeclared",
            DiagnosticKind::VariableUsedBeforeDeclaration { .. } => {
                "VariableUsedBeforeDeclaration"
            }
            DiagnosticKind::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            DiagnosticKind::ParameterAlreadyDeclared { .. } => "ParameterAlreadyDeclared",
            DiagnosticKind::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            DiagnosticKind::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            DiagnosticKind::LibraryFunctionRedefined { .. } => "LibraryFunctionRedefined",
            DiagnosticKind::LibraryConstantRedefined { .. } => "LibraryConstantRedefined",
            DiagnosticKind::StateNotDeclared { .. } => "StateNotDeclared",
            DiagnosticKind::StateAlreadyDeclared { .. } => "StateAlreadyDeclared",
            DiagnosticKind::MissingDefaultState => "MissingDefaultState",
            DiagnosticKind::StateWithoutEventHandlers { .. } => "StateWithoutEventHandlers",
            DiagnosticKind::UnknownEventHandler { .. } => "UnknownEventHandler",
            DiagnosticKind::EventHandlerAlreadyDeclared { .. } => "EventHandlerAlreadyDeclared",
            DiagnosticKind::EventHandlerSignatureMismatch { .. } => {
                "EventHandlerSignatureMismatch"
            }
            DiagnosticKind::LabelNotDeclared { .. } => "LabelNotDeclared",
            DiagnosticKind::LabelAlreadyDeclared { .. } => "LabelAlreadyDeclared",
            DiagnosticKind::JumpIntoNestedScope { .. } => "JumpIntoNestedScope",
            DiagnosticKind::UnexpectedArguments { .. } => "UnexpectedArguments",
            DiagnosticKind::ArgumentTypeMatchError { .. } => "ArgumentTypeMatchError",
            DiagnosticKind::NoMatchingOverload { .. } => "NoMatchingOverload",
            DiagnosticKind::InvalidBinaryOperation { .. } => "InvalidBinaryOperation",
            DiagnosticKind::InvalidPrefixOperation { .. } => "InvalidPrefixOperation",
            DiagnosticKind::InvalidPostfixOperation { .. } => "InvalidPostfixOperation",
            DiagnosticKind::InvalidCast { .. } => "InvalidCast",
            DiagnosticKind::InvalidComponentAccess { .. } => "InvalidComponentAccess",
            DiagnosticKind::AssignmentToConstant { .. } => "AssignmentToConstant",
            DiagnosticKind::TypeMatchError { .. } => "TypeMatchError",
            DiagnosticKind::ReturnTypeMatchError { .. } => "ReturnTypeMatchError",
            DiagnosticKind::ReturnValueFromVoidFunction { .. } => "ReturnValueFromVoidFunction",
            DiagnosticKind::MissingReturnValue { .. } => "MissingReturnValue",
            DiagnosticKind::NotAllCodePathsReturn { .. } => "NotAllCodePathsReturn",
            DiagnosticKind::VoidCondition => "VoidCondition",
            DiagnosticKind::NonConstantGlobalInitializer { .. } => {
                "NonConstantGlobalInitializer"
            }
            DiagnosticKind::DeadCode => "DeadCode",
            DiagnosticKind::ReturnValueFromEventHandler { .. } => "ReturnValueFromEventHandler",
            DiagnosticKind::UnusedLocalVariable { .. } => "UnusedLocalVariable",
            DiagnosticKind::DeprecatedFunction { .. } => "DeprecatedFunction",
            DiagnosticKind::StateChangeInFunction { .. } => "StateChangeInFunction",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            DiagnosticKind::UnterminatedString => {
                ErrorTip::Suggestion(String::from("add the closing `\"`"))
            }
            DiagnosticKind::UnterminatedComment => {
                ErrorTip::Suggestion(String::from("add the closing `*/`"))
            }
            DiagnosticKind::AssignmentToNonAssignable { .. } => ErrorTip::Suggestion(
                String::from("only variables and their components can be assigned to"),
            ),
            DiagnosticKind::VariableUsedBeforeDeclaration { variable } => {
                ErrorTip::Suggestion(format!(
                    "global `{}` must be declared before the global that uses it",
                    variable
                ))
            }
            DiagnosticKind::MissingDefaultState => {
                ErrorTip::Suggestion(String::from("add a `default { ... }` state"))
            }
            DiagnosticKind::StateWithoutEventHandlers { state } => ErrorTip::Suggestion(
                format!("state `{}` needs at least one event handler", state),
            ),
            DiagnosticKind::EventHandlerSignatureMismatch { expected, .. } => {
                ErrorTip::Suggestion(format!("expected `{}`", expected))
            }
            DiagnosticKind::UnexpectedArguments {
                expected, received, ..
            } => ErrorTip::Suggestion(format!(
                "Expected {} arguments, received {}",
                expected, received
            )),
            DiagnosticKind::InvalidCast { from, to } => ErrorTip::Suggestion(format!(
                "`{}` cannot be converted to `{}`",
                from, to
            )),
            DiagnosticKind::NotAllCodePathsReturn { .. } => ErrorTip::Suggestion(String::from(
                "add a return statement at the end of the function",
            )),
            DiagnosticKind::NonConstantGlobalInitializer { .. } => ErrorTip::Suggestion(
                String::from("globals may only be initialized with literals or other globals"),
            ),
            DiagnosticKind::JumpIntoNestedScope { .. } => ErrorTip::Suggestion(String::from(
                "move the label into the jump's block or a block that encloses it",
            )),
            DiagnosticKind::DeadCode => {
                ErrorTip::Suggestion(String::from("this code can never be reached"))
            }
            _ => ErrorTip::None,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}:{}) {}",
            self.span.start.line, self.span.start.column, self.internal_error
        )
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    // Grammar level
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("{message}")]
    GrammarError { message: String },
    #[error("assignment to non-assignable expression ({message})")]
    AssignmentToNonAssignable { message: String },

    // Semantic
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("global variable {variable:?} used before its declaration")]
    VariableUsedBeforeDeclaration { variable: String },
    #[error("variable {variable:?} already declared")]
    VariableAlreadyDeclared { variable: String },
    #[error("parameter {parameter:?} already declared")]
    ParameterAlreadyDeclared { parameter: String },
    #[error("function {function:?} not declared")]
    FunctionNotDeclared { function: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("function {function:?} is already defined by the library")]
    LibraryFunctionRedefined { function: String },
    #[error("{constant:?} is already defined as a library constant")]
    LibraryConstantRedefined { constant: String },
    #[error("state {state:?} not declared")]
    StateNotDeclared { state: String },
    #[error("state {state:?} already declared")]
    StateAlreadyDeclared { state: String },
    #[error("missing default state")]
    MissingDefaultState,
    #[error("state {state:?} has no event handlers")]
    StateWithoutEventHandlers { state: String },
    #[error("unknown event handler {event:?}")]
    UnknownEventHandler { event: String },
    #[error("event handler {event:?} already declared in state {state:?}")]
    EventHandlerAlreadyDeclared { event: String, state: String },
    #[error("event handler signature {given:?} does not match {expected:?}")]
    EventHandlerSignatureMismatch { given: String, expected: String },
    #[error("label {label:?} not declared")]
    LabelNotDeclared { label: String },
    #[error("label {label:?} already declared")]
    LabelAlreadyDeclared { label: String },
    #[error("cannot jump to label {label:?} inside a nested block")]
    JumpIntoNestedScope { label: String },
    #[error("call to {function:?}: expected {expected} arguments, received {received}")]
    UnexpectedArguments {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("call to {function:?}: argument {index} expected {expected}, received {received}")]
    ArgumentTypeMatchError {
        function: String,
        index: usize,
        expected: String,
        received: String,
    },
    #[error("no overload of {function:?} accepts ({arguments})")]
    NoMatchingOverload { function: String, arguments: String },
    #[error("operator {operator:?} cannot be applied to {left} and {right}")]
    InvalidBinaryOperation {
        left: String,
        operator: String,
        right: String,
    },
    #[error("prefix operator {operator:?} cannot be applied to {operand}")]
    InvalidPrefixOperation { operator: String, operand: String },
    #[error("postfix operator {operator:?} cannot be applied to {operand}")]
    InvalidPostfixOperation { operator: String, operand: String },
    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: String, to: String },
    #[error("component {component:?} does not exist on {type_}")]
    InvalidComponentAccess { component: String, type_: String },
    #[error("cannot assign to library constant {constant:?}")]
    AssignmentToConstant { constant: String },
    #[error("types do not match: expected {expected}, received {received}")]
    TypeMatchError { expected: String, received: String },
    #[error("return types do not match: expected {expected}, received {received}")]
    ReturnTypeMatchError { expected: String, received: String },
    #[error("function {function:?} does not return a value")]
    ReturnValueFromVoidFunction { function: String },
    #[error("function {function:?} must return a value")]
    MissingReturnValue { function: String },
    #[error("not all code paths in {function:?} return a value")]
    NotAllCodePathsReturn { function: String },
    #[error("condition expression has no value")]
    VoidCondition,
    #[error("global variable {variable:?} must be initialized with a constant expression")]
    NonConstantGlobalInitializer { variable: String },

    // Warnings
    #[error("unreachable code detected")]
    DeadCode,
    #[error("value returned from event handler {event:?} is discarded")]
    ReturnValueFromEventHandler { event: String },
    #[error("local variable {variable:?} is never used")]
    UnusedLocalVariable { variable: String },
    #[error("library function {function:?} is deprecated")]
    DeprecatedFunction { function: String },
    #[error("state change inside function {function:?}")]
    StateChangeInFunction { function: String },
}

/// Raw grammar-level error, produced by the lexer and parser before it is
/// classified into a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub offending_symbol: String,
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnrecognisedToken,
    UnterminatedString,
    UnterminatedComment,
    Grammar,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, offending_symbol: &str, message: String, span: Span) -> Self {
        SyntaxError {
            kind,
            offending_symbol: offending_symbol.to_string(),
            message,
            span,
        }
    }

    pub fn grammar(offending_symbol: &str, message: String, span: Span) -> Self {
        SyntaxError::new(SyntaxErrorKind::Grammar, offending_symbol, message, span)
    }
}

/// Receives diagnostics as they are produced.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Sink that forwards every diagnostic to the `log` facade.
#[derive(Debug, Default)]
pub struct LoggingSink {
    pub errors: usize,
    pub warnings: usize,
}

impl DiagnosticSink for LoggingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.errors += 1;
            log::error!("{}", diagnostic);
        } else {
            self.warnings += 1;
            log::warn!("{}", diagnostic);
        }
    }
}

/// Failures that indicate misuse of the compiler rather than a problem in
/// the script.
#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid symbol name {name:?}")]
    InvalidSymbolName { name: String },
    #[error("invalid subset name {name:?}")]
    InvalidSubsetName { name: String },
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("duplicate library signature {0:?}")]
    DuplicateSignature(String),
    #[error("library data error at line {line}: {message}")]
    LibraryData { line: usize, message: String },
    #[error("invalid compiler setting {setting}: {message}")]
    InvalidSetting { setting: String, message: String },
    #[error("internal compiler error: {0}")]
    Internal(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
