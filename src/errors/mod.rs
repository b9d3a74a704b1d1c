//! Error types and error handling for the compiler.
//!
//! Two channels are kept apart:
//!
//! - `Diagnostic` values describe problems in the script being compiled.
//!   They carry a source span, a severity and a code, and are accumulated
//!   through a `DiagnosticSink` without ever stopping a pass.
//! - `CompilerError` describes misuse of the compiler itself (generating
//!   code for a broken tree, malformed library data, bad settings). It is
//!   returned immediately through `Result`.

pub mod errors;

#[cfg(test)]
mod tests;
