//! Semantic validation of parsed scripts.
//!
//! The validator walks the arena once, depth first, and:
//!
//! - resolves variables, calls, state changes and jumps, recording every
//!   use on the declaration it resolves to
//! - computes the static type of every expression from the operator tables
//! - classifies unreachable statements for warnings and code generation
//! - classifies raw grammar errors into diagnostics
//!
//! Problems are reported to a `DiagnosticSink` and never stop the pass.

pub mod dead_code;
pub mod operators;
pub mod validator;

#[cfg(test)]
mod tests;
