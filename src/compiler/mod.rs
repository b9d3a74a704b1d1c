//! Code generation module for the compiler.
//!
//! Turns a validated tree into C# source for the OpenSim script runtime.
//! It handles:
//!
//! - Compilation of expressions and statements
//! - Conversion from script types to runtime types
//! - Boxing of literals and the binary operator stubs
//! - The class wrapper, global variables and co-op termination calls

pub mod compiler;
pub mod expr;
pub mod settings;
pub mod stmt;
pub mod utilities;

#[cfg(test)]
mod tests;
