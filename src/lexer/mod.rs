//! Lexical analysis module for the compiler.
//!
//! This module contains the lexer (tokenizer) that converts script source
//! into a stream of tokens for parsing. It handles:
//!
//! - Tokenization of source code using anchored regex patterns
//! - Recognition of keywords, type names, identifiers, literals and operators
//! - Line and column tracking for diagnostics
//! - Comments and whitespace handling
//!
//! Lexical errors do not stop tokenization; they are returned next to the
//! token stream.

pub mod lexer;
pub mod tokens;
