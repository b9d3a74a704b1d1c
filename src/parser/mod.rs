//! Parser module building the node arena from tokens.
//!
//! This module contains the parser that transforms a stream of tokens
//! into the arena AST. It uses a Pratt parser for expressions with proper
//! operator precedence and handles:
//!
//! - Top-level declarations (globals, functions, states, event handlers)
//! - Statement parsing (declarations, control flow, jumps and labels)
//! - Expression parsing (operators, casts, calls, vector and list literals)
//! - Error recovery, so that one broken statement does not hide the rest
//!
//! Every code scope gets a unique id from a counter owned by the parser.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;
