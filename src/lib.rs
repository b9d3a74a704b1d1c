#![allow(clippy::module_inception)]

use std::{fmt::Write as _, io::Write};

use crate::{
    ast::ast::Ast,
    compiler::{compiler::compile, settings::CompilerSettings},
    errors::errors::{CompilerError, Diagnostic, DiagnosticSink, ErrorTip},
    library::provider::LibraryDataProvider,
    validator::validator::validate_source,
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod lexer;
pub mod library;
pub mod macros;
pub mod parser;
pub mod signatures;
pub mod validator;

extern crate regex;

/// A location in the source text. `line` is 1-based, `column` is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(offset: u32, line: u32, column: u32) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }

    pub fn null() -> Self {
        Position::new(0, 1, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };

        Span { start, end }
    }
}

/// Finds the line containing a byte offset.
///
/// Returns the 1-based line number, the line text and the offset of
/// `position` within that line.
pub fn get_line_at_position(source: &str, position: u32) -> Option<(usize, String, usize)> {
    let pos = position as usize;

    if pos > source.len() {
        return None;
    }

    let mut start = 0;
    let mut line_number = 1;

    for line in source.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return Some((line_number, line.to_string(), pos - start));
        }

        start = end;
        line_number += 1;
    }

    // Offset sits exactly at the end of the text.
    if source.is_empty() || source.ends_with('\n') {
        return Some((line_number, String::new(), 0));
    }
    let last = source.rsplit('\n').next().unwrap_or("");
    Some((line_number - 1, last.to_string(), last.len()))
}

/// Renders a diagnostic with the offending line and a caret under the column.
///
/// ```text
/// error: message
/// -> script.lsl
///    |
/// 20 | integer a = #;
///    | ------------^
/// ```
pub fn display_diagnostic(diagnostic: &Diagnostic, source: &str, file_name: &str) -> String {
    let mut out = String::new();
    let span = diagnostic.get_span();

    let label = if diagnostic.is_error() { "Error" } else { "Warning" };
    if let ErrorTip::None = diagnostic.get_tip() {
        let _ = writeln!(out, "{}: {}", label, diagnostic.get_error_name());
    } else {
        let _ = writeln!(
            out,
            "{}: {} ({})",
            label,
            diagnostic.get_error_name(),
            diagnostic.get_tip()
        );
    }
    let _ = writeln!(
        out,
        "-> {}:{}:{}",
        file_name,
        diagnostic.line(),
        diagnostic.column()
    );

    let Some((line, line_text, line_pos)) = get_line_at_position(source, span.start.offset)
    else {
        let _ = writeln!(out, "   {}", diagnostic.message());
        return out;
    };

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    let _ = writeln!(out, "{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    let _ = writeln!(out, "{} | {}", line_string, line_text_removed.trim_end());

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;
    let _ = writeln!(out, "{:>padding$} {:->arrows$} {}", "|", "^", diagnostic.message());

    out
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let start = string
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count();

    (String::from(&string[start..]), start)
}

/// Parses and validates `source`, then generates code into `writer` when no
/// errors were reported. Returns the validated tree.
pub fn compile_source<W: Write>(
    source: &str,
    library: &dyn LibraryDataProvider,
    settings: &CompilerSettings,
    sink: &mut dyn DiagnosticSink,
    writer: &mut W,
) -> Result<Ast, CompilerError> {
    let ast = validate_source(source, library, sink);

    if ast.has_errors() {
        log::info!("skipping code generation, script has errors");
        return Ok(ast);
    }

    compile(&ast, library, settings, writer)?;
    Ok(ast)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line_at_position() {
        let source = "Hello, world!\nline two\n\nTesting { }\n";

        let (line_number, line, line_pos) = super::get_line_at_position(source, 10).unwrap();
        assert_eq!(line_number, 1);
        assert_eq!(line, "Hello, world!\n");
        assert_eq!(line_pos, 10);

        let (line_number, line, line_pos) = super::get_line_at_position(source, 32).unwrap();
        assert_eq!(line_number, 4);
        assert_eq!(line, "Testing { }\n");
        assert_eq!(line_pos, 8);

        assert!(super::get_line_at_position(source, 1000).is_none());
    }

    #[test]
    fn test_span_merge() {
        let a = super::Span::new(super::Position::new(4, 1, 4), super::Position::new(8, 1, 8));
        let b = super::Span::new(super::Position::new(0, 1, 0), super::Position::new(6, 1, 6));

        let merged = a.merge(&b);
        assert_eq!(merged.start.offset, 0);
        assert_eq!(merged.end.offset, 8);
    }
}
