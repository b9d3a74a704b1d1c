//! Type parsing implementation.
//!
//! Script types are single keywords, so no lookup tables are needed; the
//! keyword is mapped straight onto `LslType`.

use crate::{ast::types::LslType, errors::errors::SyntaxError, lexer::tokens::TokenKind};

use super::parser::Parser;

/// Consumes a type keyword.
pub fn parse_type(parser: &mut Parser) -> Result<LslType, SyntaxError> {
    let token = parser.expect(TokenKind::Type)?;

    LslType::from_keyword(&token.value).ok_or_else(|| {
        SyntaxError::grammar(
            &token.value,
            format!("mismatched input '{}' expecting TYPE", token.value),
            token.span,
        )
    })
}

/// Whether the tokens ahead start a `TYPE ID (` function header.
pub fn at_function_header(parser: &Parser) -> bool {
    match parser.current_token_kind() {
        TokenKind::Type => {
            parser.peek_kind(1) == TokenKind::Identifier
                && parser.peek_kind(2) == TokenKind::OpenParen
        }
        TokenKind::Identifier => parser.peek_kind(1) == TokenKind::OpenParen,
        _ => false,
    }
}
