//! Parser implementation for building the node arena.
//!
//! This module contains the main Parser struct and the parsing entry
//! points. The parser uses a Pratt parser approach with NUD/LED handlers
//! for expression parsing and specialized functions for statements and
//! top-level declarations.
//!
//! It maintains lookup tables for:
//! - Statement handlers
//! - NUD (null denotation) handlers for prefix expressions
//! - LED (left denotation) handlers for infix and postfix expressions
//! - Binding powers for operator precedence

use std::collections::HashMap;

use crate::{
    ast::{
        ast::{Ast, NodeId, NodeKind},
        declarations::ErrorContext,
        expressions::Expr,
        statements::Stmt,
    },
    errors::errors::SyntaxError,
    lexer::tokens::{Token, TokenKind},
    Position, Span,
};

use super::{
    expr::parse_expr,
    lookups::{
        create_token_lookups, BPLookup, BindingPower, LEDHandler, LEDLookup, NUDHandler,
        NUDLookup, StmtHandler, StmtLookup,
    },
    stmt::parse_compilation_unit,
};

/// The main parser structure that maintains parsing state.
///
/// Besides the token stream and lookup tables it owns the arena the tree
/// is built into, and the syntax errors reported while recovering.
pub struct Parser {
    /// The list of tokens to parse, always ending with `EOF`
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
    /// Arena receiving every node built
    ast: Ast,
    /// Errors reported by recovering handlers
    errors: Vec<SyntaxError>,
    stmt_lookup: StmtLookup,
    nud_lookup: NUDLookup,
    led_lookup: LEDLookup,
    binding_power_lookup: BPLookup,
    /// Counter for code scope ids
    current_id: u32,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::EOF) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or_else(Position::null);
            tokens.push(Token {
                kind: TokenKind::EOF,
                value: String::from("<EOF>"),
                span: Span::new(end, end),
            });
        }

        Parser {
            tokens,
            pos: 0,
            ast: Ast::new(),
            errors: vec![],
            stmt_lookup: HashMap::new(),
            nud_lookup: HashMap::new(),
            led_lookup: HashMap::new(),
            binding_power_lookup: HashMap::new(),
            current_id: 1024, // Give some space for reserved ids
        }
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        self.peek(0)
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.current_token().kind
    }

    /// Token `offset` places ahead, clamped to the final `EOF`.
    pub fn peek(&self, offset: usize) -> &Token {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    pub fn peek_kind(&self, offset: usize) -> TokenKind {
        self.peek(offset).kind
    }

    /// Advances to the next token and returns the previous token. `EOF` is
    /// never stepped over.
    pub fn advance(&mut self) -> Token {
        let token = self.current_token().clone();
        if token.kind != TokenKind::EOF {
            self.pos += 1;
        }
        token
    }

    /// Expects a token of the specified kind, with optional custom error.
    pub fn expect_error(
        &mut self,
        expected_kind: TokenKind,
        error: Option<SyntaxError>,
    ) -> Result<Token, SyntaxError> {
        if self.current_token_kind() != expected_kind {
            match error {
                Some(error) => Err(error),
                None => Err(self.mismatched(expected_kind.grammar_name())),
            }
        } else {
            Ok(self.advance())
        }
    }

    /// Expects a token of the specified kind with default error message.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, SyntaxError> {
        self.expect_error(expected_kind, None)
    }

    /// Grammar error at the current token listing what was expected.
    pub fn mismatched(&self, expecting: &str) -> SyntaxError {
        let token = self.current_token();
        let message = if token.kind == TokenKind::EOF {
            format!("missing {} at '<EOF>'", expecting)
        } else {
            format!("mismatched input '{}' expecting {}", token.value, expecting)
        };
        SyntaxError::grammar(&token.value, message, token.span)
    }

    pub fn has_tokens(&self) -> bool {
        self.current_token_kind() != TokenKind::EOF
    }

    pub fn get_stmt_lookup(&self) -> &StmtLookup {
        &self.stmt_lookup
    }

    pub fn get_nud_lookup(&self) -> &NUDLookup {
        &self.nud_lookup
    }

    pub fn get_led_lookup(&self) -> &LEDLookup {
        &self.led_lookup
    }

    pub fn get_bp_lookup(&self) -> &BPLookup {
        &self.binding_power_lookup
    }

    /// Binding power of a token kind, `Default` when it is no operator.
    pub fn binding_power(&self, kind: TokenKind) -> BindingPower {
        self.binding_power_lookup
            .get(&kind)
            .copied()
            .unwrap_or(BindingPower::Default)
    }

    /// Registers a left denotation (infix) handler for a token.
    pub fn led(&mut self, kind: TokenKind, binding_power: BindingPower, led_fn: LEDHandler) {
        self.binding_power_lookup.insert(kind, binding_power);
        self.led_lookup.insert(kind, led_fn);
    }

    /// Registers a null denotation (prefix) handler for a token.
    pub fn nud(&mut self, kind: TokenKind, nud_fn: NUDHandler) {
        self.nud_lookup.insert(kind, nud_fn);
    }

    /// Registers a statement handler for a token.
    pub fn stmt(&mut self, kind: TokenKind, stmt_fn: StmtHandler) {
        self.stmt_lookup.insert(kind, stmt_fn);
    }

    /// Advances the scope id counter and returns the previous value.
    pub fn advance_id(&mut self) -> u32 {
        let id = self.current_id;
        self.current_id += 1;
        id
    }

    /// Start of the current token.
    pub fn get_position(&self) -> Position {
        self.current_token().span.start
    }

    /// End of the most recently consumed token.
    pub fn previous_end(&self) -> Position {
        if self.pos == 0 {
            return self.get_position();
        }
        self.tokens[self.pos - 1].span.end
    }

    /// Span from `start` to the end of the last consumed token.
    pub fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.previous_end())
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn add(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.ast.add(kind, Some(span))
    }

    pub fn add_expr(&mut self, expr: Expr, span: Span) -> NodeId {
        self.add(NodeKind::Expr(expr), span)
    }

    pub fn add_stmt(&mut self, stmt: Stmt, span: Span) -> NodeId {
        self.add(NodeKind::Stmt(stmt), span)
    }

    pub fn add_error(&mut self, context: ErrorContext, span: Span) -> NodeId {
        self.ast.add_error(context, Some(span))
    }

    pub fn node_span(&self, id: NodeId) -> Span {
        self.ast.span(id)
    }

    pub fn report(&mut self, error: SyntaxError) {
        log::debug!("syntax error: {}", error.message);
        self.errors.push(error);
    }

    fn finish(self) -> (Ast, Vec<SyntaxError>) {
        (self.ast, self.errors)
    }
}

fn new_parser(tokens: Vec<Token>) -> Parser {
    let mut parser = Parser::new(tokens);
    create_token_lookups(&mut parser);
    parser
}

/// Parses a whole script.
///
/// A tree is always produced: failed constructs become error nodes, and
/// every error is returned alongside the tree.
pub fn parse(tokens: Vec<Token>) -> (Ast, Vec<SyntaxError>) {
    let mut parser = new_parser(tokens);

    let root = parse_compilation_unit(&mut parser);
    parser.ast.set_root(root);

    parser.finish()
}

/// Parses a single expression making up the whole token stream. The
/// expression node is the root of the returned tree.
pub fn parse_expression(tokens: Vec<Token>) -> Result<Ast, SyntaxError> {
    let mut parser = new_parser(tokens);

    let expr = parse_expr(&mut parser, BindingPower::Default)?;
    parser.expect(TokenKind::EOF)?;
    parser.ast.set_root(expr);

    let (ast, _) = parser.finish();
    Ok(ast)
}
