use crate::{
    ast::{
        ast::{NodeId, NodeKind},
        declarations::{
            CompilationUnit, ErrorContext, EventHandlerDecl, FunctionDecl, Parameter,
            ParameterList, StateDecl,
        },
        expressions::ExpressionListKind,
        statements::{
            CodeScope, CodeScopeType, ConditionalBranch, ControlStmt, DoLoop, ElseBranch,
            ExpressionStmt, ForLoop, JumpStmt, LabelStmt, ReturnStmt, StateChangeStmt, Stmt,
            VarDecl, WhileLoop,
        },
        types::LslType,
    },
    errors::errors::SyntaxError,
    lexer::tokens::TokenKind,
    parser::{
        expr::{parse_expr, parse_expression_list},
        lookups::BindingPower,
    },
    Position, Span,
};

use super::{
    parser::Parser,
    types::{at_function_header, parse_type},
};

const TOP_LEVEL_START: &str = "{TYPE, ID, 'default'}";
const STATE_START: &str = "{'state', <EOF>}";

pub fn parse_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    if let Some(handler) = parser
        .get_stmt_lookup()
        .get(&parser.current_token_kind())
        .copied()
    {
        return handler(parser);
    }

    let expression = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(parser.node_span(expression).start);
    Ok(parser.add_stmt(Stmt::Expression(ExpressionStmt { expression }), span))
}

/// Skips to the end of a broken statement: past the next `;`, past a
/// balanced `{ }` block, or up to the `}` closing the enclosing scope.
fn synchronize_statement(parser: &mut Parser) {
    let mut depth = 0usize;

    loop {
        match parser.current_token_kind() {
            TokenKind::EOF => return,
            TokenKind::Semicolon if depth == 0 => {
                parser.advance();
                return;
            }
            TokenKind::OpenCurly => depth += 1,
            TokenKind::CloseCurly => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                if depth == 0 {
                    parser.advance();
                    if parser.current_token_kind() != TokenKind::Else {
                        return;
                    }
                    continue;
                }
            }
            _ => {}
        }
        parser.advance();
    }
}

/// Skips a broken top-level construct: past a `;` or a balanced block.
/// Always consumes at least one token when not at the end.
fn synchronize_top_level(parser: &mut Parser) {
    let mut depth = 0usize;
    let mut consumed = false;

    loop {
        match parser.current_token_kind() {
            TokenKind::EOF => return,
            TokenKind::Semicolon if depth == 0 => {
                parser.advance();
                return;
            }
            TokenKind::OpenCurly => depth += 1,
            TokenKind::CloseCurly => {
                if depth <= 1 {
                    parser.advance();
                    return;
                }
                depth -= 1;
            }
            TokenKind::Type | TokenKind::Identifier | TokenKind::Default | TokenKind::State
                if depth == 0 && consumed =>
            {
                return
            }
            _ => {}
        }
        parser.advance();
        consumed = true;
    }
}

/// `{ statements }`, recovering from broken statements inside.
pub fn parse_code_scope(
    parser: &mut Parser,
    scope_type: CodeScopeType,
) -> Result<NodeId, SyntaxError> {
    let start = parser.expect(TokenKind::OpenCurly)?.span.start;
    let scope_id = parser.advance_id();
    let mut statements = vec![];

    while parser.current_token_kind() != TokenKind::CloseCurly && parser.has_tokens() {
        let statement_start = parser.get_position();
        match parse_stmt(parser) {
            Ok(statement) => statements.push(statement),
            Err(error) => {
                parser.report(error);
                synchronize_statement(parser);
                let span = error_span(parser, statement_start);
                statements.push(parser.add_error(ErrorContext::Statement, span));
            }
        }
    }

    parser.expect(TokenKind::CloseCurly)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(
        Stmt::CodeScope(CodeScope {
            statements,
            scope_id,
            scope_type,
            is_single_statement: false,
        }),
        span,
    ))
}

fn error_span(parser: &Parser, start: Position) -> Span {
    let end = parser.previous_end();
    if end.offset < start.offset {
        Span::new(start, start)
    } else {
        Span::new(start, end)
    }
}

/// Body of a control statement. A body without braces is wrapped in a
/// single statement scope; a declaration is not allowed there.
fn parse_body(parser: &mut Parser, scope_type: CodeScopeType) -> Result<NodeId, SyntaxError> {
    match parser.current_token_kind() {
        TokenKind::OpenCurly => parse_code_scope(parser, scope_type),
        TokenKind::Type => {
            let token = parser.current_token().clone();
            Err(SyntaxError::grammar(
                &token.value,
                format!(
                    "mismatched input '{}' expecting a statement, declarations need an enclosing '{{'",
                    token.value
                ),
                token.span,
            ))
        }
        _ => {
            let scope_id = parser.advance_id();
            let statement = parse_stmt(parser)?;

            let span = parser.node_span(statement);
            Ok(parser.add_stmt(
                Stmt::CodeScope(CodeScope {
                    statements: vec![statement],
                    scope_id,
                    scope_type,
                    is_single_statement: true,
                }),
                span,
            ))
        }
    }
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    parse_code_scope(parser, CodeScopeType::AnonymousBlock)
}

fn parse_variable_declaration(parser: &mut Parser, is_global: bool) -> Result<NodeId, SyntaxError> {
    let start = parser.get_position();
    let ty = parse_type(parser)?;
    let name = parser.expect(TokenKind::Identifier)?.value;

    let initializer = if parser.current_token_kind() == TokenKind::Assignment {
        parser.advance();
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    parser.expect_error(
        TokenKind::Semicolon,
        Some(parser.mismatched(if initializer.is_some() {
            "';'"
        } else {
            "{'=', ';'}"
        })),
    )?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(
        Stmt::VarDecl(VarDecl {
            ty,
            name,
            initializer,
            references: vec![],
            is_global,
        }),
        span,
    ))
}

pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    parse_variable_declaration(parser, false)
}

fn parse_condition(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    parser.expect(TokenKind::OpenParen)?;
    let condition = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;
    Ok(condition)
}

/// `if` with any `else if` and `else` branches, flattened into one node.
pub fn parse_if_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let condition = parse_condition(parser)?;
    let body = parse_body(parser, CodeScopeType::IfBody)?;
    let span = parser.span_from(start);
    let if_branch = parser.add_stmt(Stmt::If(ConditionalBranch { condition, body }), span);

    let mut else_ifs = vec![];
    let mut else_branch = None;

    while parser.current_token_kind() == TokenKind::Else {
        let else_start = parser.advance().span.start;

        if parser.current_token_kind() == TokenKind::If {
            parser.advance();
            let condition = parse_condition(parser)?;
            let body = parse_body(parser, CodeScopeType::ElseIfBody)?;
            let span = parser.span_from(else_start);
            else_ifs.push(parser.add_stmt(Stmt::ElseIf(ConditionalBranch { condition, body }), span));
        } else {
            let body = parse_body(parser, CodeScopeType::ElseBody)?;
            let span = parser.span_from(else_start);
            else_branch = Some(parser.add_stmt(Stmt::Else(ElseBranch { body }), span));
            break;
        }
    }

    let span = parser.span_from(start);
    Ok(parser.add_stmt(
        Stmt::Control(ControlStmt {
            if_branch,
            else_ifs,
            else_branch,
        }),
        span,
    ))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let condition = parse_condition(parser)?;
    let body = parse_body(parser, CodeScopeType::WhileLoop)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(Stmt::While(WhileLoop { condition, body }), span))
}

pub fn parse_do_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let body = parse_body(parser, CodeScopeType::DoLoop)?;
    parser.expect(TokenKind::While)?;
    let condition = parse_condition(parser)?;
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(Stmt::DoWhile(DoLoop { body, condition }), span))
}

fn parse_optional_list(
    parser: &mut Parser,
    kind: ExpressionListKind,
    terminator: TokenKind,
) -> Result<Option<NodeId>, SyntaxError> {
    if parser.current_token_kind() == terminator {
        return Ok(None);
    }
    parse_expression_list(parser, kind, terminator).map(Some)
}

/// `for (init; condition; afterthought) body`. All three parts are optional.
pub fn parse_for_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;
    parser.expect(TokenKind::OpenParen)?;

    let init = parse_optional_list(parser, ExpressionListKind::ForLoopInit, TokenKind::Semicolon)?;
    parser.expect(TokenKind::Semicolon)?;

    let condition = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::Semicolon)?;

    let afterthought = parse_optional_list(
        parser,
        ExpressionListKind::ForLoopAfterthought,
        TokenKind::CloseParen,
    )?;
    parser.expect(TokenKind::CloseParen)?;

    let body = parse_body(parser, CodeScopeType::ForLoop)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(
        Stmt::For(ForLoop {
            init,
            condition,
            afterthought,
            body,
        }),
        span,
    ))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let value = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(Stmt::Return(ReturnStmt { value }), span))
}

pub fn parse_jump_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;
    let label = parser.expect(TokenKind::Identifier)?.value;
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(
        Stmt::Jump(JumpStmt {
            label,
            target: None,
        }),
        span,
    ))
}

pub fn parse_label_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;
    let name = parser.expect(TokenKind::Identifier)?.value;
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(Stmt::Label(LabelStmt { name, jumps: vec![] }), span))
}

/// `state name;` or `state default;`
pub fn parse_state_change_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let state = match parser.current_token_kind() {
        TokenKind::Default => parser.advance().value,
        TokenKind::Identifier => parser.advance().value,
        _ => return Err(parser.mismatched("{'default', ID}")),
    };
    parser.expect(TokenKind::Semicolon)?;

    let span = parser.span_from(start);
    Ok(parser.add_stmt(
        Stmt::StateChange(StateChangeStmt {
            state,
            target: None,
        }),
        span,
    ))
}

pub fn parse_empty_stmt(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let span = parser.advance().span;
    Ok(parser.add_stmt(Stmt::Empty, span))
}

/// `( TYPE name, ... )`
fn parse_parameter_list(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.expect(TokenKind::OpenParen)?.span.start;
    let mut parameters = vec![];

    if parser.current_token_kind() != TokenKind::CloseParen {
        loop {
            let parameter_start = parser.get_position();
            let ty = parse_type(parser)?;
            let name = parser.expect(TokenKind::Identifier)?.value;

            let span = parser.span_from(parameter_start);
            parameters.push(parser.add(
                NodeKind::Parameter(Parameter {
                    name,
                    ty,
                    references: vec![],
                }),
                span,
            ));

            if parser.current_token_kind() == TokenKind::Comma {
                parser.advance();
                continue;
            }
            break;
        }
    }

    parser.expect_error(TokenKind::CloseParen, Some(parser.mismatched("{',', ')'}")))?;

    let span = parser.span_from(start);
    Ok(parser.add(NodeKind::ParameterList(ParameterList { parameters }), span))
}

/// `[TYPE] name ( parameters ) { body }`
fn parse_function_decl(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.get_position();

    let return_type = if parser.current_token_kind() == TokenKind::Type {
        parse_type(parser)?
    } else {
        LslType::Void
    };
    let name = parser.expect(TokenKind::Identifier)?.value;
    let parameters = parse_parameter_list(parser)?;
    let body = parse_code_scope(parser, CodeScopeType::Function)?;

    let span = parser.span_from(start);
    Ok(parser.add(
        NodeKind::Function(FunctionDecl {
            name,
            return_type,
            parameters,
            body,
            references: vec![],
        }),
        span,
    ))
}

fn parse_event_handler(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.get_position();

    let name = parser.expect(TokenKind::Identifier)?.value;
    let parameters = parse_parameter_list(parser)?;
    let body = parse_code_scope(parser, CodeScopeType::EventHandler)?;

    let span = parser.span_from(start);
    Ok(parser.add(
        NodeKind::EventHandler(EventHandlerDecl {
            name,
            parameters,
            body,
        }),
        span,
    ))
}

/// Skips a broken event handler, stopping before the `}` closing the state.
fn synchronize_event_handler(parser: &mut Parser) {
    let mut depth = 0usize;
    let mut consumed = false;

    loop {
        match parser.current_token_kind() {
            TokenKind::EOF => return,
            TokenKind::OpenCurly => depth += 1,
            TokenKind::CloseCurly => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
                if depth == 0 {
                    parser.advance();
                    return;
                }
            }
            TokenKind::Identifier if depth == 0 && consumed => return,
            _ => {}
        }
        parser.advance();
        consumed = true;
    }
}

/// `default { handlers }` or `state name { handlers }`
fn parse_state(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.get_position();

    let (name, is_default) = if parser.current_token_kind() == TokenKind::Default {
        parser.advance();
        (String::from("default"), true)
    } else {
        parser.expect(TokenKind::State)?;
        let name = parser
            .expect_error(TokenKind::Identifier, Some(parser.mismatched("ID")))?
            .value;
        (name, false)
    };

    parser.expect(TokenKind::OpenCurly)?;

    let mut handlers = vec![];
    while parser.current_token_kind() != TokenKind::CloseCurly && parser.has_tokens() {
        let handler_start = parser.get_position();
        match parse_event_handler(parser) {
            Ok(handler) => handlers.push(handler),
            Err(error) => {
                parser.report(error);
                synchronize_event_handler(parser);
                let span = error_span(parser, handler_start);
                handlers.push(parser.add_error(ErrorContext::EventHandler, span));
            }
        }
    }

    parser.expect(TokenKind::CloseCurly)?;

    let span = parser.span_from(start);
    Ok(parser.add(
        NodeKind::State(StateDecl {
            name,
            is_default,
            handlers,
            references: vec![],
        }),
        span,
    ))
}

/// Globals and functions, then the default state, then other states.
/// Constructs out of that order are reported but still parsed.
pub fn parse_compilation_unit(parser: &mut Parser) -> NodeId {
    let start = parser.get_position();
    let mut unit = CompilationUnit::default();

    while parser.has_tokens() {
        let construct_start = parser.get_position();
        let seen_default = unit.default_state.is_some();

        let result = match parser.current_token_kind() {
            TokenKind::Type | TokenKind::Identifier if seen_default => {
                Err(parser.mismatched(STATE_START))
            }
            TokenKind::Type if !at_function_header(parser) => {
                parse_variable_declaration(parser, true).map(|id| unit.globals.push(id))
            }
            TokenKind::Type | TokenKind::Identifier if at_function_header(parser) => {
                parse_function_decl(parser).map(|id| unit.functions.push(id))
            }
            TokenKind::Default if seen_default => Err(parser.mismatched(STATE_START)),
            TokenKind::Default => parse_state(parser).map(|id| unit.default_state = Some(id)),
            TokenKind::State if !seen_default => {
                let error = parser.mismatched(TOP_LEVEL_START);
                parser.report(error);
                parse_state(parser).map(|id| unit.states.push(id))
            }
            TokenKind::State => parse_state(parser).map(|id| unit.states.push(id)),
            _ if seen_default => Err(parser.mismatched(STATE_START)),
            _ => Err(parser.mismatched(TOP_LEVEL_START)),
        };

        if let Err(error) = result {
            parser.report(error);
            synchronize_top_level(parser);
            let span = error_span(parser, construct_start);
            let context = if seen_default {
                ErrorContext::State
            } else {
                ErrorContext::GlobalDeclaration
            };
            unit.errors.push(parser.add_error(context, span));
        }
    }

    let span = parser.span_from(start);
    parser.add(NodeKind::CompilationUnit(unit), span)
}
