use crate::{
    ast::{
        ast::{NodeId, NodeKind},
        expressions::{
            Binding, BinaryExpr, BinaryOperator, CallTarget, Component, ComponentAccess, Expr,
            ExpressionList, ExpressionListKind, FloatLiteral, FunctionCall, HexLiteral,
            IntegerLiteral, ListLiteral, ParenthesizedExpr, PostfixExpr, PostfixOperator,
            PrefixExpr, PrefixOperator, RotationLiteral, StringLiteral, TypecastExpr,
            VariableRef, VectorLiteral,
        },
    },
    errors::errors::SyntaxError,
    lexer::{lexer::decode_string, tokens::TokenKind},
    Span,
};

use super::{lookups::BindingPower, parser::Parser, types::parse_type};

/// Tokens that may start an expression.
pub const EXPRESSION_START: &str =
    "{'(', '[', '<', '-', '!', '~', '++', '--', ID, INT, HEX_LITERAL, FLOAT, QUOTED_STRING}";

/// Tokens that may follow a complete, non-assignable expression.
pub const AFTER_EXPRESSION: &str = "{';', ',', ')', ']', '>', '*', '/', '%', '+', '-', '<<', '>>', '<', '<=', '>=', '==', '!=', '&', '^', '|', '&&', '||'}";

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<NodeId, SyntaxError> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_lookup().get(&token_kind).copied() else {
        return Err(parser.mismatched(EXPRESSION_START));
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    while parser.binding_power(parser.current_token_kind()) > bp {
        let token_kind = parser.current_token_kind();
        let Some(led) = parser.get_led_lookup().get(&token_kind).copied() else {
            break;
        };

        let token_bp = parser.binding_power(token_kind);
        left = led(parser, left, token_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let token = parser.advance();
    let raw = token.value.clone();

    let expr = match token.kind {
        TokenKind::Integer => Expr::Integer(IntegerLiteral { raw }),
        TokenKind::Hex => Expr::Hex(HexLiteral { raw }),
        TokenKind::Float => Expr::Float(FloatLiteral { raw }),
        TokenKind::String => Expr::String(StringLiteral {
            value: decode_string(&raw),
            raw,
        }),
        _ => {
            return Err(SyntaxError::grammar(
                &token.value,
                format!("mismatched input '{}' expecting {}", token.value, EXPRESSION_START),
                token.span,
            ))
        }
    };

    Ok(parser.add_expr(expr, token.span))
}

/// Variable reference, or a call when followed by `(`.
pub fn parse_symbol_expr(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let token = parser.advance();

    if parser.current_token_kind() != TokenKind::OpenParen {
        return Ok(parser.add_expr(
            Expr::Variable(VariableRef {
                name: token.value,
                binding: Binding::Unresolved,
            }),
            token.span,
        ));
    }

    parser.advance();
    let arguments = parse_expression_list(
        parser,
        ExpressionListKind::FunctionArguments,
        TokenKind::CloseParen,
    )?;
    parser.expect(TokenKind::CloseParen)?;

    let span = parser.span_from(token.span.start);
    Ok(parser.add_expr(
        Expr::Call(FunctionCall {
            name: token.value,
            arguments,
            target: CallTarget::Unresolved,
        }),
        span,
    ))
}

/// Comma separated expressions up to, not including, `terminator`.
pub fn parse_expression_list(
    parser: &mut Parser,
    kind: ExpressionListKind,
    terminator: TokenKind,
) -> Result<NodeId, SyntaxError> {
    let start = parser.get_position();
    let mut expressions = vec![];

    if parser.current_token_kind() != terminator {
        loop {
            expressions.push(parse_expr(parser, BindingPower::Default)?);

            if parser.current_token_kind() == TokenKind::Comma {
                parser.advance();
                continue;
            }
            break;
        }
    }

    let span = if expressions.is_empty() {
        Span::new(start, start)
    } else {
        parser.span_from(start)
    };

    Ok(parser.add(
        NodeKind::ExprList(ExpressionList { kind, expressions }),
        span,
    ))
}

pub fn parse_binary_expr(
    parser: &mut Parser,
    left: NodeId,
    bp: BindingPower,
) -> Result<NodeId, SyntaxError> {
    let operator_token = parser.advance();
    let operator = BinaryOperator::from_token(operator_token.kind).ok_or_else(|| {
        SyntaxError::grammar(
            &operator_token.value,
            format!("unexpected operator '{}'", operator_token.value),
            operator_token.span,
        )
    })?;

    let right = parse_expr(parser, bp)?;

    let span = parser.node_span(left).merge(&parser.node_span(right));
    Ok(parser.add_expr(
        Expr::Binary(BinaryExpr {
            left,
            operator,
            right,
        }),
        span,
    ))
}

fn is_assignable(parser: &Parser, id: NodeId) -> bool {
    matches!(
        parser.ast().expr(id),
        Some(Expr::Variable(_)) | Some(Expr::Component(_))
    )
}

/// Assignment and compound assignment. Only variables and their
/// components may appear on the left.
pub fn parse_assignment_expr(
    parser: &mut Parser,
    left: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, SyntaxError> {
    if !is_assignable(parser, left) {
        return Err(parser.mismatched(AFTER_EXPRESSION));
    }

    let operator_token = parser.advance();
    let operator = BinaryOperator::from_token(operator_token.kind).ok_or_else(|| {
        SyntaxError::grammar(
            &operator_token.value,
            format!("unexpected operator '{}'", operator_token.value),
            operator_token.span,
        )
    })?;

    // Right associative
    let right = parse_expr(parser, BindingPower::Default)?;

    let span = parser.node_span(left).merge(&parser.node_span(right));
    Ok(parser.add_expr(
        Expr::Binary(BinaryExpr {
            left,
            operator,
            right,
        }),
        span,
    ))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let operator_token = parser.advance();
    let operator = PrefixOperator::from_token(operator_token.kind).ok_or_else(|| {
        SyntaxError::grammar(
            &operator_token.value,
            format!("unexpected operator '{}'", operator_token.value),
            operator_token.span,
        )
    })?;

    let operand = parse_expr(parser, BindingPower::Unary)?;

    let span = operator_token.span.merge(&parser.node_span(operand));
    Ok(parser.add_expr(Expr::Prefix(PrefixExpr { operator, operand }), span))
}

pub fn parse_postfix_expr(
    parser: &mut Parser,
    left: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, SyntaxError> {
    if !is_assignable(parser, left) {
        return Err(parser.mismatched(AFTER_EXPRESSION));
    }

    let operator_token = parser.advance();
    let operator = if operator_token.kind == TokenKind::PlusPlus {
        PostfixOperator::Increment
    } else {
        PostfixOperator::Decrement
    };

    let span = parser.node_span(left).merge(&operator_token.span);
    Ok(parser.add_expr(
        Expr::Postfix(PostfixExpr {
            operand: left,
            operator,
        }),
        span,
    ))
}

/// `.x`, `.y`, `.z` or `.s` on a variable.
pub fn parse_member_expr(
    parser: &mut Parser,
    left: NodeId,
    _bp: BindingPower,
) -> Result<NodeId, SyntaxError> {
    if !matches!(parser.ast().expr(left), Some(Expr::Variable(_))) {
        return Err(parser.mismatched(AFTER_EXPRESSION));
    }

    parser.advance();
    let member = parser.expect(TokenKind::Identifier)?;
    let component = Component::from_name(&member.value).ok_or_else(|| {
        SyntaxError::grammar(
            &member.value,
            format!(
                "mismatched input '{}' expecting {{'x', 'y', 'z', 's'}}",
                member.value
            ),
            member.span,
        )
    })?;

    let span = parser.node_span(left).merge(&member.span);
    Ok(parser.add_expr(
        Expr::Component(ComponentAccess {
            target: left,
            component,
        }),
        span,
    ))
}

/// Parenthesized expression, or a cast when the parentheses hold a type.
pub fn parse_grouping_expr(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    if parser.current_token_kind() == TokenKind::Type {
        let cast_type = parse_type(parser)?;
        parser.expect(TokenKind::CloseParen)?;
        let operand = parse_expr(parser, BindingPower::Unary)?;

        let span = parser.span_from(start);
        return Ok(parser.add_expr(Expr::Cast(TypecastExpr { cast_type, operand }), span));
    }

    let inner = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    let span = parser.span_from(start);
    Ok(parser.add_expr(Expr::Parenthesized(ParenthesizedExpr { inner }), span))
}

pub fn parse_list_expr(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let elements =
        parse_expression_list(parser, ExpressionListKind::ListLiteral, TokenKind::CloseBracket)?;
    parser.expect(TokenKind::CloseBracket)?;

    let span = parser.span_from(start);
    Ok(parser.add_expr(Expr::List(ListLiteral { elements }), span))
}

/// `<x, y, z>` or `<x, y, z, s>`. The last component stops below
/// relational operators so that `>` closes the literal.
pub fn parse_vector_expr(parser: &mut Parser) -> Result<NodeId, SyntaxError> {
    let start = parser.advance().span.start;

    let x = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Comma)?;
    let y = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Comma)?;
    let z = parse_expr(parser, BindingPower::Relational)?;

    match parser.current_token_kind() {
        TokenKind::Greater => {
            parser.advance();
            let span = parser.span_from(start);
            Ok(parser.add_expr(Expr::Vector(VectorLiteral { x, y, z }), span))
        }
        TokenKind::Comma => {
            parser.advance();
            let s = parse_expr(parser, BindingPower::Relational)?;
            parser.expect(TokenKind::Greater)?;

            let span = parser.span_from(start);
            Ok(parser.add_expr(Expr::Rotation(RotationLiteral { x, y, z, s }), span))
        }
        _ => Err(parser.mismatched("{',', '>'}")),
    }
}
