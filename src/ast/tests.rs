//! Unit tests for the node arena.

use crate::{Position, Span};

use super::{
    ast::{Ast, NodeId, NodeKind},
    declarations::{ErrorContext, EventHandlerDecl, Parameter, ParameterList},
    expressions::{
        Binding, BinaryExpr, BinaryOperator, Expr, FunctionCall, ExpressionList,
        ExpressionListKind, IntegerLiteral, PrefixExpr, PrefixOperator, VariableRef, CallTarget,
    },
    statements::{CodeScope, CodeScopeType, ExpressionStmt, Stmt},
    types::LslType,
};

fn integer(ast: &mut Ast, raw: &str) -> NodeId {
    ast.add(
        NodeKind::Expr(Expr::Integer(IntegerLiteral {
            raw: raw.to_string(),
        })),
        None,
    )
}

fn variable(ast: &mut Ast, name: &str) -> NodeId {
    ast.add(
        NodeKind::Expr(Expr::Variable(VariableRef {
            name: name.to_string(),
            binding: Binding::Unresolved,
        })),
        None,
    )
}

#[test]
fn test_children_get_parents() {
    let mut ast = Ast::new();
    let left = integer(&mut ast, "1");
    let right = integer(&mut ast, "2");
    let sum = ast.add(
        NodeKind::Expr(Expr::Binary(BinaryExpr {
            left,
            operator: BinaryOperator::Add,
            right,
        })),
        None,
    );

    assert_eq!(ast.parent(left), Some(sum));
    assert_eq!(ast.parent(right), Some(sum));
    assert_eq!(ast.parent(sum), None);
    assert_eq!(ast.children(sum), vec![left, right]);
}

#[test]
fn test_errors_propagate_upwards() {
    let mut ast = Ast::new();
    let error = ast.add_error(ErrorContext::Statement, None);
    let scope = ast.add(
        NodeKind::Stmt(Stmt::CodeScope(CodeScope {
            statements: vec![error],
            scope_id: 1024,
            scope_type: CodeScopeType::AnonymousBlock,
            is_single_statement: false,
        })),
        None,
    );

    assert!(ast.node(scope).has_errors);
}

#[test]
fn test_missing_root_counts_as_error() {
    let ast = Ast::new();
    assert!(ast.has_errors());
}

#[test]
fn test_side_effects() {
    let mut ast = Ast::new();
    let a = variable(&mut ast, "a");
    let one = integer(&mut ast, "1");
    let pure = ast.add(
        NodeKind::Expr(Expr::Binary(BinaryExpr {
            left: a,
            operator: BinaryOperator::Add,
            right: one,
        })),
        None,
    );
    assert!(!ast.has_side_effects(pure));

    let b = variable(&mut ast, "b");
    let two = integer(&mut ast, "2");
    let assign = ast.add(
        NodeKind::Expr(Expr::Binary(BinaryExpr {
            left: b,
            operator: BinaryOperator::Assign,
            right: two,
        })),
        None,
    );
    assert!(ast.has_side_effects(assign));

    let arguments = ast.add(
        NodeKind::ExprList(ExpressionList {
            kind: ExpressionListKind::FunctionArguments,
            expressions: vec![],
        }),
        None,
    );
    let call = ast.add(
        NodeKind::Expr(Expr::Call(FunctionCall {
            name: "f".to_string(),
            arguments,
            target: CallTarget::Unresolved,
        })),
        None,
    );
    let negated = ast.add(
        NodeKind::Expr(Expr::Prefix(PrefixExpr {
            operator: PrefixOperator::Negate,
            operand: call,
        })),
        None,
    );
    assert!(ast.has_side_effects(negated));
    assert!(ast.is_negated(call));
}

#[test]
fn test_scope_queries() {
    let mut ast = Ast::new();
    let first_expr = integer(&mut ast, "1");
    let first = ast.add(
        NodeKind::Stmt(Stmt::Expression(ExpressionStmt {
            expression: first_expr,
        })),
        None,
    );
    let second = ast.add(NodeKind::Stmt(Stmt::Empty), None);
    let scope = ast.add(
        NodeKind::Stmt(Stmt::CodeScope(CodeScope {
            statements: vec![first, second],
            scope_id: 1030,
            scope_type: CodeScopeType::Function,
            is_single_statement: false,
        })),
        None,
    );

    assert_eq!(ast.enclosing_scope_id(first), Some(1030));
    assert!(!ast.is_last_statement_in_scope(first));
    assert!(ast.is_last_statement_in_scope(second));
    assert_eq!(
        ast.find_ancestor(first_expr, |k| matches!(k, NodeKind::Stmt(Stmt::CodeScope(_)))),
        Some(scope)
    );
    assert_eq!(ast.descendants(scope), vec![scope, first, first_expr, second]);
}

#[test]
fn test_event_handler_signature() {
    let mut ast = Ast::new();
    let span = Span::new(Position::new(0, 1, 0), Position::new(5, 1, 5));
    let parameter = ast.add(
        NodeKind::Parameter(Parameter {
            name: "n".to_string(),
            ty: LslType::Integer,
            references: vec![],
        }),
        Some(span),
    );
    let parameters = ast.add(
        NodeKind::ParameterList(ParameterList {
            parameters: vec![parameter],
        }),
        None,
    );
    let body = ast.add(
        NodeKind::Stmt(Stmt::CodeScope(CodeScope {
            statements: vec![],
            scope_id: 1024,
            scope_type: CodeScopeType::EventHandler,
            is_single_statement: false,
        })),
        None,
    );
    let handler = EventHandlerDecl {
        name: "touch_start".to_string(),
        parameters,
        body,
    };

    let signature = handler.create_signature(&ast).unwrap();
    assert_eq!(signature.signature_string(), "touch_start(integer n)");
    assert_eq!(ast.span(parameter), span);
}
