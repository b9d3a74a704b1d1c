//! Unit tests for the semantic validator.
//!
//! These run whole scripts through `validate_source` against the bundled
//! library and look at the diagnostics and the decorated tree.

use crate::{
    ast::{
        ast::{Ast, DeadCodeState, NodeId, NodeKind},
        expressions::{BinaryOperator, Binding, CallTarget, Expr},
        statements::Stmt,
        types::LslType,
    },
    errors::errors::{Diagnostic, DiagnosticCode},
    library::library::LibraryData,
};

use super::{
    operators::{assignment_result, binary_result, is_valid_cast, prefix_result},
    validator::{is_non_assignable_error, validate_source},
};

fn check(source: &str) -> (Ast, Vec<Diagnostic>) {
    let library = LibraryData::default_library().unwrap();
    let mut diagnostics = vec![];
    let ast = validate_source(source, &library, &mut diagnostics);
    (ast, diagnostics)
}

fn error_names(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.get_error_name().to_string())
        .collect()
}

fn warning_names(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics
        .iter()
        .filter(|d| !d.is_error())
        .map(|d| d.get_error_name().to_string())
        .collect()
}

fn handler_statements(ast: &Ast, index: usize) -> Vec<NodeId> {
    let unit = ast.compilation_unit().unwrap();
    let NodeKind::State(state) = ast.kind(unit.default_state.unwrap()) else {
        panic!("expected state");
    };
    let NodeKind::EventHandler(handler) = ast.kind(state.handlers[index]) else {
        panic!("expected handler");
    };
    match ast.stmt(handler.body) {
        Some(Stmt::CodeScope(scope)) => scope.statements.clone(),
        other => panic!("expected code scope, got {:?}", other),
    }
}

#[test]
fn test_valid_script_has_no_diagnostics() {
    let (ast, diagnostics) = check(
        "integer count = 0;\n\
         string greet(string name) { return \"Hello \" + name; }\n\
         default {\n\
             state_entry() { llSay(0, greet(\"x\")); count++; }\n\
             touch_start(integer n) { state other; }\n\
         }\n\
         state other { state_entry() { llOwnerSay((string)count); } }",
    );

    assert!(diagnostics.is_empty(), "unexpected: {:?}", diagnostics);
    assert!(!ast.has_errors());
}

#[test]
fn test_undeclared_symbols() {
    let (ast, diagnostics) = check("default { state_entry() { x = 1; foo(); } }");

    assert_eq!(
        error_names(&diagnostics),
        vec!["VariableNotDeclared", "FunctionNotDeclared"]
    );
    assert!(ast.has_errors());
    assert_eq!(diagnostics[0].message(), "variable \"x\" not declared");
    assert_eq!(diagnostics[0].code(), DiagnosticCode::SemanticError);
}

#[test]
fn test_global_initializers() {
    let (_, diagnostics) = check(
        "integer a = b;\n\
         integer b = 1;\n\
         integer c = llAbs(1);\n\
         vector v = <1, -2, b>;\n\
         list l = [PI, \"x\", ZERO_VECTOR];\n\
         default { state_entry() { } }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec!["VariableUsedBeforeDeclaration", "NonConstantGlobalInitializer"]
    );
    assert_eq!(diagnostics[0].line(), 1);
}

#[test]
fn test_type_errors() {
    let (_, diagnostics) = check(
        "default { state_entry() {\n\
             integer i = \"a\";\n\
             vector v = <1, 2, 3> * \"x\";\n\
             string s = (string)[1];\n\
             key k = (key)5;\n\
             vector w;\n\
             float f = w.s;\n\
             if (llSetText(\"a\", <1,1,1>, 1.0)) { }\n\
         } }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec![
            "TypeMatchError",
            "InvalidBinaryOperation",
            "InvalidCast",
            "InvalidComponentAccess",
            "VoidCondition",
        ]
    );
}

#[test]
fn test_implicit_conversions() {
    let (_, diagnostics) = check(
        "default { state_entry() {\n\
             float f = 1;\n\
             key k = \"abc\";\n\
             string s = k;\n\
             list l = [f, s];\n\
             l += 5;\n\
             integer i = 2;\n\
             i *= 1.5;\n\
             llOwnerSay((string)l + (string)i);\n\
         } }",
    );

    assert!(error_names(&diagnostics).is_empty(), "{:?}", diagnostics);
}

#[test]
fn test_redeclaration_and_shadowing() {
    let (_, diagnostics) = check(
        "integer g;\n\
         f(integer p, string p) { }\n\
         f() { }\n\
         llSay() { }\n\
         default { state_entry() {\n\
             integer g = 1;\n\
             integer x;\n\
             { integer x; }\n\
             llOwnerSay((string)(g + x));\n\
         } }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec![
            "FunctionAlreadyDeclared",
            "LibraryFunctionRedefined",
            "ParameterAlreadyDeclared",
            "VariableAlreadyDeclared",
        ]
    );
}

#[test]
fn test_return_checks() {
    let (_, diagnostics) = check(
        "integer f(integer a) { if (a) return 1; }\n\
         integer g(integer a) { if (a) return 1; else if (a > 1) return 3; else return 2; }\n\
         h() { return 1; }\n\
         integer k() { return; }\n\
         string m() { return 5; }\n\
         default { state_entry() { f(1); g(1); h(); k(); m(); } }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec![
            "NotAllCodePathsReturn",
            "ReturnValueFromVoidFunction",
            "MissingReturnValue",
            "ReturnTypeMatchError",
        ]
    );
}

#[test]
fn test_call_arguments() {
    let (_, diagnostics) = check(
        "f(integer a, float b) { }\n\
         default { state_entry() {\n\
             llSay(0);\n\
             llSay(\"a\", \"b\");\n\
             f(1, \"x\");\n\
             f(1);\n\
             f(1, 2);\n\
         } }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec![
            "UnexpectedArguments",
            "ArgumentTypeMatchError",
            "ArgumentTypeMatchError",
            "UnexpectedArguments",
        ]
    );
    assert_eq!(
        diagnostics[1].message(),
        "call to \"llSay\": argument 1 expected integer, received string"
    );
}

#[test]
fn test_event_handler_checks() {
    let (_, diagnostics) = check(
        "default {\n\
             state_entry() { }\n\
             state_entry() { }\n\
             touch_start(string s) { }\n\
             not_an_event() { }\n\
         }\n\
         state empty { }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec![
            "EventHandlerAlreadyDeclared",
            "EventHandlerSignatureMismatch",
            "UnknownEventHandler",
            "StateWithoutEventHandlers",
        ]
    );
    assert_eq!(
        diagnostics[1].message(),
        "event handler signature \"touch_start(string s)\" does not match \"touch_start(integer num_detected)\""
    );
}

#[test]
fn test_missing_default_state() {
    let (ast, diagnostics) = check("integer x;");

    assert_eq!(error_names(&diagnostics), vec!["MissingDefaultState"]);
    assert!(ast.has_errors());
}

#[test]
fn test_labels_and_states_resolve() {
    let (_, diagnostics) = check(
        "default { state_entry() { jump nowhere; } timer() { state missing; } }",
    );
    assert_eq!(
        error_names(&diagnostics),
        vec!["LabelNotDeclared", "StateNotDeclared"]
    );

    let (_, diagnostics) = check(
        "default { state_entry() { @a; @a; jump a; } }",
    );
    assert_eq!(error_names(&diagnostics), vec!["LabelAlreadyDeclared"]);
}

#[test]
fn test_library_constants() {
    let (_, diagnostics) = check(
        "default { state_entry() { PI = 3.0; integer TRUE = 2; ZERO_VECTOR.x = 1; } }",
    );

    assert_eq!(
        error_names(&diagnostics),
        vec![
            "AssignmentToConstant",
            "LibraryConstantRedefined",
            "AssignmentToConstant",
        ]
    );
}

#[test]
fn test_warnings_do_not_set_errors() {
    let (ast, diagnostics) = check(
        "go() { state other; }\n\
         default { state_entry() { integer unused; llSound(\"a\", 1.0, 0, 0); go(); return 1; } }\n\
         state other { timer() { } }",
    );

    assert!(error_names(&diagnostics).is_empty(), "{:?}", diagnostics);
    let warnings = warning_names(&diagnostics);
    for expected in [
        "StateChangeInFunction",
        "DeprecatedFunction",
        "ReturnValueFromEventHandler",
        "UnusedLocalVariable",
    ] {
        assert!(warnings.contains(&expected.to_string()), "missing {}", expected);
    }
    assert!(!ast.has_errors());
}

#[test]
fn test_dead_code_classification() {
    let (ast, diagnostics) = check(
        "default { state_entry() {\n\
             integer x = 1;\n\
             jump over;\n\
             integer a = 5;\n\
             @over;\n\
             llOwnerSay((string)a);\n\
             return;\n\
             x = 2;\n\
         } }",
    );

    assert!(error_names(&diagnostics).is_empty(), "{:?}", diagnostics);
    assert_eq!(
        warning_names(&diagnostics),
        vec!["DeadCode", "DeadCode"]
    );

    let statements = handler_statements(&ast, 0);
    assert_eq!(ast.node(statements[0]).dead_code, DeadCodeState::Live);
    assert_eq!(ast.node(statements[2]).dead_code, DeadCodeState::DeadJumpOver);
    assert_eq!(ast.node(statements[3]).dead_code, DeadCodeState::Live);
    assert_eq!(ast.node(statements[4]).dead_code, DeadCodeState::Live);
    assert_eq!(
        ast.node(statements[6]).dead_code,
        DeadCodeState::DeadUnconditional
    );

    // The skipped declaration still counts its later use.
    let Some(Stmt::VarDecl(a)) = ast.stmt(statements[2]) else {
        panic!("expected declaration");
    };
    assert_eq!(a.references.len(), 1);
}

#[test]
fn test_backward_jump_is_unconditional() {
    let (ast, _) = check(
        "default { state_entry() { @top; llOwnerSay(\"x\"); jump top; llOwnerSay(\"y\"); } }",
    );

    let statements = handler_statements(&ast, 0);
    assert_eq!(
        ast.node(statements[3]).dead_code,
        DeadCodeState::DeadUnconditional
    );
}

#[test]
fn test_forward_jump_covers_code_after_a_return() {
    let (ast, diagnostics) = check(
        "default { state_entry() {\n\
             jump a;\n\
             @b;\n\
             return;\n\
             integer v = 1;\n\
             @a;\n\
             v++;\n\
             if (v < 3) jump b;\n\
             llSay(v, \"\");\n\
         } }",
    );

    assert!(error_names(&diagnostics).is_empty(), "{:?}", diagnostics);

    let statements = handler_statements(&ast, 0);
    assert_eq!(ast.node(statements[1]).dead_code, DeadCodeState::Live);
    assert_eq!(ast.node(statements[2]).dead_code, DeadCodeState::Live);
    assert_eq!(ast.node(statements[3]).dead_code, DeadCodeState::DeadJumpOver);
    assert_eq!(ast.node(statements[4]).dead_code, DeadCodeState::Live);
    assert_eq!(ast.node(statements[5]).dead_code, DeadCodeState::Live);
}

#[test]
fn test_jump_into_nested_block() {
    let (ast, diagnostics) = check(
        "default { state_entry() {\n\
             integer i = 1;\n\
             jump inner;\n\
             if (i) { @inner; llSay(0, \"in\"); }\n\
         } }",
    );
    assert_eq!(error_names(&diagnostics), vec!["JumpIntoNestedScope"]);
    assert!(ast.has_errors());

    let (_, diagnostics) = check(
        "default { state_entry() {\n\
             integer i = 1;\n\
             if (i) { @a; } else { jump a; }\n\
         } }",
    );
    assert_eq!(error_names(&diagnostics), vec!["JumpIntoNestedScope"]);

    // Leaving a block for a label further out is fine.
    let (ast, diagnostics) = check(
        "default { state_entry() {\n\
             integer i = 1;\n\
             if (i) { jump out; }\n\
             llSay(0, \"skipped\");\n\
             @out;\n\
         } }",
    );
    assert!(error_names(&diagnostics).is_empty(), "{:?}", diagnostics);
    assert!(!ast.has_errors());
}

#[test]
fn test_syntax_errors_are_classified() {
    let (ast, diagnostics) = check("default { state_entry() { 1 + 2 = 3; } }");

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].code(),
        DiagnosticCode::AssignmentToNonAssignable
    );
    assert!(ast.has_errors());

    // Semantic checks are skipped once the grammar failed.
    let (_, diagnostics) = check("default { state_entry() { x = ; } }");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::SyntaxError);
}

#[test]
fn test_non_assignable_message_classifier() {
    assert!(is_non_assignable_error(
        "mismatched input '=' expecting {';', ',', ')', '*', '/'}"
    ));
    assert!(is_non_assignable_error(
        "mismatched input '+=' expecting {';', '*'}"
    ));
    assert!(!is_non_assignable_error(
        "mismatched input '=' expecting {ID, '*'}"
    ));
    assert!(!is_non_assignable_error("mismatched input '=' expecting {';'}"));
    assert!(!is_non_assignable_error("missing ';' at '<EOF>'"));
}

#[test]
fn test_types_and_bindings_are_recorded() {
    let (ast, diagnostics) = check(
        "integer g = 1;\n\
         f(integer p) { float l = p + 2.0; llOwnerSay((string)(l + g)); }\n\
         default { state_entry() { f(g); } }",
    );
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let unit = ast.compilation_unit().unwrap();
    let Some(Stmt::VarDecl(global)) = ast.stmt(unit.globals[0]) else {
        panic!("expected global");
    };
    assert_eq!(global.references.len(), 2);

    let NodeKind::Function(function) = ast.kind(unit.functions[0]) else {
        panic!("expected function");
    };
    assert_eq!(function.references.len(), 1);

    let root = ast.root().unwrap();
    let sum = ast
        .descendants(root)
        .into_iter()
        .find(|id| {
            matches!(ast.expr(*id), Some(Expr::Binary(b)) if b.operator == BinaryOperator::Add)
        })
        .unwrap();
    assert_eq!(ast.ty(sum), LslType::Float);

    let Some(Expr::Binary(binary)) = ast.expr(sum) else {
        panic!("expected binary");
    };
    assert!(matches!(
        ast.expr(binary.left),
        Some(Expr::Variable(v)) if matches!(v.binding, Binding::Parameter(_))
    ));

    let call = ast
        .descendants(root)
        .into_iter()
        .find(|id| matches!(ast.expr(*id), Some(Expr::Call(c)) if c.name == "llOwnerSay"))
        .unwrap();
    assert!(matches!(
        ast.expr(call),
        Some(Expr::Call(c)) if matches!(c.target, CallTarget::Library(_))
    ));
}

#[test]
fn test_operator_tables() {
    assert_eq!(
        binary_result(LslType::Vector, BinaryOperator::Multiply, LslType::Rotation),
        Some(LslType::Vector)
    );
    assert_eq!(
        binary_result(LslType::Vector, BinaryOperator::Multiply, LslType::Vector),
        Some(LslType::Float)
    );
    assert_eq!(
        binary_result(LslType::String, BinaryOperator::Subtract, LslType::String),
        None
    );
    assert_eq!(
        binary_result(LslType::Key, BinaryOperator::Equals, LslType::String),
        Some(LslType::Integer)
    );

    assert_eq!(
        assignment_result(LslType::Integer, BinaryOperator::MultiplyAssign, LslType::Float),
        Some(LslType::Integer)
    );
    assert_eq!(
        assignment_result(LslType::Integer, BinaryOperator::AddAssign, LslType::Float),
        None
    );
    assert_eq!(
        assignment_result(LslType::List, BinaryOperator::AddAssign, LslType::Integer),
        Some(LslType::List)
    );
    assert_eq!(
        assignment_result(LslType::Key, BinaryOperator::Assign, LslType::String),
        Some(LslType::Key)
    );

    assert_eq!(
        prefix_result(crate::ast::expressions::PrefixOperator::Negate, LslType::Rotation),
        Some(LslType::Rotation)
    );
    assert!(!is_valid_cast(LslType::List, LslType::Integer));
    assert!(is_valid_cast(LslType::String, LslType::Vector));
    assert!(!is_valid_cast(LslType::Key, LslType::Integer));
}
