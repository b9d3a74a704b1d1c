use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    ast::{
        ast::{Ast, NodeId, NodeKind},
        expressions::{
            BinaryExpr, BinaryOperator, Binding, CallTarget, Component, Expr, FunctionCall,
            PrefixExpr, PrefixOperator,
        },
        statements::{CodeScope, Stmt, VarDecl},
        types::LslType,
    },
    errors::errors::{
        Diagnostic, DiagnosticKind, DiagnosticSink, Severity, SyntaxError, SyntaxErrorKind,
    },
    lexer::lexer::tokenize,
    library::provider::LibraryDataProvider,
    parser::parser::parse,
    Span,
};

use super::{
    dead_code::{classify_dead_code, label_in_reach, returns_on_all_paths},
    operators::{
        assignment_result, binary_result, is_valid_cast, is_valid_list_element, postfix_result,
        prefix_result,
    },
};

lazy_static! {
    static ref ASSIGNMENT_MISMATCH: Regex =
        Regex::new(r"mismatched input '[*+\-/%]?=' expecting \{(.*?)\}").unwrap();
}

/// Token names that would make an `=` mismatch an ordinary syntax error.
const OPERAND_TOKENS: [&str; 6] = ["TYPE", "ID", "INT", "FLOAT", "HEX_LITERAL", "QUOTED_STRING"];

/// Whether a grammar message describes an assignment whose left side is not
/// assignable, e.g. `mismatched input '=' expecting {';', '*', ...}`.
pub fn is_non_assignable_error(message: &str) -> bool {
    let Some(captures) = ASSIGNMENT_MISMATCH.captures(message) else {
        return false;
    };

    let expected: Vec<&str> = captures[1].split(',').map(str::trim).collect();
    expected.contains(&"'*'") && !expected.iter().any(|token| OPERAND_TOKENS.contains(token))
}

/// Turns a raw lexer or parser error into a diagnostic.
pub fn classify_syntax_error(error: &SyntaxError) -> Diagnostic {
    let kind = match error.kind {
        SyntaxErrorKind::UnrecognisedToken => DiagnosticKind::UnrecognisedToken {
            token: error.offending_symbol.clone(),
        },
        SyntaxErrorKind::UnterminatedString => DiagnosticKind::UnterminatedString,
        SyntaxErrorKind::UnterminatedComment => DiagnosticKind::UnterminatedComment,
        SyntaxErrorKind::Grammar if is_non_assignable_error(&error.message) => {
            DiagnosticKind::AssignmentToNonAssignable {
                message: error.message.clone(),
            }
        }
        SyntaxErrorKind::Grammar => DiagnosticKind::GrammarError {
            message: error.message.clone(),
        },
    };

    Diagnostic::new(kind, error.span)
}

/// Local variables and parameters declared in one code scope.
#[derive(Debug, Default)]
pub struct Environment {
    pub id: u32,
    pub variable_lookup: HashMap<String, NodeId>,
    /// Local declarations in the order they were made.
    pub declarations: Vec<NodeId>,
}

impl Environment {
    pub fn new(id: u32) -> Self {
        Environment {
            id,
            ..Default::default()
        }
    }

    /// Returns `false` when the name is already taken in this scope.
    pub fn declare_variable(&mut self, name: &str, declaration: NodeId) -> bool {
        if self.variable_lookup.contains_key(name) {
            return false;
        }
        self.variable_lookup.insert(name.to_string(), declaration);
        true
    }

    pub fn get_variable(&self, name: &str) -> Option<NodeId> {
        self.variable_lookup.get(name).copied()
    }
}

/// The body currently being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyContext {
    None,
    GlobalInitializer,
    Function(NodeId),
    EventHandler(NodeId),
}

pub struct Validator<'l, 's> {
    pub ast: Ast,
    library: &'l dyn LibraryDataProvider,
    sink: &'s mut dyn DiagnosticSink,
    /// Globals declared so far, in declaration order of the global pass.
    pub globals: HashMap<String, NodeId>,
    global_names: HashSet<String>,
    pub functions: HashMap<String, NodeId>,
    pub states: HashMap<String, NodeId>,
    /// Local scopes of the current body, innermost last.
    pub environments: Vec<Environment>,
    /// Labels of the current body. Jumps may target any label in the body.
    pub labels: HashMap<String, NodeId>,
    pub context: BodyContext,
    pub errors: usize,
    pub warnings: usize,
}

impl<'l, 's> Validator<'l, 's> {
    pub fn new(
        ast: Ast,
        library: &'l dyn LibraryDataProvider,
        sink: &'s mut dyn DiagnosticSink,
    ) -> Self {
        Validator {
            ast,
            library,
            sink,
            globals: HashMap::new(),
            global_names: HashSet::new(),
            functions: HashMap::new(),
            states: HashMap::new(),
            environments: vec![],
            labels: HashMap::new(),
            context: BodyContext::None,
            errors: 0,
            warnings: 0,
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity() {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        self.sink.report(diagnostic);
    }

    /// Reports an error at a node and flags it and its ancestors.
    pub fn error(&mut self, kind: DiagnosticKind, id: NodeId) {
        let span = self.ast.span(id);
        self.report(Diagnostic::new(kind, span));

        let mut current = Some(id);
        while let Some(node) = current {
            self.ast.node_mut(node).has_errors = true;
            current = self.ast.parent(node);
        }
    }

    pub fn warning(&mut self, kind: DiagnosticKind, id: NodeId) {
        let span = self.ast.span(id);
        self.report(Diagnostic::new(kind, span));
    }

    /// Flags the root when any error was reported and hands the tree back.
    pub fn finish(mut self) -> Ast {
        if self.errors > 0 {
            if let Some(root) = self.ast.root() {
                self.ast.node_mut(root).has_errors = true;
            }
        }

        log::debug!(
            "validation finished: {} errors, {} warnings",
            self.errors,
            self.warnings
        );
        self.ast
    }

    fn in_current_body(&self, name: &str) -> bool {
        self.environments
            .iter()
            .any(|environment| environment.get_variable(name).is_some())
    }

    fn current_environment(&mut self) -> Option<&mut Environment> {
        self.environments.last_mut()
    }
}

/// Lexes, parses and validates a script.
///
/// Every diagnostic goes to `sink`. The semantic pass only runs on trees
/// without syntax errors. The returned tree has `has_errors` set on its root
/// when any error was reported.
pub fn validate_source(
    source: &str,
    library: &dyn LibraryDataProvider,
    sink: &mut dyn DiagnosticSink,
) -> Ast {
    let (tokens, lex_errors) = tokenize(source);
    let (ast, parse_errors) = parse(tokens);

    let mut syntax_errors: Vec<SyntaxError> = lex_errors.into_iter().chain(parse_errors).collect();
    syntax_errors.sort_by_key(|error| error.span.start.offset);

    let mut validator = Validator::new(ast, library, sink);
    for error in &syntax_errors {
        validator.report(classify_syntax_error(error));
    }

    if syntax_errors.is_empty() {
        validate_compilation_unit(&mut validator);
    } else {
        log::info!(
            "skipping semantic validation, {} syntax errors",
            syntax_errors.len()
        );
    }

    validator.finish()
}

/// Validates an already parsed tree.
pub fn validate(ast: Ast, library: &dyn LibraryDataProvider, sink: &mut dyn DiagnosticSink) -> Ast {
    let mut validator = Validator::new(ast, library, sink);
    if !validator.ast.has_errors() {
        validate_compilation_unit(&mut validator);
    }
    validator.finish()
}

pub fn validate_compilation_unit(validator: &mut Validator) {
    let Some(unit) = validator.ast.compilation_unit().cloned() else {
        return;
    };
    let Some(root) = validator.ast.root() else {
        return;
    };

    register_functions(validator, &unit.functions);
    register_states(validator, unit.default_state, &unit.states);

    for global in &unit.globals {
        if let Some(Stmt::VarDecl(decl)) = validator.ast.stmt(*global) {
            validator.global_names.insert(decl.name.clone());
        }
    }

    for global in &unit.globals {
        validate_global_declaration(validator, *global);
    }

    for function in &unit.functions {
        validate_function(validator, *function);
    }

    match unit.default_state {
        Some(default_state) => validate_state(validator, default_state),
        None => validator.report(Diagnostic::new(
            DiagnosticKind::MissingDefaultState,
            Span::new(validator.ast.span(root).end, validator.ast.span(root).end),
        )),
    }

    for state in &unit.states {
        validate_state(validator, *state);
    }
}

fn register_functions(validator: &mut Validator, functions: &[NodeId]) {
    for function in functions {
        let NodeKind::Function(decl) = validator.ast.kind(*function) else {
            continue;
        };
        let name = decl.name.clone();

        if validator.library.library_function_exists(&name) {
            validator.error(
                DiagnosticKind::LibraryFunctionRedefined { function: name },
                *function,
            );
        } else if validator.functions.contains_key(&name) {
            validator.error(
                DiagnosticKind::FunctionAlreadyDeclared { function: name },
                *function,
            );
        } else {
            log::trace!("registered function {}", name);
            validator.functions.insert(name, *function);
        }
    }
}

fn register_states(validator: &mut Validator, default_state: Option<NodeId>, states: &[NodeId]) {
    for state in default_state.iter().chain(states.iter()) {
        let NodeKind::State(decl) = validator.ast.kind(*state) else {
            continue;
        };
        let name = decl.name.clone();

        if validator.states.contains_key(&name) {
            validator.error(DiagnosticKind::StateAlreadyDeclared { state: name }, *state);
        } else {
            validator.states.insert(name, *state);
        }
    }
}

/// Literals, negated literals, variable and constant references, and
/// vector, rotation or list literals built from those.
pub fn is_constant_expression(ast: &Ast, id: NodeId) -> bool {
    match ast.expr(id) {
        Some(Expr::Integer(_) | Expr::Hex(_) | Expr::Float(_) | Expr::String(_)) => true,
        Some(Expr::Variable(_)) => true,
        Some(Expr::Prefix(prefix)) if prefix.operator == PrefixOperator::Negate => {
            matches!(
                ast.expr(prefix.operand),
                Some(Expr::Integer(_) | Expr::Hex(_) | Expr::Float(_))
            )
        }
        Some(Expr::Vector(_) | Expr::Rotation(_)) => ast
            .children(id)
            .iter()
            .all(|component| is_constant_expression(ast, *component)),
        Some(Expr::List(list)) => ast
            .expression_list(list.elements)
            .map(|elements| {
                elements
                    .expressions
                    .iter()
                    .all(|element| is_constant_expression(ast, *element))
            })
            .unwrap_or(true),
        _ => false,
    }
}

fn validate_global_declaration(validator: &mut Validator, id: NodeId) {
    let Some(Stmt::VarDecl(decl)) = validator.ast.stmt(id).cloned() else {
        return;
    };

    validator.context = BodyContext::GlobalInitializer;
    if let Some(initializer) = decl.initializer {
        check_initializer(validator, &decl, initializer);

        if !is_constant_expression(&validator.ast, initializer) {
            validator.error(
                DiagnosticKind::NonConstantGlobalInitializer {
                    variable: decl.name.clone(),
                },
                initializer,
            );
        }
    }
    validator.context = BodyContext::None;

    if validator
        .library
        .constant_signature_exists(&decl.name)
        .is_some()
    {
        validator.error(
            DiagnosticKind::LibraryConstantRedefined {
                constant: decl.name.clone(),
            },
            id,
        );
    } else if validator.globals.contains_key(&decl.name) {
        validator.error(
            DiagnosticKind::VariableAlreadyDeclared {
                variable: decl.name.clone(),
            },
            id,
        );
    } else {
        validator.globals.insert(decl.name.clone(), id);
    }
}

fn check_initializer(validator: &mut Validator, decl: &VarDecl, initializer: NodeId) {
    let Some(ty) = validate_expr(validator, initializer) else {
        return;
    };

    if !ty.implicitly_converts_to(decl.ty) {
        validator.error(
            DiagnosticKind::TypeMatchError {
                expected: decl.ty.to_string(),
                received: ty.to_string(),
            },
            initializer,
        );
    }
}

/// Collects the labels of a body. Labels are visible from anywhere inside it.
fn collect_labels(validator: &mut Validator, body: NodeId) {
    validator.labels.clear();

    for id in validator.ast.descendants(body) {
        let Some(Stmt::Label(label)) = validator.ast.stmt(id) else {
            continue;
        };
        let name = label.name.clone();

        if validator.labels.contains_key(&name) {
            validator.error(DiagnosticKind::LabelAlreadyDeclared { label: name }, id);
        } else {
            validator.labels.insert(name, id);
        }
    }
}

fn declare_parameters(validator: &mut Validator, parameters: NodeId) -> Environment {
    let mut environment = Environment::new(0);
    let ids = validator.ast.children(parameters);

    for id in ids {
        let NodeKind::Parameter(parameter) = validator.ast.kind(id) else {
            continue;
        };
        let name = parameter.name.clone();

        if validator.library.constant_signature_exists(&name).is_some() {
            validator.error(DiagnosticKind::LibraryConstantRedefined { constant: name }, id);
        } else if !environment.declare_variable(&name, id) {
            validator.error(DiagnosticKind::ParameterAlreadyDeclared { parameter: name }, id);
        }
    }

    environment
}

/// Shared tail of function and event handler validation.
fn validate_body(validator: &mut Validator, context: BodyContext, parameters: NodeId, body: NodeId) {
    validator.context = context;
    collect_labels(validator, body);

    let environment = declare_parameters(validator, parameters);
    validator.environments.push(environment);
    validate_stmt(validator, body);
    validator.environments.clear();

    for span in classify_dead_code(&mut validator.ast, body) {
        validator.report(Diagnostic::new(DiagnosticKind::DeadCode, span));
    }

    validator.labels.clear();
    validator.context = BodyContext::None;
}

fn validate_function(validator: &mut Validator, id: NodeId) {
    let NodeKind::Function(function) = validator.ast.kind(id).clone() else {
        return;
    };

    validate_body(
        validator,
        BodyContext::Function(id),
        function.parameters,
        function.body,
    );

    if function.return_type != LslType::Void && !returns_on_all_paths(&validator.ast, function.body)
    {
        validator.error(
            DiagnosticKind::NotAllCodePathsReturn {
                function: function.name.clone(),
            },
            id,
        );
    }
}

fn validate_state(validator: &mut Validator, id: NodeId) {
    let NodeKind::State(state) = validator.ast.kind(id).clone() else {
        return;
    };

    if state.handlers.is_empty() {
        validator.error(
            DiagnosticKind::StateWithoutEventHandlers {
                state: state.name.clone(),
            },
            id,
        );
        return;
    }

    let mut seen = HashSet::new();
    for handler in &state.handlers {
        let NodeKind::EventHandler(decl) = validator.ast.kind(*handler).clone() else {
            continue;
        };

        if !seen.insert(decl.name.clone()) {
            validator.error(
                DiagnosticKind::EventHandlerAlreadyDeclared {
                    event: decl.name.clone(),
                    state: state.name.clone(),
                },
                *handler,
            );
            continue;
        }

        let library = validator.library;
        match library.event_signature_exists(&decl.name) {
            None => validator.error(
                DiagnosticKind::UnknownEventHandler {
                    event: decl.name.clone(),
                },
                *handler,
            ),
            Some(expected) => {
                let matches = decl
                    .create_signature(&validator.ast)
                    .map(|given| given.signature_matches(expected.signature()))
                    .unwrap_or(false);

                if !matches {
                    let given = decl
                        .create_signature(&validator.ast)
                        .map(|given| given.signature_string())
                        .unwrap_or_else(|_| decl.name.clone());
                    validator.error(
                        DiagnosticKind::EventHandlerSignatureMismatch {
                            given,
                            expected: expected.signature_string(),
                        },
                        *handler,
                    );
                }
            }
        }

        validate_body(
            validator,
            BodyContext::EventHandler(*handler),
            decl.parameters,
            decl.body,
        );
    }
}

pub fn validate_stmt(validator: &mut Validator, id: NodeId) {
    // Error nodes have nothing left to check.
    let Some(stmt) = validator.ast.stmt(id).cloned() else {
        return;
    };

    match stmt {
        Stmt::CodeScope(scope) => validate_code_scope(validator, &scope),
        Stmt::VarDecl(decl) => validate_local_declaration(validator, id, &decl),
        Stmt::Expression(statement) => {
            validate_expr(validator, statement.expression);
        }
        Stmt::Return(ret) => validate_return(validator, id, ret.value),
        Stmt::Jump(jump) => {
            let Some(&label) = validator.labels.get(&jump.label) else {
                validator.error(DiagnosticKind::LabelNotDeclared { label: jump.label }, id);
                return;
            };

            if !label_in_reach(&validator.ast, id, label) {
                validator.error(
                    DiagnosticKind::JumpIntoNestedScope {
                        label: jump.label.clone(),
                    },
                    id,
                );
            }

            if let Some(Stmt::Jump(jump)) = validator.ast.stmt_mut(id) {
                jump.target = Some(label);
            }
            if let Some(Stmt::Label(label)) = validator.ast.stmt_mut(label) {
                label.jumps.push(id);
            }
        }
        Stmt::StateChange(change) => {
            let Some(&state) = validator.states.get(&change.state) else {
                validator.error(DiagnosticKind::StateNotDeclared { state: change.state }, id);
                return;
            };

            if let Some(Stmt::StateChange(change)) = validator.ast.stmt_mut(id) {
                change.target = Some(state);
            }
            if let NodeKind::State(decl) = &mut validator.ast.node_mut(state).kind {
                decl.references.push(id);
            }

            if let BodyContext::Function(function) = validator.context {
                if let NodeKind::Function(decl) = validator.ast.kind(function) {
                    let function = decl.name.clone();
                    validator.warning(DiagnosticKind::StateChangeInFunction { function }, id);
                }
            }
        }
        Stmt::Control(control) => {
            validate_stmt(validator, control.if_branch);
            for branch in control.else_ifs {
                validate_stmt(validator, branch);
            }
            if let Some(branch) = control.else_branch {
                validate_stmt(validator, branch);
            }
        }
        Stmt::If(branch) | Stmt::ElseIf(branch) => {
            validate_condition(validator, branch.condition);
            validate_stmt(validator, branch.body);
        }
        Stmt::Else(branch) => validate_stmt(validator, branch.body),
        Stmt::While(w) => {
            validate_condition(validator, w.condition);
            validate_stmt(validator, w.body);
        }
        Stmt::DoWhile(d) => {
            validate_stmt(validator, d.body);
            validate_condition(validator, d.condition);
        }
        Stmt::For(f) => {
            if let Some(init) = f.init {
                validate_expression_list(validator, init);
            }
            if let Some(condition) = f.condition {
                validate_condition(validator, condition);
            }
            if let Some(afterthought) = f.afterthought {
                validate_expression_list(validator, afterthought);
            }
            validate_stmt(validator, f.body);
        }
        Stmt::Label(_) | Stmt::Empty => {}
    }
}

fn validate_code_scope(validator: &mut Validator, scope: &CodeScope) {
    validator
        .environments
        .push(Environment::new(scope.scope_id));

    for statement in &scope.statements {
        validate_stmt(validator, *statement);
    }

    let Some(environment) = validator.environments.pop() else {
        return;
    };

    for declaration in environment.declarations {
        if let Some(Stmt::VarDecl(decl)) = validator.ast.stmt(declaration) {
            if decl.references.is_empty() {
                let variable = decl.name.clone();
                validator.warning(DiagnosticKind::UnusedLocalVariable { variable }, declaration);
            }
        }
    }
}

fn validate_local_declaration(validator: &mut Validator, id: NodeId, decl: &VarDecl) {
    // The initializer cannot see the variable it initializes.
    if let Some(initializer) = decl.initializer {
        check_initializer(validator, decl, initializer);
    }

    if validator
        .library
        .constant_signature_exists(&decl.name)
        .is_some()
    {
        validator.error(
            DiagnosticKind::LibraryConstantRedefined {
                constant: decl.name.clone(),
            },
            id,
        );
        return;
    }

    if validator.in_current_body(&decl.name) {
        validator.error(
            DiagnosticKind::VariableAlreadyDeclared {
                variable: decl.name.clone(),
            },
            id,
        );
        return;
    }

    if let Some(environment) = validator.current_environment() {
        environment.declare_variable(&decl.name, id);
        environment.declarations.push(id);
    }
}

fn validate_return(validator: &mut Validator, id: NodeId, value: Option<NodeId>) {
    match validator.context {
        BodyContext::Function(function) => {
            let NodeKind::Function(decl) = validator.ast.kind(function) else {
                return;
            };
            let (name, return_type) = (decl.name.clone(), decl.return_type);

            match (value, return_type) {
                (Some(value), LslType::Void) => {
                    validate_expr(validator, value);
                    validator.error(
                        DiagnosticKind::ReturnValueFromVoidFunction { function: name },
                        id,
                    );
                }
                (Some(value), expected) => {
                    if let Some(ty) = validate_expr(validator, value) {
                        if !ty.implicitly_converts_to(expected) {
                            validator.error(
                                DiagnosticKind::ReturnTypeMatchError {
                                    expected: expected.to_string(),
                                    received: ty.to_string(),
                                },
                                value,
                            );
                        }
                    }
                }
                (None, LslType::Void) => {}
                (None, _) => {
                    validator.error(DiagnosticKind::MissingReturnValue { function: name }, id)
                }
            }
        }
        BodyContext::EventHandler(handler) => {
            if let Some(value) = value {
                validate_expr(validator, value);
                if let NodeKind::EventHandler(decl) = validator.ast.kind(handler) {
                    let event = decl.name.clone();
                    validator.warning(DiagnosticKind::ReturnValueFromEventHandler { event }, id);
                }
            }
        }
        BodyContext::None | BodyContext::GlobalInitializer => {}
    }
}

fn validate_condition(validator: &mut Validator, id: NodeId) {
    if validate_expr(validator, id) == Some(LslType::Void) {
        validator.error(DiagnosticKind::VoidCondition, id);
    }
}

fn validate_expression_list(validator: &mut Validator, id: NodeId) -> Vec<Option<LslType>> {
    let expressions = validator
        .ast
        .expression_list(id)
        .map(|list| list.expressions.clone())
        .unwrap_or_default();

    expressions
        .into_iter()
        .map(|expression| validate_expr(validator, expression))
        .collect()
}

/// Computes and records the type of an expression. `None` means an error
/// was already reported below this node.
pub fn validate_expr(validator: &mut Validator, id: NodeId) -> Option<LslType> {
    let Some(expr) = validator.ast.expr(id).cloned() else {
        return None;
    };

    let ty = match expr {
        Expr::Integer(_) | Expr::Hex(_) => Some(LslType::Integer),
        Expr::Float(_) => Some(LslType::Float),
        Expr::String(_) => Some(LslType::String),
        Expr::Vector(v) => {
            validate_components(validator, &[v.x, v.y, v.z]);
            Some(LslType::Vector)
        }
        Expr::Rotation(r) => {
            validate_components(validator, &[r.x, r.y, r.z, r.s]);
            Some(LslType::Rotation)
        }
        Expr::List(list) => {
            let elements = validator
                .ast
                .expression_list(list.elements)
                .map(|l| l.expressions.clone())
                .unwrap_or_default();

            for element in elements {
                if let Some(ty) = validate_expr(validator, element) {
                    if !is_valid_list_element(ty) {
                        validator.error(
                            DiagnosticKind::TypeMatchError {
                                expected: String::from("list element"),
                                received: ty.to_string(),
                            },
                            element,
                        );
                    }
                }
            }
            Some(LslType::List)
        }
        Expr::Variable(variable) => validate_variable(validator, id, &variable.name),
        Expr::Call(call) => validate_call(validator, id, &call),
        Expr::Binary(binary) => validate_binary(validator, id, &binary),
        Expr::Prefix(prefix) => validate_prefix(validator, id, &prefix),
        Expr::Postfix(postfix) => {
            let operand = validate_expr(validator, postfix.operand);
            if !check_assignable(validator, postfix.operand) {
                return None;
            }

            let operand = operand?;
            let result = postfix_result(postfix.operator, operand);
            if result.is_none() {
                validator.error(
                    DiagnosticKind::InvalidPostfixOperation {
                        operator: postfix.operator.symbol().to_string(),
                        operand: operand.to_string(),
                    },
                    id,
                );
            }
            result
        }
        Expr::Cast(cast) => {
            let from = validate_expr(validator, cast.operand)?;
            if !is_valid_cast(from, cast.cast_type) {
                validator.error(
                    DiagnosticKind::InvalidCast {
                        from: from.to_string(),
                        to: cast.cast_type.to_string(),
                    },
                    id,
                );
            }
            Some(cast.cast_type)
        }
        Expr::Parenthesized(inner) => validate_expr(validator, inner.inner),
        Expr::Component(access) => {
            let target = validate_expr(validator, access.target)?;
            let valid = match target {
                LslType::Vector => access.component != Component::S,
                LslType::Rotation => true,
                _ => false,
            };

            if !valid {
                validator.error(
                    DiagnosticKind::InvalidComponentAccess {
                        component: access.component.name().to_string(),
                        type_: target.to_string(),
                    },
                    id,
                );
                return None;
            }
            Some(LslType::Float)
        }
    }?;

    validator.ast.node_mut(id).ty = ty;
    Some(ty)
}

fn validate_components(validator: &mut Validator, components: &[NodeId]) {
    for component in components {
        if let Some(ty) = validate_expr(validator, *component) {
            if !ty.implicitly_converts_to(LslType::Float) {
                validator.error(
                    DiagnosticKind::TypeMatchError {
                        expected: LslType::Float.to_string(),
                        received: ty.to_string(),
                    },
                    *component,
                );
            }
        }
    }
}

fn add_reference(ast: &mut Ast, declaration: NodeId, reference: NodeId) {
    match &mut ast.node_mut(declaration).kind {
        NodeKind::Stmt(Stmt::VarDecl(decl)) => decl.references.push(reference),
        NodeKind::Parameter(parameter) => parameter.references.push(reference),
        NodeKind::Function(function) => function.references.push(reference),
        _ => {}
    }
}

fn declaration_type(ast: &Ast, declaration: NodeId) -> LslType {
    match ast.kind(declaration) {
        NodeKind::Stmt(Stmt::VarDecl(decl)) => decl.ty,
        NodeKind::Parameter(parameter) => parameter.ty,
        _ => LslType::Void,
    }
}

fn validate_variable(validator: &mut Validator, id: NodeId, name: &str) -> Option<LslType> {
    let local = validator
        .environments
        .iter()
        .rev()
        .find_map(|environment| environment.get_variable(name));

    let (binding, ty) = if let Some(declaration) = local {
        let binding = match validator.ast.kind(declaration) {
            NodeKind::Parameter(_) => Binding::Parameter(declaration),
            _ => Binding::Local(declaration),
        };
        (binding, declaration_type(&validator.ast, declaration))
    } else if let Some(&declaration) = validator.globals.get(name) {
        (
            Binding::Global(declaration),
            declaration_type(&validator.ast, declaration),
        )
    } else if validator.context == BodyContext::GlobalInitializer
        && validator.global_names.contains(name)
    {
        validator.error(
            DiagnosticKind::VariableUsedBeforeDeclaration {
                variable: name.to_string(),
            },
            id,
        );
        return None;
    } else if let Some(constant) = validator.library.constant_signature_exists(name) {
        (Binding::LibraryConstant, constant.ty())
    } else {
        validator.error(
            DiagnosticKind::VariableNotDeclared {
                variable: name.to_string(),
            },
            id,
        );
        return None;
    };

    match binding {
        Binding::Global(declaration) | Binding::Local(declaration) | Binding::Parameter(declaration) => {
            add_reference(&mut validator.ast, declaration, id)
        }
        Binding::LibraryConstant | Binding::Unresolved => {}
    }

    if let Some(Expr::Variable(variable)) = validator.ast.expr_mut(id) {
        variable.binding = binding;
    }

    Some(ty)
}

fn set_call_target(validator: &mut Validator, id: NodeId, target: CallTarget) {
    if let Some(Expr::Call(call)) = validator.ast.expr_mut(id) {
        call.target = target;
    }
}

fn check_arguments(
    validator: &mut Validator,
    call: NodeId,
    function: &str,
    arguments: &[NodeId],
    types: &[Option<LslType>],
    parameters: &[LslType],
) {
    if arguments.len() != parameters.len() {
        validator.error(
            DiagnosticKind::UnexpectedArguments {
                function: function.to_string(),
                expected: parameters.len(),
                received: arguments.len(),
            },
            call,
        );
        return;
    }

    for (index, (argument, expected)) in arguments.iter().zip(parameters).enumerate() {
        let Some(received) = types[index] else {
            continue;
        };

        if !received.implicitly_converts_to(*expected) {
            validator.error(
                DiagnosticKind::ArgumentTypeMatchError {
                    function: function.to_string(),
                    index: index + 1,
                    expected: expected.to_string(),
                    received: received.to_string(),
                },
                *argument,
            );
        }
    }
}

fn validate_call(validator: &mut Validator, id: NodeId, call: &FunctionCall) -> Option<LslType> {
    let arguments = validator
        .ast
        .expression_list(call.arguments)
        .map(|list| list.expressions.clone())
        .unwrap_or_default();
    let types = validate_expression_list(validator, call.arguments);

    if let Some(&function) = validator.functions.get(&call.name) {
        let NodeKind::Function(decl) = validator.ast.kind(function).clone() else {
            return None;
        };
        let parameters: Vec<LslType> = validator
            .ast
            .children(decl.parameters)
            .iter()
            .map(|parameter| declaration_type(&validator.ast, *parameter))
            .collect();

        add_reference(&mut validator.ast, function, id);
        set_call_target(validator, id, CallTarget::User(function));
        check_arguments(validator, id, &call.name, &arguments, &types, &parameters);
        return Some(decl.return_type);
    }

    let library = validator.library;
    let Some(overloads) = library.get_library_function_signatures(&call.name) else {
        validator.error(
            DiagnosticKind::FunctionNotDeclared {
                function: call.name.clone(),
            },
            id,
        );
        return None;
    };

    let argument_types: Vec<LslType> = types.iter().copied().collect::<Option<Vec<_>>>()?;

    if let Some(signature) = library.function_signature_exists(&call.name, &argument_types) {
        set_call_target(validator, id, CallTarget::Library(signature.signature().clone()));
        if signature.metadata.deprecated() {
            validator.warning(
                DiagnosticKind::DeprecatedFunction {
                    function: call.name.clone(),
                },
                id,
            );
        }
        return Some(signature.return_type());
    }

    if let [single] = overloads {
        if !single.has_variadic_parameter() {
            let parameters: Vec<LslType> = single.parameters().iter().map(|p| p.ty).collect();
            check_arguments(validator, id, &call.name, &arguments, &types, &parameters);
            return Some(single.return_type());
        }
    }

    validator.error(
        DiagnosticKind::NoMatchingOverload {
            function: call.name.clone(),
            arguments: argument_types
                .iter()
                .map(|ty| ty.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        },
        id,
    );
    None
}

/// Reports assignments to library constants and to anything that is not a
/// variable or a component of one.
fn check_assignable(validator: &mut Validator, target: NodeId) -> bool {
    match validator.ast.expr(target).cloned() {
        Some(Expr::Variable(variable)) => {
            if variable.binding == Binding::LibraryConstant {
                validator.error(
                    DiagnosticKind::AssignmentToConstant {
                        constant: variable.name,
                    },
                    target,
                );
                return false;
            }
            true
        }
        Some(Expr::Component(access)) => check_assignable(validator, access.target),
        _ => false,
    }
}

fn validate_binary(validator: &mut Validator, id: NodeId, binary: &BinaryExpr) -> Option<LslType> {
    let left = validate_expr(validator, binary.left);
    let right = validate_expr(validator, binary.right);

    if binary.operator.is_assignment() && left.is_some() && !check_assignable(validator, binary.left)
    {
        return None;
    }

    let (left, right) = (left?, right?);

    let result = if binary.operator.is_assignment() {
        assignment_result(left, binary.operator, right)
    } else {
        binary_result(left, binary.operator, right)
    };

    if result.is_none() {
        let kind = if binary.operator == BinaryOperator::Assign {
            DiagnosticKind::TypeMatchError {
                expected: left.to_string(),
                received: right.to_string(),
            }
        } else {
            DiagnosticKind::InvalidBinaryOperation {
                left: left.to_string(),
                operator: binary.operator.symbol().to_string(),
                right: right.to_string(),
            }
        };
        validator.error(kind, id);
    }

    result
}

fn validate_prefix(validator: &mut Validator, id: NodeId, prefix: &PrefixExpr) -> Option<LslType> {
    let operand = validate_expr(validator, prefix.operand)?;

    if prefix.operator.is_increment_or_decrement() && !check_assignable(validator, prefix.operand) {
        if !validator.ast.node(id).has_errors {
            validator.error(
                DiagnosticKind::InvalidPrefixOperation {
                    operator: prefix.operator.symbol().to_string(),
                    operand: operand.to_string(),
                },
                id,
            );
        }
        return None;
    }

    let result = prefix_result(prefix.operator, operand);
    if result.is_none() {
        validator.error(
            DiagnosticKind::InvalidPrefixOperation {
                operator: prefix.operator.symbol().to_string(),
                operand: operand.to_string(),
            },
            id,
        );
    }
    result
}
