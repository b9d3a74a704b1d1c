use crate::{
    ast::{
        ast::{Ast, DeadCodeState, NodeId},
        statements::Stmt,
    },
    Span,
};

/// Marks unreachable statements inside a function or event body and returns
/// the span of every dead region found.
pub fn classify_dead_code(ast: &mut Ast, body: NodeId) -> Vec<Span> {
    let mut regions = vec![];
    classify_scope(ast, body, &mut regions);
    regions
}

fn scope_statements(ast: &Ast, scope: NodeId) -> Option<Vec<NodeId>> {
    match ast.stmt(scope) {
        Some(Stmt::CodeScope(scope)) => Some(scope.statements.clone()),
        _ => None,
    }
}

/// How control leaves a statement.
enum Exit {
    /// `return`, `state` or a jump backwards.
    Unconditional,
    /// A jump to a label further down.
    JumpOver(NodeId),
}

/// Walks one scope. Code after an exit stays dead until a targeted label.
/// While a forward jump's label is still ahead, dead code is jumped over,
/// whatever else ends the reachable code in between.
fn classify_scope(ast: &mut Ast, scope: NodeId, regions: &mut Vec<Span>) {
    let Some(statements) = scope_statements(ast, scope) else {
        return;
    };

    let mut dead = false;
    let mut pending: Vec<NodeId> = vec![];
    let mut region: Option<Span> = None;

    for statement in statements {
        pending.retain(|label| *label != statement);

        if dead {
            if is_targeted_label(ast, statement) {
                dead = false;
                regions.extend(region.take());
            } else {
                let state = if pending.is_empty() {
                    DeadCodeState::DeadUnconditional
                } else {
                    DeadCodeState::DeadJumpOver
                };
                mark(ast, statement, state);

                let span = ast.span(statement);
                region = Some(match region {
                    Some(region) => region.merge(&span),
                    None => span,
                });
                continue;
            }
        }

        for nested in nested_scopes(ast, statement) {
            classify_scope(ast, nested, regions);
        }

        match exit(ast, statement) {
            Some(Exit::Unconditional) => dead = true,
            Some(Exit::JumpOver(label)) => {
                dead = true;
                pending.push(label);
            }
            None => {}
        }
    }

    regions.extend(region);
}

fn mark(ast: &mut Ast, statement: NodeId, state: DeadCodeState) {
    for id in ast.descendants(statement) {
        ast.node_mut(id).dead_code = state;
    }
}

fn is_targeted_label(ast: &Ast, statement: NodeId) -> bool {
    matches!(ast.stmt(statement), Some(Stmt::Label(label)) if !label.jumps.is_empty())
}

/// Code scopes directly owned by a statement.
fn nested_scopes(ast: &Ast, statement: NodeId) -> Vec<NodeId> {
    match ast.stmt(statement) {
        Some(Stmt::CodeScope(_)) => vec![statement],
        Some(Stmt::Control(control)) => {
            let mut branches = vec![control.if_branch];
            branches.extend(control.else_ifs.iter().copied());
            branches.extend(control.else_branch);
            branches
                .into_iter()
                .flat_map(|branch| nested_scopes(ast, branch))
                .collect()
        }
        Some(Stmt::If(branch) | Stmt::ElseIf(branch)) => vec![branch.body],
        Some(Stmt::Else(branch)) => vec![branch.body],
        Some(Stmt::While(w)) => vec![w.body],
        Some(Stmt::DoWhile(d)) => vec![d.body],
        Some(Stmt::For(f)) => vec![f.body],
        _ => vec![],
    }
}

fn exit(ast: &Ast, statement: NodeId) -> Option<Exit> {
    match ast.stmt(statement)? {
        Stmt::Return(_) | Stmt::StateChange(_) => Some(Exit::Unconditional),
        Stmt::Jump(jump) => match jump.target {
            Some(label)
                if ast.span(label).start.offset > ast.span(statement).start.offset
                    && label_in_reach(ast, statement, label) =>
            {
                Some(Exit::JumpOver(label))
            }
            _ => Some(Exit::Unconditional),
        },
        _ => None,
    }
}

/// The label sits in the jump's own scope or one enclosing it. Labels in
/// nested or sibling blocks cannot be jumped to.
pub fn label_in_reach(ast: &Ast, jump: NodeId, label: NodeId) -> bool {
    let Some(label_scope) = ast.parent(label) else {
        return false;
    };

    let mut current = ast.parent(jump);
    while let Some(scope) = current {
        if scope == label_scope {
            return true;
        }
        current = ast.parent(scope);
    }
    false
}

/// Whether every live path through a code scope ends in a `return`.
pub fn returns_on_all_paths(ast: &Ast, scope: NodeId) -> bool {
    scope_statements(ast, scope)
        .map(|statements| {
            statements
                .iter()
                .any(|statement| statement_returns(ast, *statement))
        })
        .unwrap_or(false)
}

fn statement_returns(ast: &Ast, statement: NodeId) -> bool {
    if ast.node(statement).is_dead_code() {
        return false;
    }

    match ast.stmt(statement) {
        Some(Stmt::Return(_)) => true,
        Some(Stmt::CodeScope(_)) => returns_on_all_paths(ast, statement),
        Some(Stmt::Control(control)) => {
            let Some(else_branch) = control.else_branch else {
                return false;
            };

            control
                .else_ifs
                .iter()
                .chain([control.if_branch, else_branch].iter())
                .all(|branch| match ast.stmt(*branch) {
                    Some(Stmt::If(b) | Stmt::ElseIf(b)) => returns_on_all_paths(ast, b.body),
                    Some(Stmt::Else(b)) => returns_on_all_paths(ast, b.body),
                    _ => false,
                })
        }
        _ => false,
    }
}
