use std::fmt::Display;

use crate::Span;

use super::{
    declarations::{
        CompilationUnit, ErrorContext, ErrorNode, EventHandlerDecl, FunctionDecl, Parameter,
        ParameterList, StateDecl,
    },
    expressions::{Expr, ExpressionList, PrefixOperator},
    statements::Stmt,
    types::LslType,
};

/// Handle to a node stored in an `Ast` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Reachability of a statement, computed once by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadCodeState {
    #[default]
    Live,
    /// After a return, jump or state change with no targeted label in between.
    DeadUnconditional,
    /// Skipped by a jump whose target label follows in the same scope.
    DeadJumpOver,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    CompilationUnit(CompilationUnit),
    Function(FunctionDecl),
    ParameterList(ParameterList),
    Parameter(Parameter),
    State(StateDecl),
    EventHandler(EventHandlerDecl),
    Stmt(Stmt),
    Expr(Expr),
    ExprList(ExpressionList),
    Error(ErrorNode),
}

impl NodeKind {
    /// Direct children owned by this node.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::CompilationUnit(unit) => {
                let mut children = unit.globals.clone();
                children.extend(unit.functions.iter().copied());
                children.extend(unit.default_state);
                children.extend(unit.states.iter().copied());
                children.extend(unit.errors.iter().copied());
                children
            }
            NodeKind::Function(f) => vec![f.parameters, f.body],
            NodeKind::ParameterList(list) => list.parameters.clone(),
            NodeKind::Parameter(_) => vec![],
            NodeKind::State(state) => state.handlers.clone(),
            NodeKind::EventHandler(handler) => vec![handler.parameters, handler.body],
            NodeKind::Stmt(stmt) => stmt.children(),
            NodeKind::Expr(expr) => expr.children(),
            NodeKind::ExprList(list) => list.expressions.clone(),
            NodeKind::Error(_) => vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Option<Span>,
    pub parent: Option<NodeId>,
    pub has_errors: bool,
    pub dead_code: DeadCodeState,
    /// Static type of an expression, filled in by the validator.
    pub ty: LslType,
}

impl Node {
    pub fn is_dead_code(&self) -> bool {
        self.dead_code != DeadCodeState::Live
    }
}

/// Arena holding every node of one compilation unit.
///
/// Children are attached when their parent is added, so no node is left
/// detached once parsing has finished.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    /// Adds a node and attaches the children named by `kind` to it. The node
    /// inherits `has_errors` from any child carrying it.
    pub fn add(&mut self, kind: NodeKind, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let children = kind.children();

        self.nodes.push(Node {
            kind,
            span,
            parent: None,
            has_errors: false,
            dead_code: DeadCodeState::Live,
            ty: LslType::Void,
        });

        for child in children {
            self.attach(id, child);
        }

        id
    }

    pub fn add_error(&mut self, context: ErrorContext, span: Option<Span>) -> NodeId {
        let id = self.add(NodeKind::Error(ErrorNode { context }), span);
        self.nodes[id.0].has_errors = true;
        id
    }

    /// Sets `child`'s parent and propagates its error flag.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        if self.nodes[child.0].has_errors {
            self.nodes[parent.0].has_errors = true;
        }
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span.unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn ty(&self, id: NodeId) -> LslType {
        self.nodes[id.0].ty
    }

    pub fn expr(&self, id: NodeId) -> Option<&Expr> {
        match &self.nodes[id.0].kind {
            NodeKind::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn expr_mut(&mut self, id: NodeId) -> Option<&mut Expr> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn stmt(&self, id: NodeId) -> Option<&Stmt> {
        match &self.nodes[id.0].kind {
            NodeKind::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn stmt_mut(&mut self, id: NodeId) -> Option<&mut Stmt> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn expression_list(&self, id: NodeId) -> Option<&ExpressionList> {
        match &self.nodes[id.0].kind {
            NodeKind::ExprList(list) => Some(list),
            _ => None,
        }
    }

    pub fn compilation_unit(&self) -> Option<&CompilationUnit> {
        match self.root.map(|root| &self.nodes[root.0].kind) {
            Some(NodeKind::CompilationUnit(unit)) => Some(unit),
            _ => None,
        }
    }

    /// True when the tree is missing or its root carries errors.
    pub fn has_errors(&self) -> bool {
        match self.root {
            Some(root) => self.nodes[root.0].has_errors,
            None => true,
        }
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.0].kind.children()
    }

    /// `id` and every node below it, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = vec![];
        let mut stack = vec![id];

        while let Some(next) = stack.pop() {
            result.push(next);
            let mut children = self.children(next);
            children.reverse();
            stack.extend(children);
        }

        result
    }

    /// Whether evaluating the expression may change program state.
    pub fn has_side_effects(&self, id: NodeId) -> bool {
        match &self.nodes[id.0].kind {
            NodeKind::Expr(expr) => match expr {
                Expr::Call(_) | Expr::Postfix(_) => true,
                Expr::Binary(b) if b.operator.is_assignment() => true,
                Expr::Prefix(p) if p.operator.is_increment_or_decrement() => true,
                other => other.children().iter().any(|c| self.has_side_effects(*c)),
            },
            NodeKind::ExprList(list) => list.expressions.iter().any(|e| self.has_side_effects(*e)),
            _ => false,
        }
    }

    /// True when the parent of `id` is a unary minus.
    pub fn is_negated(&self, id: NodeId) -> bool {
        self.parent(id)
            .and_then(|p| self.expr(p))
            .map(|e| matches!(e, Expr::Prefix(p) if p.operator == PrefixOperator::Negate))
            .unwrap_or(false)
    }

    /// Scope id of the code scope directly holding a statement.
    pub fn enclosing_scope_id(&self, id: NodeId) -> Option<u32> {
        let parent = self.parent(id)?;
        match self.stmt(parent) {
            Some(Stmt::CodeScope(scope)) => Some(scope.scope_id),
            _ => None,
        }
    }

    /// True when `id` is the final statement of its code scope.
    pub fn is_last_statement_in_scope(&self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        match self.stmt(parent) {
            Some(Stmt::CodeScope(scope)) => scope.statements.last() == Some(&id),
            _ => false,
        }
    }

    /// Nearest ancestor (excluding `id`) for which `predicate` holds.
    pub fn find_ancestor(&self, id: NodeId, predicate: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if predicate(&self.nodes[node.0].kind) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }
}
