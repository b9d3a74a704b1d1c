use super::{ast::NodeId, types::LslType};

/// Where a code scope appears. Function, event and loop bodies receive a
/// co-operative termination check when that option is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeScopeType {
    Function,
    EventHandler,
    AnonymousBlock,
    IfBody,
    ElseIfBody,
    ElseBody,
    WhileLoop,
    DoLoop,
    ForLoop,
}

impl CodeScopeType {
    pub fn is_coop_checkpoint(&self) -> bool {
        matches!(
            self,
            CodeScopeType::Function
                | CodeScopeType::EventHandler
                | CodeScopeType::WhileLoop
                | CodeScopeType::DoLoop
                | CodeScopeType::ForLoop
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeScope {
    pub statements: Vec<NodeId>,
    pub scope_id: u32,
    pub scope_type: CodeScopeType,
    /// Created around a body written without braces.
    pub is_single_statement: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: LslType,
    pub name: String,
    pub initializer: Option<NodeId>,
    /// Every variable reference resolved to this declaration.
    pub references: Vec<NodeId>,
    pub is_global: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStmt {
    pub expression: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JumpStmt {
    pub label: String,
    pub target: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStmt {
    pub name: String,
    /// Jump statements that target this label.
    pub jumps: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateChangeStmt {
    pub state: String,
    pub target: Option<NodeId>,
}

/// An `if` with its `else if` and `else` branches.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlStmt {
    pub if_branch: NodeId,
    pub else_ifs: Vec<NodeId>,
    pub else_branch: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseBranch {
    pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: NodeId,
    pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoLoop {
    pub body: NodeId,
    pub condition: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub init: Option<NodeId>,
    pub condition: Option<NodeId>,
    pub afterthought: Option<NodeId>,
    pub body: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    CodeScope(CodeScope),
    VarDecl(VarDecl),
    Expression(ExpressionStmt),
    Return(ReturnStmt),
    Jump(JumpStmt),
    Label(LabelStmt),
    StateChange(StateChangeStmt),
    Control(ControlStmt),
    If(ConditionalBranch),
    ElseIf(ConditionalBranch),
    Else(ElseBranch),
    While(WhileLoop),
    DoWhile(DoLoop),
    For(ForLoop),
    Empty,
}

impl Stmt {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Stmt::CodeScope(scope) => scope.statements.clone(),
            Stmt::VarDecl(decl) => decl.initializer.into_iter().collect(),
            Stmt::Expression(stmt) => vec![stmt.expression],
            Stmt::Return(ret) => ret.value.into_iter().collect(),
            Stmt::Jump(_) | Stmt::Label(_) | Stmt::StateChange(_) | Stmt::Empty => vec![],
            Stmt::Control(control) => {
                let mut children = vec![control.if_branch];
                children.extend(control.else_ifs.iter().copied());
                children.extend(control.else_branch);
                children
            }
            Stmt::If(branch) | Stmt::ElseIf(branch) => vec![branch.condition, branch.body],
            Stmt::Else(branch) => vec![branch.body],
            Stmt::While(w) => vec![w.condition, w.body],
            Stmt::DoWhile(d) => vec![d.body, d.condition],
            Stmt::For(f) => f
                .init
                .into_iter()
                .chain(f.condition)
                .chain(f.afterthought)
                .chain(std::iter::once(f.body))
                .collect(),
        }
    }

    /// Statements after which the rest of the scope is unreachable.
    pub fn is_unconditional_exit(&self) -> bool {
        matches!(self, Stmt::Return(_) | Stmt::Jump(_) | Stmt::StateChange(_))
    }
}
