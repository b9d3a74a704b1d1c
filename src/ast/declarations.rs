use crate::{
    errors::errors::CompilerError,
    signatures::signatures::{EventSignature, FunctionSignature, ParameterSignature},
};

use super::{
    ast::{Ast, NodeId, NodeKind},
    types::LslType,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationUnit {
    /// Global variable declarations in source order.
    pub globals: Vec<NodeId>,
    /// Function declarations in source order.
    pub functions: Vec<NodeId>,
    pub default_state: Option<NodeId>,
    pub states: Vec<NodeId>,
    /// Error nodes created while recovering at the top level.
    pub errors: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: LslType,
    pub parameters: NodeId,
    pub body: NodeId,
    /// Call sites resolved to this function.
    pub references: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterList {
    pub parameters: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: LslType,
    pub references: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateDecl {
    pub name: String,
    pub is_default: bool,
    pub handlers: Vec<NodeId>,
    /// State change statements targeting this state.
    pub references: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventHandlerDecl {
    pub name: String,
    pub parameters: NodeId,
    pub body: NodeId,
}

/// Which construct an error node stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    GlobalDeclaration,
    State,
    EventHandler,
    Statement,
    Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNode {
    pub context: ErrorContext,
}

fn parameter_signatures(ast: &Ast, list: NodeId) -> Vec<ParameterSignature> {
    let NodeKind::ParameterList(list) = &ast.node(list).kind else {
        return vec![];
    };

    list.parameters
        .iter()
        .enumerate()
        .filter_map(|(index, id)| match &ast.node(*id).kind {
            NodeKind::Parameter(p) => Some(ParameterSignature::new(&p.name, p.ty, false, index)),
            _ => None,
        })
        .collect()
}

impl EventHandlerDecl {
    /// Builds the signature this handler declares. Fails when the name is not
    /// a valid identifier or a parameter is unusable in an event.
    pub fn create_signature(&self, ast: &Ast) -> Result<EventSignature, CompilerError> {
        EventSignature::with_parameters(&self.name, parameter_signatures(ast, self.parameters))
    }
}

impl FunctionDecl {
    pub fn create_signature(&self, ast: &Ast) -> Result<FunctionSignature, CompilerError> {
        FunctionSignature::with_parameters(
            self.return_type,
            &self.name,
            parameter_signatures(ast, self.parameters),
        )
    }
}
