/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The node arena, node kinds and tree queries
/// - declarations: Compilation unit, functions, states and event handlers
/// - expressions: Expression variants and operators
/// - statements: Statement variants and code scopes
/// - types: The script value types
pub mod ast;
pub mod declarations;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
