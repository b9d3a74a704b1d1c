use crate::{
    ast::{
        ast::{Ast, DeadCodeState, NodeId, NodeKind},
        expressions::Expr,
        statements::{CodeScope, ConditionalBranch, Stmt, VarDecl},
        types::LslType,
    },
    errors::errors::CompilerError,
};

use super::{
    compiler::Compiler,
    expr::{gen_assigned_value, gen_expression, gen_expression_list},
    utilities::{csharp_type, default_initializer, string_code_literal},
};

pub fn gen_statement(compiler: &mut Compiler<'_>, id: NodeId) -> Result<(), CompilerError> {
    let ast = compiler.ast;
    if ast.node(id).is_dead_code() && !is_targeted_label(ast, id) {
        return Ok(());
    }

    let statement = ast
        .stmt(id)
        .ok_or_else(|| CompilerError::Internal(format!("node {:?} is not a statement", id)))?;

    match statement {
        Stmt::CodeScope(scope) => gen_code_scope(compiler, scope),
        Stmt::VarDecl(decl) => {
            if is_safe_to_prune(ast, decl) {
                return Ok(());
            }
            gen_local_declaration(compiler, id, decl)
        }
        Stmt::Expression(statement) => {
            if !ast.has_side_effects(statement.expression) {
                return Ok(());
            }
            compiler.write_indent()?;
            gen_expression(compiler, statement.expression)?;
            compiler.write_line(";")
        }
        Stmt::Return(statement) => {
            compiler.write_indent()?;
            match statement.value {
                // Event handlers return nothing, the value is still evaluated.
                Some(value) if compiler.current_event_handler.is_some() => {
                    compiler.write("UTILITIES.ForceStatement(")?;
                    gen_expression(compiler, value)?;
                    compiler.write_line(");")?;
                    compiler.write_indented_line("return;")
                }
                Some(value) => {
                    compiler.write("return ")?;
                    gen_expression(compiler, value)?;
                    compiler.write_line(";")
                }
                None => compiler.write_line("return;"),
            }
        }
        Stmt::Jump(jump) => compiler.write_indented_line(&format!("goto LSLLabel_{};", jump.label)),
        Stmt::Label(label) => {
            if label.jumps.is_empty() {
                return Ok(());
            }

            if compiler.settings.insert_coop_termination_calls {
                compiler.write_indented_line(&format!("LSLLabel_{}:", label.name))?;
                compiler.write_coop_termination_call()
            } else if ast.is_last_statement_in_scope(id) {
                compiler.write_indented_line(&format!("LSLLabel_{}: ;", label.name))
            } else {
                compiler.write_indented_line(&format!("LSLLabel_{}:", label.name))
            }
        }
        Stmt::StateChange(change) => {
            compiler.write_indented_line(&format!("this.state(\"{}\");", change.state))
        }
        Stmt::Control(control) => {
            gen_statement(compiler, control.if_branch)?;
            for branch in &control.else_ifs {
                gen_statement(compiler, *branch)?;
            }
            if let Some(branch) = control.else_branch {
                gen_statement(compiler, branch)?;
            }
            Ok(())
        }
        Stmt::If(branch) => gen_branch(compiler, "if", branch),
        Stmt::ElseIf(branch) => gen_branch(compiler, "else if", branch),
        Stmt::Else(branch) => {
            compiler.write_indented_line("else")?;
            gen_statement(compiler, branch.body)
        }
        Stmt::While(statement) => {
            compiler.write_indent()?;
            compiler.write("while(")?;
            gen_condition(compiler, statement.condition)?;
            compiler.write_line(")")?;
            gen_statement(compiler, statement.body)
        }
        Stmt::DoWhile(statement) => {
            compiler.write_indented_line("do")?;
            gen_statement(compiler, statement.body)?;
            compiler.write_indent()?;
            compiler.write("while(")?;
            gen_condition(compiler, statement.condition)?;
            compiler.write_line(");")
        }
        Stmt::For(statement) => {
            compiler.write_indent()?;
            compiler.write("for(")?;
            if let Some(init) = statement.init {
                gen_expression_list(compiler, init)?;
            }
            compiler.write(";")?;
            if let Some(condition) = statement.condition {
                gen_condition(compiler, condition)?;
            }
            compiler.write(";")?;
            if let Some(afterthought) = statement.afterthought {
                gen_expression_list(compiler, afterthought)?;
            }
            compiler.write_line(")")?;
            gen_statement(compiler, statement.body)
        }
        Stmt::Empty => Ok(()),
    }
}

fn is_targeted_label(ast: &Ast, id: NodeId) -> bool {
    matches!(ast.stmt(id), Some(Stmt::Label(label)) if !label.jumps.is_empty())
}

/// An unread local whose initializer, if any, does nothing observable.
fn is_safe_to_prune(ast: &Ast, decl: &VarDecl) -> bool {
    decl.references.is_empty()
        && decl
            .initializer
            .map(|initializer| !ast.has_side_effects(initializer))
            .unwrap_or(true)
}

fn local_name(ast: &Ast, id: NodeId, decl: &VarDecl) -> Result<String, CompilerError> {
    let scope = ast.enclosing_scope_id(id).ok_or_else(|| {
        CompilerError::Internal(format!("local {:?} is not inside a code scope", decl.name))
    })?;
    Ok(format!("LV{}_{}", scope, decl.name))
}

fn gen_local_declaration(
    compiler: &mut Compiler<'_>,
    id: NodeId,
    decl: &VarDecl,
) -> Result<(), CompilerError> {
    let name = local_name(compiler.ast, id, decl)?;
    let ty = csharp_type(decl.ty, compiler.settings.keys_are_strings);

    compiler.write_indent()?;
    compiler.write(&format!("{} {} = ", ty, name))?;
    match decl.initializer {
        Some(initializer) => gen_assigned_value(compiler, decl.ty, initializer)?,
        None => compiler.write(&default_initializer(decl.ty))?,
    }
    compiler.write_line(";")
}

/// Writes a braced scope. Declarations a forward jump skips over are
/// declared at the top of the scope so the target can still use them.
fn gen_code_scope(compiler: &mut Compiler<'_>, scope: &CodeScope) -> Result<(), CompilerError> {
    let ast = compiler.ast;

    compiler.write_indented_line("{")?;
    compiler.indent_level += 1;

    for statement in &scope.statements {
        let Some(Stmt::VarDecl(decl)) = ast.stmt(*statement) else {
            continue;
        };
        if ast.node(*statement).dead_code != DeadCodeState::DeadJumpOver
            || is_safe_to_prune(ast, decl)
        {
            continue;
        }

        let name = local_name(ast, *statement, decl)?;
        log::trace!("hoisting {} above a forward jump", name);
        compiler.write_indented_line(&format!(
            "{} {} = {};",
            csharp_type(decl.ty, compiler.settings.keys_are_strings),
            name,
            default_initializer(decl.ty)
        ))?;
    }

    if scope.scope_type.is_coop_checkpoint() {
        compiler.write_coop_termination_call()?;
    }

    for statement in &scope.statements {
        gen_statement(compiler, *statement)?;
    }

    compiler.indent_level -= 1;
    compiler.write_indented_line("}")
}

fn gen_branch(
    compiler: &mut Compiler<'_>,
    keyword: &str,
    branch: &ConditionalBranch,
) -> Result<(), CompilerError> {
    compiler.write_indent()?;
    compiler.write(&format!("{}(", keyword))?;
    gen_condition(compiler, branch.condition)?;
    compiler.write_line(")")?;
    gen_statement(compiler, branch.body)
}

/// Writes an expression used as a truth value. Strings test for being
/// non-empty; with keys as strings a key is wrapped back into a key so it
/// tests for validity.
fn gen_condition(compiler: &mut Compiler<'_>, id: NodeId) -> Result<(), CompilerError> {
    let ast = compiler.ast;

    match ast.ty(id) {
        LslType::Key if compiler.settings.keys_are_strings => {
            compiler.write(&format!("new {}(", csharp_type(LslType::Key, false)))?;
            match string_literal_under_cast(ast, id) {
                Some(literal) => compiler.write(&literal)?,
                None => gen_expression(compiler, id)?,
            }
            compiler.write(")")
        }
        LslType::String => {
            compiler.write("UTILITIES.ToBool(")?;
            gen_expression(compiler, id)?;
            compiler.write(")")
        }
        _ => gen_expression(compiler, id),
    }
}

/// `(key)"..."` written as just the quoted text.
fn string_literal_under_cast(ast: &Ast, id: NodeId) -> Option<String> {
    let Some(Expr::Cast(cast)) = ast.expr(id) else {
        return None;
    };
    match ast.kind(cast.operand) {
        NodeKind::Expr(Expr::String(literal)) => Some(string_code_literal(&literal.value)),
        _ => None,
    }
}
