use crate::{
    ast::{
        ast::{Ast, NodeId, NodeKind},
        expressions::{
            BinaryExpr, BinaryOperator, Binding, CallTarget, Expr, ExpressionListKind,
            FunctionCall, PrefixOperator, TypecastExpr,
        },
        statements::Stmt,
        types::LslType,
    },
    errors::errors::CompilerError,
    lexer::lexer::tokenize,
    library::library::LibraryConstantSignature,
    parser::parser::parse_expression,
    validator::operators::binary_result,
};

use super::{
    compiler::{BinaryOperationSignature, Compiler},
    utilities::{
        csharp_type, float_overflow, format_float, hex_overflow, integer_overflow,
        mod_invoke_function, should_box, string_code_literal, LiteralKind, LiteralOverflow,
        LiteralParent,
    },
};

pub fn gen_expression(compiler: &mut Compiler<'_>, id: NodeId) -> Result<(), CompilerError> {
    let ast = compiler.ast;
    let expr = ast
        .expr(id)
        .ok_or_else(|| CompilerError::Internal(format!("node {:?} is not an expression", id)))?;

    match expr {
        Expr::Integer(literal) => {
            let text = match integer_overflow(&literal.raw) {
                LiteralOverflow::None => literal.raw.clone(),
                _ => overflowed_integer(ast, id),
            };
            gen_literal(compiler, id, LiteralKind::Integer, LslType::Integer, &text)
        }
        Expr::Hex(literal) => {
            let text = match hex_overflow(&literal.raw) {
                LiteralOverflow::None => literal.raw.clone(),
                _ => overflowed_integer(ast, id),
            };
            gen_literal(compiler, id, LiteralKind::Hex, LslType::Integer, &text)
        }
        Expr::Float(literal) => {
            let text = match float_overflow(&literal.raw) {
                LiteralOverflow::Overflow => String::from("float.PositiveInfinity"),
                LiteralOverflow::Underflow => String::from("0.0"),
                LiteralOverflow::None => format_float(&literal.raw),
            };
            gen_literal(compiler, id, LiteralKind::Float, LslType::Float, &text)
        }
        Expr::String(literal) => {
            let text = string_code_literal(&literal.value);
            gen_literal(compiler, id, LiteralKind::String, LslType::String, &text)
        }
        Expr::Vector(vector) => {
            compiler.write(&format!("(new {}(", csharp_type(LslType::Vector, false)))?;
            gen_components(compiler, &[vector.x, vector.y, vector.z])?;
            compiler.write("))")
        }
        Expr::Rotation(rotation) => {
            compiler.write(&format!("(new {}(", csharp_type(LslType::Rotation, false)))?;
            gen_components(compiler, &[rotation.x, rotation.y, rotation.z, rotation.s])?;
            compiler.write("))")
        }
        Expr::List(list) => {
            let empty = ast
                .expression_list(list.elements)
                .map(|elements| elements.expressions.is_empty())
                .unwrap_or(true);

            if empty {
                compiler.write("(new LSL_Types.list())")
            } else {
                compiler.write("(new LSL_Types.list(")?;
                gen_expression_list(compiler, list.elements)?;
                compiler.write("))")
            }
        }
        Expr::Variable(variable) => gen_variable(compiler, &variable.name, variable.binding),
        Expr::Call(call) => gen_call(compiler, call),
        Expr::Binary(binary) => gen_binary(compiler, id, binary),
        Expr::Prefix(prefix) => {
            let operand_type = ast.ty(prefix.operand);

            if operand_type == LslType::Rotation
                || (operand_type == LslType::Vector && prefix.operator == PrefixOperator::Negate)
            {
                compiler.write("UTILITIES.Negate(")?;
                gen_expression(compiler, prefix.operand)?;
                return compiler.write(")");
            }

            let in_statement = is_expression_statement(ast, id);
            let parenthesize = !(in_statement || is_in_expression_list(ast, id));
            let standalone = !prefix.operator.is_increment_or_decrement();

            if in_statement && standalone {
                compiler.write("UTILITIES.ForceStatement(")?;
            }
            if parenthesize {
                compiler.write("(")?;
            }

            compiler.write(prefix.operator.symbol())?;
            if standalone {
                compiler.write("(")?;
                gen_expression(compiler, prefix.operand)?;
                compiler.write(")")?;
            } else {
                gen_expression(compiler, prefix.operand)?;
            }

            if parenthesize {
                compiler.write(")")?;
            }
            if in_statement && standalone {
                compiler.write(")")?;
            }
            Ok(())
        }
        Expr::Postfix(postfix) => {
            let parenthesize = !(is_expression_statement(ast, id) || is_in_expression_list(ast, id));

            if parenthesize {
                compiler.write("(")?;
            }
            gen_expression(compiler, postfix.operand)?;
            compiler.write(postfix.operator.symbol())?;
            if parenthesize {
                compiler.write(")")?;
            }
            Ok(())
        }
        Expr::Cast(cast) => gen_cast(compiler, cast),
        Expr::Parenthesized(parenthesized) => {
            if is_expression_statement(ast, id) {
                compiler.write("UTILITIES.ForceStatement(")?;
                gen_expression(compiler, parenthesized.inner)?;
                compiler.write(")")
            } else if is_in_expression_list(ast, id) {
                gen_expression(compiler, parenthesized.inner)
            } else {
                compiler.write("(")?;
                gen_expression(compiler, parenthesized.inner)?;
                compiler.write(")")
            }
        }
        Expr::Component(access) => {
            gen_expression(compiler, access.target)?;
            compiler.write(".")?;
            compiler.write(access.component.name())
        }
    }
}

/// Value written for an integer literal that does not fit in 32 bits.
fn overflowed_integer(ast: &Ast, id: NodeId) -> String {
    if ast.is_negated(id) {
        String::from("1")
    } else {
        String::from("-1")
    }
}

fn gen_literal(
    compiler: &mut Compiler<'_>,
    id: NodeId,
    kind: LiteralKind,
    ty: LslType,
    text: &str,
) -> Result<(), CompilerError> {
    if should_box(kind, literal_parent(compiler, id)) {
        compiler.write(&format!("new {}({})", csharp_type(ty, false), text))
    } else {
        compiler.write(text)
    }
}

/// Classifies the node directly holding a literal.
fn literal_parent(compiler: &Compiler<'_>, id: NodeId) -> LiteralParent {
    let ast = compiler.ast;
    let Some(parent) = ast.parent(id) else {
        return LiteralParent::Other;
    };

    match ast.kind(parent) {
        NodeKind::Expr(Expr::Binary(binary)) if binary.operator.is_logical() => {
            LiteralParent::LogicalOperator
        }
        NodeKind::Expr(Expr::Binary(_)) => LiteralParent::Operator,
        NodeKind::Expr(Expr::Vector(_) | Expr::Rotation(_)) => LiteralParent::VectorOrRotation,
        NodeKind::ExprList(list) if list.kind == ExpressionListKind::FunctionArguments => {
            let mod_invoke = ast
                .parent(parent)
                .and_then(|call| ast.expr(call))
                .map(|call| match call {
                    Expr::Call(call) => is_mod_invoke(compiler, call),
                    _ => false,
                })
                .unwrap_or(false);
            LiteralParent::CallArgument { mod_invoke }
        }
        NodeKind::Stmt(Stmt::VarDecl(_)) => LiteralParent::VariableInitializer,
        _ => LiteralParent::Other,
    }
}

fn is_mod_invoke(compiler: &Compiler<'_>, call: &FunctionCall) -> bool {
    match &call.target {
        CallTarget::Library(signature) => compiler
            .library
            .get_library_function_signature(signature)
            .map(|library| library.metadata.mod_invoke())
            .unwrap_or(false),
        _ => false,
    }
}

fn is_expression_statement(ast: &Ast, id: NodeId) -> bool {
    matches!(
        ast.parent(id).and_then(|parent| ast.stmt(parent)),
        Some(Stmt::Expression(_))
    )
}

fn is_in_expression_list(ast: &Ast, id: NodeId) -> bool {
    matches!(
        ast.parent(id).map(|parent| ast.kind(parent)),
        Some(NodeKind::ExprList(_))
    )
}

fn gen_components(compiler: &mut Compiler<'_>, components: &[NodeId]) -> Result<(), CompilerError> {
    for (index, component) in components.iter().enumerate() {
        if index > 0 {
            compiler.write(", ")?;
        }
        gen_expression(compiler, *component)?;
    }
    Ok(())
}

/// Writes the members of an expression list separated by commas. For loop
/// clauses leave out members without side effects.
pub fn gen_expression_list(compiler: &mut Compiler<'_>, id: NodeId) -> Result<(), CompilerError> {
    let ast = compiler.ast;
    let list = ast
        .expression_list(id)
        .ok_or_else(|| CompilerError::Internal(format!("node {:?} is not an expression list", id)))?;

    let skip_pure = matches!(
        list.kind,
        ExpressionListKind::ForLoopInit | ExpressionListKind::ForLoopAfterthought
    );

    let members: Vec<NodeId> = list
        .expressions
        .iter()
        .copied()
        .filter(|member| !skip_pure || ast.has_side_effects(*member))
        .collect();

    for (index, member) in members.iter().enumerate() {
        if index > 0 {
            compiler.write(",")?;
        }
        gen_expression(compiler, *member)?;
    }
    Ok(())
}

/// Whether an expression list writes anything at all.
pub fn expression_list_is_empty(ast: &Ast, id: NodeId) -> bool {
    let Some(list) = ast.expression_list(id) else {
        return true;
    };

    match list.kind {
        ExpressionListKind::ForLoopInit | ExpressionListKind::ForLoopAfterthought => !list
            .expressions
            .iter()
            .any(|member| ast.has_side_effects(*member)),
        _ => list.expressions.is_empty(),
    }
}

fn gen_variable(compiler: &mut Compiler<'_>, name: &str, binding: Binding) -> Result<(), CompilerError> {
    let ast = compiler.ast;

    match binding {
        Binding::Global(_) if compiler.settings.generate_class => {
            compiler.write(&format!("this.GV_{}", name))
        }
        Binding::Global(_) if compiler.writing_globals_container => {
            compiler.write(&format!("this.V_{}", name))
        }
        Binding::Global(_) => compiler.write(&format!("this.Globals.V_{}", name)),
        Binding::Local(decl) => {
            let scope = ast.enclosing_scope_id(decl).ok_or_else(|| {
                CompilerError::Internal(format!("local {:?} is not inside a code scope", name))
            })?;
            compiler.write(&format!("LV{}_{}", scope, name))
        }
        Binding::Parameter(_) => compiler.write(&format!("PM_{}", name)),
        Binding::LibraryConstant => {
            let constant = compiler
                .library
                .get_library_constant_signature(name)
                .ok_or_else(|| CompilerError::Internal(format!("unknown library constant {:?}", name)))?;

            if constant.metadata.expand() {
                let text = expanded_constant(compiler, constant)?;
                compiler.write(&text)
            } else {
                compiler.write(name)
            }
        }
        Binding::Unresolved => Err(CompilerError::Internal(format!(
            "unresolved variable {:?}",
            name
        ))),
    }
}

/// The value of a library constant written out in place of its name.
fn expanded_constant(
    compiler: &Compiler<'_>,
    constant: &LibraryConstantSignature,
) -> Result<String, CompilerError> {
    let signature = constant.signature();
    let settings = compiler.settings;

    match signature.ty() {
        LslType::String => Ok(format!(
            "new {}({})",
            csharp_type(LslType::String, false),
            constant.value_string_as_code_literal()
        )),
        LslType::Key => Ok(format!(
            "new {}({})",
            csharp_type(
                LslType::Key,
                settings.keys_are_strings || settings.key_constants_that_expand_are_strings
            ),
            constant.value_string_as_code_literal()
        )),
        LslType::Integer | LslType::Float | LslType::Vector | LslType::Rotation => Ok(format!(
            "new {}({})",
            csharp_type(signature.ty(), false),
            signature.value_string()
        )),
        LslType::List => expanded_list_constant(compiler, &constant.value_string_as_code_literal()),
        LslType::Void => Err(CompilerError::Internal(format!(
            "library constant {:?} has no type",
            signature.name()
        ))),
    }
}

/// Re-parses a list constant's value and builds it element by element.
fn expanded_list_constant(compiler: &Compiler<'_>, literal: &str) -> Result<String, CompilerError> {
    let (tokens, errors) = tokenize(literal);
    if let Some(error) = errors.first() {
        return Err(CompilerError::Internal(format!(
            "list constant {} does not tokenize: {}",
            literal, error.message
        )));
    }

    let parsed = parse_expression(tokens).map_err(|error| {
        CompilerError::Internal(format!(
            "list constant {} does not parse: {}",
            literal, error.message
        ))
    })?;

    let elements = parsed
        .root()
        .and_then(|root| match parsed.expr(root) {
            Some(Expr::List(list)) => parsed.expression_list(list.elements),
            _ => None,
        })
        .ok_or_else(|| CompilerError::Internal(format!("{} is not a list", literal)))?;

    let members = elements
        .expressions
        .iter()
        .map(|element| list_constant_element(compiler, &parsed, *element))
        .collect::<Result<Vec<_>, _>>()?;

    if members.is_empty() {
        Ok(String::from("new LSL_Types.list()"))
    } else {
        Ok(format!("new LSL_Types.list({})", members.join(", ")))
    }
}

fn list_constant_element(
    compiler: &Compiler<'_>,
    ast: &Ast,
    element: NodeId,
) -> Result<String, CompilerError> {
    let keys_as_strings = compiler.settings.keys_are_strings
        || compiler
            .settings
            .key_elements_in_list_constants_that_expand_are_strings;

    match ast.expr(element) {
        Some(Expr::String(literal)) => Ok(format!(
            "new {}({})",
            csharp_type(LslType::String, false),
            string_code_literal(&literal.value)
        )),
        Some(Expr::Cast(TypecastExpr {
            cast_type: LslType::Key,
            operand,
        })) => match ast.expr(*operand) {
            Some(Expr::String(literal)) => Ok(format!(
                "new {}({})",
                csharp_type(LslType::Key, keys_as_strings),
                string_code_literal(&literal.value)
            )),
            _ => Err(unsupported_element(ast, element)),
        },
        Some(Expr::Integer(_) | Expr::Hex(_) | Expr::Prefix(_)) => {
            let text = numeric_text(ast, element)?;
            let ty = if text.contains('.') {
                LslType::Float
            } else {
                LslType::Integer
            };
            Ok(format!("new {}({})", csharp_type(ty, false), text))
        }
        Some(Expr::Float(_)) => Ok(format!(
            "new {}({})",
            csharp_type(LslType::Float, false),
            numeric_text(ast, element)?
        )),
        Some(Expr::Vector(vector)) => Ok(format!(
            "new {}({})",
            csharp_type(LslType::Vector, false),
            numeric_components(ast, &[vector.x, vector.y, vector.z])?
        )),
        Some(Expr::Rotation(rotation)) => Ok(format!(
            "new {}({})",
            csharp_type(LslType::Rotation, false),
            numeric_components(ast, &[rotation.x, rotation.y, rotation.z, rotation.s])?
        )),
        _ => Err(unsupported_element(ast, element)),
    }
}

fn unsupported_element(ast: &Ast, element: NodeId) -> CompilerError {
    CompilerError::Internal(format!(
        "unsupported list constant element at column {}",
        ast.span(element).start.column
    ))
}

fn numeric_components(ast: &Ast, components: &[NodeId]) -> Result<String, CompilerError> {
    Ok(components
        .iter()
        .map(|component| numeric_text(ast, *component))
        .collect::<Result<Vec<_>, _>>()?
        .join(", "))
}

/// Source form of a possibly negated number inside a constant value.
fn numeric_text(ast: &Ast, id: NodeId) -> Result<String, CompilerError> {
    match ast.expr(id) {
        Some(Expr::Integer(literal)) => Ok(literal.raw.clone()),
        Some(Expr::Hex(literal)) => Ok(literal.raw.clone()),
        Some(Expr::Float(literal)) => Ok(format_float(&literal.raw)),
        Some(Expr::Prefix(prefix)) if prefix.operator == PrefixOperator::Negate => {
            Ok(format!("-{}", numeric_text(ast, prefix.operand)?))
        }
        _ => Err(unsupported_element(ast, id)),
    }
}

fn gen_call(compiler: &mut Compiler<'_>, call: &FunctionCall) -> Result<(), CompilerError> {
    let has_arguments = !expression_list_is_empty(compiler.ast, call.arguments);

    match &call.target {
        CallTarget::User(_) => {
            compiler.write(&format!("FN_{}(", call.name))?;
        }
        CallTarget::Library(signature) => {
            let library = compiler
                .library
                .get_library_function_signature(signature)
                .ok_or_else(|| {
                    CompilerError::Internal(format!("unknown library function {:?}", call.name))
                })?;

            if library.metadata.mod_invoke() {
                compiler.write(&format!(
                    "this.{}(\"{}\"",
                    mod_invoke_function(library.return_type()),
                    call.name
                ))?;
                if has_arguments {
                    compiler.write(", ")?;
                }
            } else {
                compiler.write(&format!("this.{}(", call.name))?;
            }
        }
        CallTarget::Unresolved => {
            return Err(CompilerError::Internal(format!(
                "unresolved call to {:?}",
                call.name
            )))
        }
    }

    if has_arguments {
        gen_expression_list(compiler, call.arguments)?;
    }
    compiler.write(")")
}

fn gen_binary(
    compiler: &mut Compiler<'_>,
    id: NodeId,
    binary: &BinaryExpr,
) -> Result<(), CompilerError> {
    let ast = compiler.ast;
    let left_type = ast.ty(binary.left);
    let right_type = ast.ty(binary.right);

    match binary.operator {
        BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => {
            let joiner = if binary.operator == BinaryOperator::LogicalAnd {
                " & "
            } else {
                " | "
            };

            compiler.write("((bool)(")?;
            gen_expression(compiler, binary.right)?;
            compiler.write(&format!(")){}((bool)(", joiner))?;
            gen_expression(compiler, binary.left)?;
            compiler.write("))")
        }
        BinaryOperator::MultiplyAssign
            if left_type == LslType::Integer && right_type == LslType::Float =>
        {
            gen_expression(compiler, binary.left)?;
            compiler.write(" = new LSL_Types.LSLInteger(System.Math.Round((double)")?;
            gen_expression(compiler, binary.left)?;
            compiler.write(") * ")?;
            gen_expression(compiler, binary.right)?;
            compiler.write(")")
        }
        BinaryOperator::Assign => {
            gen_expression(compiler, binary.left)?;
            compiler.write(" = ")?;
            gen_assigned_value(compiler, left_type, binary.right)
        }
        operator if operator.is_modifying_assignment() => {
            let underlying = operator.underlying();
            let stub = compiler.use_binary_operation(BinaryOperationSignature {
                left: left_type,
                operator: underlying,
                right: right_type,
                returns: binary_result(left_type, underlying, right_type).unwrap_or(ast.ty(id)),
            });

            gen_expression(compiler, binary.left)?;
            compiler.write(&format!(" = {}(", stub))?;
            gen_expression(compiler, binary.right)?;
            compiler.write(",")?;
            gen_expression(compiler, binary.left)?;
            compiler.write(")")
        }
        operator => {
            let stub = compiler.use_binary_operation(BinaryOperationSignature {
                left: left_type,
                operator,
                right: right_type,
                returns: ast.ty(id),
            });

            compiler.write(&format!("{}(", stub))?;
            gen_expression(compiler, binary.right)?;
            compiler.write(",")?;
            gen_expression(compiler, binary.left)?;
            compiler.write(")")
        }
    }
}

/// Writes a value stored into a variable of type `target`. Strings stored
/// into keys are converted explicitly unless keys are strings already.
pub fn gen_assigned_value(
    compiler: &mut Compiler<'_>,
    target: LslType,
    value: NodeId,
) -> Result<(), CompilerError> {
    let ast = compiler.ast;

    if compiler.settings.keys_are_strings
        || target != LslType::Key
        || ast.ty(value) != LslType::String
    {
        return gen_expression(compiler, value);
    }

    match ast.expr(value) {
        Some(Expr::String(literal)) => compiler.write(&string_code_literal(&literal.value)),
        _ => {
            compiler.write(&format!("new {}(", csharp_type(LslType::Key, false)))?;
            gen_expression(compiler, value)?;
            compiler.write(")")
        }
    }
}

fn gen_cast(compiler: &mut Compiler<'_>, cast: &TypecastExpr) -> Result<(), CompilerError> {
    let ast = compiler.ast;
    let operand_type = ast.ty(cast.operand);
    let is_text = |ty: LslType| matches!(ty, LslType::String | LslType::Key);

    if cast.cast_type == operand_type
        || (compiler.settings.keys_are_strings && is_text(cast.cast_type) && is_text(operand_type))
    {
        return gen_expression(compiler, cast.operand);
    }

    if cast.cast_type == LslType::Key && operand_type == LslType::String {
        compiler.write(&format!("(new {}(", csharp_type(LslType::Key, false)))?;
        match ast.expr(cast.operand) {
            Some(Expr::String(literal)) => compiler.write(&string_code_literal(&literal.value))?,
            _ => gen_expression(compiler, cast.operand)?,
        }
        return compiler.write("))");
    }

    compiler.write(&format!("({})(", csharp_type(cast.cast_type, false)))?;
    gen_expression(compiler, cast.operand)?;
    compiler.write(")")
}
