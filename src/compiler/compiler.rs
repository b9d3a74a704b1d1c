//! Main compiler module.
//!
//! Holds the [`Compiler`] context for one compilation and drives the output
//! of a whole compilation unit: header, optional class wrapper, utility
//! class, globals, functions, states and the binary operator stubs.

use std::{
    collections::BTreeSet,
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    ast::{
        ast::{Ast, NodeId, NodeKind},
        declarations::{CompilationUnit, FunctionDecl, StateDecl},
        expressions::BinaryOperator,
        statements::{Stmt, VarDecl},
        types::LslType,
    },
    errors::errors::CompilerError,
    library::provider::LibraryDataProvider,
};

use super::{
    expr::gen_assigned_value,
    settings::CompilerSettings,
    stmt::gen_statement,
    utilities::{csharp_type, default_initializer, format_timestamp, utility_library},
};

/// A binary operation routed through a generated stub method.
///
/// Ordered by operand types first so stubs come out in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BinaryOperationSignature {
    pub left: LslType,
    pub operator: BinaryOperator,
    pub right: LslType,
    pub returns: LslType,
}

impl BinaryOperationSignature {
    /// `_o` followed by the left type, operator and right type codes.
    pub fn stub_name(&self) -> String {
        format!(
            "_o{}{}{}",
            self.left.code(),
            self.operator.code(),
            self.right.code()
        )
    }
}

/// State of one code generation run.
///
/// A new context is created for every call to [`compile`], so independent
/// compilations never share anything but the read-only library.
pub struct Compiler<'a> {
    /// The validated tree being compiled
    pub ast: &'a Ast,
    /// Library used to look up call and constant metadata
    pub library: &'a dyn LibraryDataProvider,
    pub settings: &'a CompilerSettings,

    writer: &'a mut dyn Write,

    /// Current indentation depth, in tabs
    pub indent_level: usize,
    /// Operator stubs referenced so far, written once each at the end
    pub binary_operations: BTreeSet<BinaryOperationSignature>,
    /// Name of the state whose handlers are being written
    pub current_state: Option<String>,
    /// Event handler being written, if any
    pub current_event_handler: Option<NodeId>,
    /// Set while writing the constructor of the globals container
    pub writing_globals_container: bool,
}

impl<'a> Compiler<'a> {
    /// Creates a new Compiler instance.
    ///
    /// # Arguments
    ///
    /// * `ast` - A validated compilation unit without errors
    /// * `library` - The library the tree was validated against
    /// * `settings` - Validated generator settings
    /// * `writer` - Destination of the generated text
    pub fn new(
        ast: &'a Ast,
        library: &'a dyn LibraryDataProvider,
        settings: &'a CompilerSettings,
        writer: &'a mut dyn Write,
    ) -> Self {
        Compiler {
            ast,
            library,
            settings,
            writer,
            indent_level: 0,
            binary_operations: BTreeSet::new(),
            current_state: None,
            current_event_handler: None,
            writing_globals_container: false,
        }
    }

    pub fn write(&mut self, text: &str) -> Result<(), CompilerError> {
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn write_line(&mut self, text: &str) -> Result<(), CompilerError> {
        self.write(text)?;
        self.write("\n")
    }

    pub fn indent(&self) -> String {
        "\t".repeat(self.indent_level)
    }

    /// Writes the current indentation.
    pub fn write_indent(&mut self) -> Result<(), CompilerError> {
        let indent = self.indent();
        self.write(&indent)
    }

    pub fn write_indented_line(&mut self, text: &str) -> Result<(), CompilerError> {
        self.write_indent()?;
        self.write_line(text)
    }

    /// Writes every line of `text` at the current indentation.
    fn write_indented_block(&mut self, text: &str) -> Result<(), CompilerError> {
        for line in text.lines() {
            if line.trim().is_empty() {
                self.write_line("")?;
            } else {
                self.write_indented_line(line)?;
            }
        }
        Ok(())
    }

    /// Writes a `//===` banner around `title`.
    fn write_banner(&mut self, title: &str) -> Result<(), CompilerError> {
        let rule = format!("//{}", "=".repeat(title.len() + 6));
        self.write_indented_line(&rule)?;
        self.write_indented_line(&format!("//== {} ==", title))?;
        self.write_indented_line(&rule)
    }

    /// Writes the co-op termination call when co-op calls are enabled.
    pub fn write_coop_termination_call(&mut self) -> Result<(), CompilerError> {
        if self.settings.insert_coop_termination_calls {
            let call = format!("{};", self.settings.coop_termination_call());
            self.write_indented_line(&call)?;
        }
        Ok(())
    }

    /// Generates the whole compilation unit.
    fn gen(&mut self) -> Result<(), CompilerError> {
        let ast = self.ast;
        let unit = ast.compilation_unit().ok_or_else(|| {
            CompilerError::InvalidArgument(String::from("tree is not a compilation unit"))
        })?;

        self.gen_header()?;

        if self.settings.generate_class {
            self.gen_class_start()?;
        }

        let utilities = utility_library()?;
        self.write_indented_block(&utilities)?;
        self.write_line("")?;

        let globals = referenced_globals(ast, unit);
        if self.settings.generate_class {
            self.gen_class_globals(&globals)?;
        } else {
            self.gen_globals_container(&globals)?;
        }

        self.gen_functions(unit)?;
        self.gen_states(unit)?;
        self.gen_binary_operation_stubs()?;

        if self.settings.generate_class {
            self.gen_class_end()?;
        }

        Ok(())
    }

    fn gen_header(&mut self) -> Result<(), CompilerError> {
        if !self.settings.script_header.trim().is_empty() {
            let header = self.settings.script_header.clone();
            self.write_line(&header)?;
            self.write_line("")?;
        }

        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);
        self.write_line(&format!(
            "//Compiled by lslcc, Date: {}",
            format_timestamp(seconds)
        ))?;
        self.write_line("")
    }

    fn gen_class_start(&mut self) -> Result<(), CompilerError> {
        let settings = self.settings;

        if !settings.generated_namespace_imports.is_empty() {
            for import in &settings.generated_namespace_imports {
                self.write_line(&format!("using {};", import))?;
            }
            self.write_line("")?;
        }

        if let Some(namespace) = &settings.generated_class_namespace {
            self.write_line(&format!("namespace {}", namespace))?;
            self.write_line("{")?;
            self.indent_level += 1;
        }

        let mut declaration = format!(
            "{}class {}",
            settings.generated_class_accessibility.keyword(),
            settings.class_name()
        );
        let inheritance = settings.inheritance_clause();
        if !inheritance.is_empty() {
            declaration.push(' ');
            declaration.push_str(&inheritance);
        }

        self.write_indented_line(&declaration)?;
        self.write_indented_line("{")?;
        self.write_line("")?;
        self.indent_level += 1;
        Ok(())
    }

    fn gen_class_end(&mut self) -> Result<(), CompilerError> {
        self.indent_level = self.indent_level.saturating_sub(1);
        self.write_indented_line("}")?;

        if self.settings.generated_class_namespace.is_some() {
            self.indent_level = self.indent_level.saturating_sub(1);
            self.write_indented_line("}")?;
        }
        Ok(())
    }

    /// Globals as fields of the generated class, initialised by its
    /// constructor.
    fn gen_class_globals(&mut self, globals: &[&'a VarDecl]) -> Result<(), CompilerError> {
        let keys_are_strings = self.settings.keys_are_strings;

        for decl in globals {
            let field = format!(
                "public {} GV_{};",
                csharp_type(decl.ty, keys_are_strings),
                decl.name
            );
            self.write_indented_line(&field)?;
        }
        if !globals.is_empty() {
            self.write_line("\n")?;
        }

        let constructor = format!(
            "{}{}{}",
            self.settings.generated_constructor_accessibility.keyword(),
            self.settings.class_name(),
            self.settings.constructor_signature()
        );
        self.write_indented_line(&constructor)?;
        self.write_indented_line("{")?;
        self.indent_level += 1;

        for decl in globals {
            self.write_indent()?;
            self.write(&format!("GV_{} = ", decl.name))?;
            self.gen_global_value(decl)?;
            self.write_line(";")?;
        }

        self.indent_level -= 1;
        self.write_indented_line("}")?;
        self.write_line("\n")
    }

    /// Globals inside a nested `GLOBALS` class, for runtimes that supply
    /// their own script class.
    fn gen_globals_container(&mut self, globals: &[&'a VarDecl]) -> Result<(), CompilerError> {
        if globals.is_empty() {
            return Ok(());
        }

        let keys_are_strings = self.settings.keys_are_strings;

        self.write_banner("Global Variable Container")?;
        self.write_indented_line("private class GLOBALS")?;
        self.write_indented_line("{")?;
        self.indent_level += 1;

        for decl in globals {
            let field = format!(
                "public {} V_{};",
                csharp_type(decl.ty, keys_are_strings),
                decl.name
            );
            self.write_indented_line(&field)?;
        }

        self.write_indented_line("public GLOBALS()")?;
        self.write_indented_line("{")?;
        self.indent_level += 1;
        self.writing_globals_container = true;

        for decl in globals {
            self.write_indent()?;
            self.write(&format!("this.V_{} = ", decl.name))?;
            self.gen_global_value(decl)?;
            self.write_line(";")?;
        }

        self.writing_globals_container = false;
        self.indent_level -= 1;
        self.write_indented_line("}")?;
        self.indent_level -= 1;
        self.write_indented_line("}")?;
        self.write_line("\n")?;

        self.write_indented_line("GLOBALS Globals = new GLOBALS();")?;
        self.write_line("\n")
    }

    fn gen_global_value(&mut self, decl: &VarDecl) -> Result<(), CompilerError> {
        match decl.initializer {
            Some(initializer) => gen_assigned_value(self, decl.ty, initializer),
            None => self.write(&default_initializer(decl.ty)),
        }
    }

    /// Writes every function something calls. Unreferenced functions are
    /// dropped from the output.
    fn gen_functions(&mut self, unit: &'a CompilationUnit) -> Result<(), CompilerError> {
        let ast = self.ast;
        let functions: Vec<&FunctionDecl> = unit
            .functions
            .iter()
            .filter_map(|id| match ast.kind(*id) {
                NodeKind::Function(function) if !function.references.is_empty() => Some(function),
                _ => None,
            })
            .collect();

        if functions.is_empty() {
            return Ok(());
        }

        self.write_banner("User Defined Functions")?;
        self.write_line("\n")?;

        for function in functions {
            log::trace!("generating function {}", function.name);

            let declaration = format!(
                "public {} FN_{}({})",
                csharp_type(function.return_type, self.settings.keys_are_strings),
                function.name,
                self.parameter_list(function.parameters)
            );
            self.write_indented_line(&declaration)?;
            gen_statement(self, function.body)?;
            self.write_line("\n")?;
        }

        Ok(())
    }

    fn gen_states(&mut self, unit: &'a CompilationUnit) -> Result<(), CompilerError> {
        let ast = self.ast;
        let states: Vec<&StateDecl> = unit
            .states
            .iter()
            .filter_map(|id| match ast.kind(*id) {
                NodeKind::State(state) => Some(state),
                _ => None,
            })
            .collect();

        if !states.is_empty() {
            self.write_line("")?;
            self.write_banner("User Defined State Event Handlers")?;
            self.write_line("\n")?;

            for state in states {
                self.gen_state(state)?;
                self.write_line("\n")?;
            }
        }

        let default_state = unit
            .default_state
            .and_then(|id| match ast.kind(id) {
                NodeKind::State(state) => Some(state),
                _ => None,
            })
            .ok_or_else(|| CompilerError::Internal(String::from("missing default state")))?;

        self.write_line("")?;
        self.write_banner("Default State Event Handlers")?;
        self.write_line("\n")?;
        self.gen_state(default_state)
    }

    fn gen_state(&mut self, state: &'a StateDecl) -> Result<(), CompilerError> {
        let ast = self.ast;
        self.current_state = Some(state.name.clone());

        for (index, id) in state.handlers.iter().enumerate() {
            let NodeKind::EventHandler(handler) = ast.kind(*id) else {
                continue;
            };

            self.current_event_handler = Some(*id);

            let declaration = format!(
                "public void {}_event_{}({})",
                state.name,
                handler.name,
                self.parameter_list(handler.parameters)
            );
            self.write_indented_line(&declaration)?;
            gen_statement(self, handler.body)?;

            if index + 1 < state.handlers.len() {
                self.write_line("")?;
            }
        }

        self.current_event_handler = None;
        self.current_state = None;
        Ok(())
    }

    /// `T PM_a, T PM_b` for a parameter list node.
    fn parameter_list(&self, list: NodeId) -> String {
        let NodeKind::ParameterList(list) = self.ast.kind(list) else {
            return String::new();
        };

        list.parameters
            .iter()
            .filter_map(|id| match self.ast.kind(*id) {
                NodeKind::Parameter(parameter) => Some(format!(
                    "{} PM_{}",
                    csharp_type(parameter.ty, self.settings.keys_are_strings),
                    parameter.name
                )),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn gen_binary_operation_stubs(&mut self) -> Result<(), CompilerError> {
        if self.binary_operations.is_empty() {
            return Ok(());
        }

        let operations: Vec<BinaryOperationSignature> =
            self.binary_operations.iter().copied().collect();
        log::debug!("writing {} binary operator stubs", operations.len());

        self.write_line("\n")?;
        self.write_banner("Binary Operator Stubs")?;
        self.write_line("\n")?;

        for (index, operation) in operations.iter().enumerate() {
            let declaration = format!(
                "private {} {}({} right, {} left)",
                csharp_type(operation.returns, self.settings.keys_are_strings),
                operation.stub_name(),
                csharp_type(operation.right, true),
                csharp_type(operation.left, true)
            );
            self.write_indented_line(&declaration)?;
            self.write_indented_line("{")?;
            self.indent_level += 1;
            self.write_indented_line(&format!("return left{}right;", operation.operator.symbol()))?;
            self.indent_level -= 1;
            self.write_indented_line("}")?;

            if index + 1 < operations.len() {
                self.write_line("\n")?;
            }
        }

        Ok(())
    }

    /// Records a stub and returns its name.
    pub fn use_binary_operation(&mut self, operation: BinaryOperationSignature) -> String {
        let name = operation.stub_name();
        if self.binary_operations.insert(operation) {
            log::trace!("new binary operator stub {}", name);
        }
        name
    }
}

/// Global declarations read by at least one expression.
fn referenced_globals<'a>(ast: &'a Ast, unit: &'a CompilationUnit) -> Vec<&'a VarDecl> {
    unit.globals
        .iter()
        .filter_map(|id| match ast.stmt(*id) {
            Some(Stmt::VarDecl(decl)) if !decl.references.is_empty() => Some(decl),
            _ => None,
        })
        .collect()
}

/// Generates target source for a validated compilation unit.
///
/// Fails with [`CompilerError::InvalidArgument`] when the tree carries
/// errors, and with [`CompilerError::InvalidSetting`] when `settings` do not
/// validate. Nothing is written in either case.
pub fn compile<W: Write>(
    ast: &Ast,
    library: &dyn LibraryDataProvider,
    settings: &CompilerSettings,
    writer: &mut W,
) -> Result<(), CompilerError> {
    if ast.has_errors() {
        return Err(CompilerError::InvalidArgument(String::from(
            "cannot generate code for a tree with errors",
        )));
    }
    settings.validate()?;

    log::debug!(
        "generating code (class: {}, keys as strings: {}, co-op: {})",
        settings.generate_class,
        settings.keys_are_strings,
        settings.insert_coop_termination_calls
    );

    let mut compiler = Compiler::new(ast, library, settings, writer);
    compiler.gen()?;
    compiler.writer.flush()?;

    log::info!(
        "code generation finished with {} operator stubs",
        compiler.binary_operations.len()
    );
    Ok(())
}
