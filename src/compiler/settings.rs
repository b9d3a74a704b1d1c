use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::errors::CompilerError;

pub const DEFAULT_CLASS_NAME: &str = "LSLScript";
pub const DEFAULT_CONSTRUCTOR_SIGNATURE: &str = "()";
pub const DEFAULT_COOP_TERMINATION_CALL: &str = "opensim_reserved_CheckForCoopTermination()";

lazy_static! {
    static ref CLASS_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref QUALIFIED_NAME: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
    static ref INHERITED_TYPE: Regex = Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*(<[A-Za-z0-9_., <>]*>)?$"
    )
    .unwrap();
    static ref CONSTRUCTOR_SIGNATURE: Regex =
        Regex::new(r"^\([^()]*\)(\s*:\s*(base|this)\([^()]*\))?$").unwrap();
    static ref FUNCTION_CALL: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*\([^;]*\)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accessibility {
    #[default]
    Public,
    Internal,
    Protected,
    Private,
    /// No modifier at all.
    Default,
}

impl Accessibility {
    /// The modifier followed by a space, or nothing.
    pub fn keyword(&self) -> &'static str {
        match self {
            Accessibility::Public => "public ",
            Accessibility::Internal => "internal ",
            Accessibility::Protected => "protected ",
            Accessibility::Private => "private ",
            Accessibility::Default => "",
        }
    }
}

/// Options read by the code generator.
///
/// Loaded from JSON; any missing field takes its default. Call
/// [`CompilerSettings::validate`] before handing settings to the generator,
/// `compile` does this itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Wrap the output in a class, with globals initialised by its constructor.
    pub generate_class: bool,
    /// Emit keys as strings instead of `LSL_Types.key`.
    pub keys_are_strings: bool,
    /// Call the co-op termination function at the top of functions, event
    /// handlers and loop bodies, and after every targeted label.
    pub insert_coop_termination_calls: bool,
    pub coop_termination_function_call: Option<String>,
    /// Text written verbatim before anything else.
    pub script_header: String,
    pub generated_class_name: Option<String>,
    pub generated_class_namespace: Option<String>,
    pub generated_class_accessibility: Accessibility,
    pub generated_constructor_signature: Option<String>,
    pub generated_constructor_accessibility: Accessibility,
    pub generated_inheritance_list: Vec<String>,
    pub generated_namespace_imports: Vec<String>,
    /// Expanded key constants are built as strings.
    pub key_constants_that_expand_are_strings: bool,
    /// Key elements of expanded list constants are built as strings.
    pub key_elements_in_list_constants_that_expand_are_strings: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        CompilerSettings {
            generate_class: true,
            keys_are_strings: false,
            insert_coop_termination_calls: false,
            coop_termination_function_call: None,
            script_header: String::new(),
            generated_class_name: None,
            generated_class_namespace: None,
            generated_class_accessibility: Accessibility::Public,
            generated_constructor_signature: None,
            generated_constructor_accessibility: Accessibility::Public,
            generated_inheritance_list: vec![],
            generated_namespace_imports: vec![],
            key_constants_that_expand_are_strings: false,
            key_elements_in_list_constants_that_expand_are_strings: false,
        }
    }
}

fn invalid(setting: &str, message: String) -> CompilerError {
    CompilerError::InvalidSetting {
        setting: setting.to_string(),
        message,
    }
}

impl CompilerSettings {
    /// Settings used by OpenSim itself: no class, the runtime wraps the code.
    pub fn opensim_runtime() -> Self {
        CompilerSettings {
            generate_class: false,
            insert_coop_termination_calls: true,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        let settings: CompilerSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CompilerError> {
        let content = std::fs::read_to_string(path)?;
        log::debug!("loading compiler settings from {}", path.display());
        CompilerSettings::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, CompilerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks every name descriptor against the target language's grammar.
    pub fn validate(&self) -> Result<(), CompilerError> {
        if let Some(name) = &self.generated_class_name {
            if !CLASS_NAME.is_match(name) {
                return Err(invalid(
                    "generated_class_name",
                    format!("{:?} is not a valid class name", name),
                ));
            }
        }

        if let Some(namespace) = &self.generated_class_namespace {
            if !QUALIFIED_NAME.is_match(namespace) {
                return Err(invalid(
                    "generated_class_namespace",
                    format!("{:?} is not a valid namespace", namespace),
                ));
            }
        }

        for import in &self.generated_namespace_imports {
            if !QUALIFIED_NAME.is_match(import) {
                return Err(invalid(
                    "generated_namespace_imports",
                    format!("{:?} is not a valid namespace", import),
                ));
            }
        }

        for inherited in &self.generated_inheritance_list {
            if !INHERITED_TYPE.is_match(inherited) {
                return Err(invalid(
                    "generated_inheritance_list",
                    format!("{:?} is not a valid type name", inherited),
                ));
            }
        }

        if let Some(signature) = &self.generated_constructor_signature {
            if !CONSTRUCTOR_SIGNATURE.is_match(signature) {
                return Err(invalid(
                    "generated_constructor_signature",
                    format!("{:?} is not a valid constructor signature", signature),
                ));
            }
        }

        if let Some(call) = &self.coop_termination_function_call {
            if !FUNCTION_CALL.is_match(call) {
                return Err(invalid(
                    "coop_termination_function_call",
                    format!("{:?} is not a valid function call", call),
                ));
            }
        }

        Ok(())
    }

    pub fn class_name(&self) -> &str {
        self.generated_class_name
            .as_deref()
            .unwrap_or(DEFAULT_CLASS_NAME)
    }

    pub fn constructor_signature(&self) -> &str {
        self.generated_constructor_signature
            .as_deref()
            .unwrap_or(DEFAULT_CONSTRUCTOR_SIGNATURE)
    }

    pub fn coop_termination_call(&self) -> &str {
        self.coop_termination_function_call
            .as_deref()
            .unwrap_or(DEFAULT_COOP_TERMINATION_CALL)
    }

    /// `: Base, IInterface` or an empty string.
    pub fn inheritance_clause(&self) -> String {
        if self.generated_inheritance_list.is_empty() {
            String::new()
        } else {
            format!(": {}", self.generated_inheritance_list.join(", "))
        }
    }
}
