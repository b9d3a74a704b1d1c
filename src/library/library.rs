use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::Deref,
    path::Path,
};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    ast::types::LslType,
    errors::errors::CompilerError,
    signatures::signatures::{ConstantSignature, EventSignature, FunctionSignature},
};

use super::{provider::LibraryDataProvider, xml::load_library_xml};

lazy_static! {
    static ref SUBSET_NAME: Regex = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").unwrap();
}

pub static DEFAULT_LIBRARY: &str = include_str!("default_library.xml");

/// Subset the bundled library is published under.
pub const DEFAULT_SUBSET: &str = "lsl";

pub const DEPRECATED_PROPERTY: &str = "Deprecated";
pub const MOD_INVOKE_PROPERTY: &str = "ModInvoke";
pub const EXPAND_PROPERTY: &str = "Expand";

pub fn validate_subset_name(name: &str) -> Result<(), CompilerError> {
    if SUBSET_NAME.is_match(name) {
        Ok(())
    } else {
        Err(CompilerError::InvalidSubsetName {
            name: name.to_string(),
        })
    }
}

/// Splits a comma separated subset list, validating every name.
pub fn parse_subsets(text: &str) -> Result<Vec<String>, CompilerError> {
    text.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| validate_subset_name(name).map(|_| name.to_string()))
        .collect()
}

/// Subsets, free-form properties and documentation attached to a
/// library signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryMetadata {
    subsets: BTreeSet<String>,
    properties: BTreeMap<String, String>,
    pub documentation: String,
}

impl LibraryMetadata {
    pub fn new() -> Self {
        LibraryMetadata::default()
    }

    pub fn subsets(&self) -> &BTreeSet<String> {
        &self.subsets
    }

    pub fn add_subset(&mut self, name: &str) -> Result<(), CompilerError> {
        validate_subset_name(name)?;
        self.subsets.insert(name.to_string());
        Ok(())
    }

    /// Replaces the subsets with a comma separated list.
    pub fn set_subsets(&mut self, text: &str) -> Result<(), CompilerError> {
        self.subsets = parse_subsets(text)?.into_iter().collect();
        Ok(())
    }

    pub fn shares_subset(&self, active: &BTreeSet<String>) -> bool {
        self.subsets.iter().any(|subset| active.contains(subset))
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn set_property(&mut self, name: &str, value: &str) {
        self.properties.insert(name.to_string(), value.to_string());
    }

    pub fn remove_property(&mut self, name: &str) -> Option<String> {
        self.properties.remove(name)
    }

    fn flag(&self, name: &str) -> bool {
        self.property(name)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn deprecated(&self) -> bool {
        self.flag(DEPRECATED_PROPERTY)
    }

    pub fn set_deprecated(&mut self, deprecated: bool) {
        if deprecated {
            self.set_property(DEPRECATED_PROPERTY, "true");
        } else {
            self.remove_property(DEPRECATED_PROPERTY);
        }
    }

    /// Function is invoked through the `modInvoke` family.
    pub fn mod_invoke(&self) -> bool {
        self.flag(MOD_INVOKE_PROPERTY)
    }

    /// Constant is written out as its value instead of its name.
    pub fn expand(&self) -> bool {
        self.flag(EXPAND_PROPERTY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEventSignature {
    signature: EventSignature,
    pub metadata: LibraryMetadata,
}

impl LibraryEventSignature {
    pub fn new(signature: EventSignature, metadata: LibraryMetadata) -> Self {
        LibraryEventSignature {
            signature,
            metadata,
        }
    }

    pub fn signature(&self) -> &EventSignature {
        &self.signature
    }

    pub fn signature_and_documentation(&self) -> String {
        signature_and_documentation(&self.signature.signature_string(), &self.metadata)
    }
}

impl From<EventSignature> for LibraryEventSignature {
    fn from(signature: EventSignature) -> Self {
        LibraryEventSignature::new(signature, LibraryMetadata::default())
    }
}

impl Deref for LibraryEventSignature {
    type Target = EventSignature;

    fn deref(&self) -> &Self::Target {
        &self.signature
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryFunctionSignature {
    signature: FunctionSignature,
    pub metadata: LibraryMetadata,
}

impl LibraryFunctionSignature {
    pub fn new(signature: FunctionSignature, metadata: LibraryMetadata) -> Self {
        LibraryFunctionSignature {
            signature,
            metadata,
        }
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    pub fn signature_and_documentation(&self) -> String {
        signature_and_documentation(&self.signature.signature_string(), &self.metadata)
    }
}

impl From<FunctionSignature> for LibraryFunctionSignature {
    fn from(signature: FunctionSignature) -> Self {
        LibraryFunctionSignature::new(signature, LibraryMetadata::default())
    }
}

impl Deref for LibraryFunctionSignature {
    type Target = FunctionSignature;

    fn deref(&self) -> &Self::Target {
        &self.signature
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryConstantSignature {
    signature: ConstantSignature,
    pub metadata: LibraryMetadata,
}

impl LibraryConstantSignature {
    pub fn new(signature: ConstantSignature, metadata: LibraryMetadata) -> Self {
        LibraryConstantSignature {
            signature,
            metadata,
        }
    }

    pub fn signature(&self) -> &ConstantSignature {
        &self.signature
    }

    /// The value written as script source: strings and keys quoted,
    /// vectors and rotations in `< >`, lists in `[ ]`.
    ///
    /// String and key values are stored already escaped, so they are quoted
    /// as they are.
    pub fn value_string_as_code_literal(&self) -> String {
        let value = self.signature.value_string();
        match self.signature.ty() {
            LslType::String | LslType::Key => format!("\"{}\"", value),
            LslType::Vector | LslType::Rotation => format!("<{}>", value),
            LslType::List => format!("[{}]", value),
            _ => value.to_string(),
        }
    }

    pub fn signature_and_documentation(&self) -> String {
        signature_and_documentation(&self.signature.signature_string(), &self.metadata)
    }
}

impl From<ConstantSignature> for LibraryConstantSignature {
    fn from(signature: ConstantSignature) -> Self {
        LibraryConstantSignature::new(signature, LibraryMetadata::default())
    }
}

impl Deref for LibraryConstantSignature {
    type Target = ConstantSignature;

    fn deref(&self) -> &Self::Target {
        &self.signature
    }
}

fn signature_and_documentation(signature: &str, metadata: &LibraryMetadata) -> String {
    let mut text = String::from(signature);
    if !signature.ends_with(';') {
        text.push(';');
    }
    if metadata.deprecated() {
        text.push_str("\n// Deprecated");
    }
    if !metadata.documentation.trim().is_empty() {
        text.push_str("\n\n");
        text.push_str(metadata.documentation.trim());
    }
    text
}

/// In-memory library data limited to a set of active subsets.
///
/// Built once, then shared read-only; wrap it in an `Arc` to hand the same
/// instance to concurrent compilations.
#[derive(Debug, Clone, Default)]
pub struct LibraryData {
    active_subsets: BTreeSet<String>,
    functions: HashMap<String, Vec<LibraryFunctionSignature>>,
    events: HashMap<String, LibraryEventSignature>,
    constants: HashMap<String, LibraryConstantSignature>,
}

impl LibraryData {
    pub fn new(active_subsets: &[&str]) -> Result<Self, CompilerError> {
        let mut subsets = BTreeSet::new();
        for subset in active_subsets {
            validate_subset_name(subset)?;
            subsets.insert(subset.to_string());
        }

        Ok(LibraryData {
            active_subsets: subsets,
            ..Default::default()
        })
    }

    /// Loads library descriptor XML, keeping signatures in `active_subsets`.
    pub fn from_xml_str(xml: &str, active_subsets: &[&str]) -> Result<Self, CompilerError> {
        let mut data = LibraryData::new(active_subsets)?;
        load_library_xml(xml, &mut data)?;

        log::debug!(
            "loaded library data: {} functions, {} events, {} constants",
            data.functions.values().map(Vec::len).sum::<usize>(),
            data.events.len(),
            data.constants.len()
        );

        Ok(data)
    }

    pub fn from_xml_file<P: AsRef<Path>>(
        path: P,
        active_subsets: &[&str],
    ) -> Result<Self, CompilerError> {
        let xml = std::fs::read_to_string(path.as_ref())?;
        log::info!("reading library data from {}", path.as_ref().display());
        LibraryData::from_xml_str(&xml, active_subsets)
    }

    /// The library bundled with the crate, under the `lsl` subset.
    pub fn default_library() -> Result<Self, CompilerError> {
        LibraryData::from_xml_str(DEFAULT_LIBRARY, &[DEFAULT_SUBSET])
    }

    pub fn active_subsets(&self) -> &BTreeSet<String> {
        &self.active_subsets
    }

    /// Adds a function overload. Returns `false` when it belongs to no
    /// active subset and was skipped.
    pub fn add_function(&mut self, signature: LibraryFunctionSignature) -> Result<bool, CompilerError> {
        if !signature.metadata.shares_subset(&self.active_subsets) {
            return Ok(false);
        }

        let overloads = self.functions.entry(signature.name().to_string()).or_default();
        if overloads
            .iter()
            .any(|existing| existing.signature().signature_matches(signature.signature()))
        {
            return Err(CompilerError::DuplicateSignature(signature.signature_string()));
        }

        log::trace!("library function {}", signature.signature_string());
        overloads.push(signature);
        Ok(true)
    }

    pub fn add_event(&mut self, signature: LibraryEventSignature) -> Result<bool, CompilerError> {
        if !signature.metadata.shares_subset(&self.active_subsets) {
            return Ok(false);
        }

        if self.events.contains_key(signature.name()) {
            return Err(CompilerError::DuplicateSignature(signature.signature_string()));
        }

        log::trace!("library event {}", signature.signature_string());
        self.events.insert(signature.name().to_string(), signature);
        Ok(true)
    }

    pub fn add_constant(
        &mut self,
        signature: LibraryConstantSignature,
    ) -> Result<bool, CompilerError> {
        if !signature.metadata.shares_subset(&self.active_subsets) {
            return Ok(false);
        }

        if self.constants.contains_key(signature.name()) {
            return Err(CompilerError::DuplicateSignature(signature.signature_string()));
        }

        self.constants.insert(signature.name().to_string(), signature);
        Ok(true)
    }

    pub fn functions(&self) -> impl Iterator<Item = &LibraryFunctionSignature> {
        self.functions.values().flatten()
    }

    pub fn events(&self) -> impl Iterator<Item = &LibraryEventSignature> {
        self.events.values()
    }

    pub fn constants(&self) -> impl Iterator<Item = &LibraryConstantSignature> {
        self.constants.values()
    }
}

impl LibraryDataProvider for LibraryData {
    fn get_library_function_signatures(&self, name: &str) -> Option<&[LibraryFunctionSignature]> {
        self.functions
            .get(name)
            .map(Vec::as_slice)
            .filter(|overloads| !overloads.is_empty())
    }

    fn get_library_event_signature(&self, name: &str) -> Option<&LibraryEventSignature> {
        self.events.get(name)
    }

    fn get_library_constant_signature(&self, name: &str) -> Option<&LibraryConstantSignature> {
        self.constants.get(name)
    }
}
