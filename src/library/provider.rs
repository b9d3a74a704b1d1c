use crate::{ast::types::LslType, signatures::signatures::FunctionSignature};

use super::library::{LibraryConstantSignature, LibraryEventSignature, LibraryFunctionSignature};

/// Read-only table of the functions, events and constants a script may use.
///
/// Implementations are consulted concurrently by independent compilations
/// and must not change once shared.
pub trait LibraryDataProvider: Send + Sync {
    /// Every overload of `name`, or `None` when no such function exists.
    fn get_library_function_signatures(&self, name: &str) -> Option<&[LibraryFunctionSignature]>;

    fn get_library_event_signature(&self, name: &str) -> Option<&LibraryEventSignature>;

    fn get_library_constant_signature(&self, name: &str) -> Option<&LibraryConstantSignature>;

    fn library_function_exists(&self, name: &str) -> bool {
        self.get_library_function_signatures(name).is_some()
    }

    /// Overload of `name` callable with the given argument types. Exact
    /// matches are preferred over ones needing implicit conversions.
    fn function_signature_exists(
        &self,
        name: &str,
        argument_types: &[LslType],
    ) -> Option<&LibraryFunctionSignature> {
        let overloads = self.get_library_function_signatures(name)?;

        overloads
            .iter()
            .find(|overload| overload.accepts(argument_types, true))
            .or_else(|| {
                overloads
                    .iter()
                    .find(|overload| overload.accepts(argument_types, false))
            })
    }

    /// Library overload with exactly the same name and parameter types.
    fn get_library_function_signature(
        &self,
        signature: &FunctionSignature,
    ) -> Option<&LibraryFunctionSignature> {
        self.get_library_function_signatures(signature.name())?
            .iter()
            .find(|overload| overload.signature().signature_matches(signature))
    }

    fn event_signature_exists(&self, name: &str) -> Option<&LibraryEventSignature> {
        self.get_library_event_signature(name)
    }

    fn constant_signature_exists(&self, name: &str) -> Option<&LibraryConstantSignature> {
        self.get_library_constant_signature(name)
    }
}
