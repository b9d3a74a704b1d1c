//! Plain event, function and constant signatures.
//!
//! Signatures are compared by name and parameter types only; parameter
//! names never take part in identity.

pub mod signatures;

#[cfg(test)]
mod tests;
