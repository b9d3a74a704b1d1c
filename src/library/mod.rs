//! Library data: the functions, events and constants a script may use.
//!
//! Signatures are loaded from library descriptor XML and filtered by a set of
//! active subsets. The validator and code generator only see the data through
//! the [`provider::LibraryDataProvider`] trait, so hosts can supply their own
//! tables.

pub mod library;
pub mod provider;
pub mod xml;

#[cfg(test)]
mod tests;
