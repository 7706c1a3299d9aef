//! cc0-util - Foundation types shared by every cc0 crate.
//!
//! This crate provides the small vocabulary the rest of the compiler is
//! written in: source positions ([`Span`]), diagnostics ([`Handler`],
//! [`Diagnostic`], [`Level`]), and typed-index vectors ([`IndexVec`],
//! [`Idx`]) used for the scope and function arenas.

mod diagnostic;
mod index_vec;
mod span;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::Span;

// Re-export commonly used map types so downstream crates agree on hashers.
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
