//! cc0-gen - The back-end serializers.
//!
//! Two assemblers share this crate:
//!
//! - the *text assembler* walks the analyzed [`Program`] and renders the
//!   `.constants:` / `.start:` / `.functions:` / `.F<k>:` sections of
//!   the assembly listing, translating constant-pool sentinels into real
//!   pool indices;
//! - the *binary assembler* parses such a listing back into the VM's
//!   byte-exact object-file format, all integers big-endian.
//!
//! Going through the listing even for binary output keeps the two
//! formats trivially consistent: the object file is always the encoding
//! of the listing.
//!
//! [`Program`]: cc0_ir::Program

mod asm;
mod error;
mod object;

pub use asm::assemble_text;
pub use error::AssembleError;
pub use object::assemble_binary;
