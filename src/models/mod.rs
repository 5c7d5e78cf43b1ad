//! Object model layer
//!
//! - `object_kind.rs` - Well-known kinds with dedicated handling
//! - `object.rs` - Accessors and typed conversion for object references

pub mod object;
pub mod object_kind;

pub use object_kind::ObjectKind;
