//! Wire formats shared between installations: the serialized record shape,
//! conversion of the previous schema's records, and discovery of an event's
//! machine-readable representation on its public page.

pub mod discovery;
pub mod error;
pub mod legacy;
pub mod payload;
pub mod timezone;
