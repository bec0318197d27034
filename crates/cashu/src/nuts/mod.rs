//! Well-known spending-condition secrets layered on top of the bare
//! [`crate::secret::Secret`] type.

pub mod nut10;
pub mod nut11;
pub mod nut26;

pub use nut10::{Kind, WellKnownSecret};
pub use nut11::{Conditions, SigFlag};
