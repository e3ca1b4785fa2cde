//! Hierarchical layout algebra for tensor programming.
//!
//! A [`layout::Layout`] is a composable map from a hierarchical coordinate
//! space to a linear index into flat memory. Layouts compose, complement,
//! multiply and divide ([`layout_algebra`]); applied to storage they form
//! [`array::MoYeArray`]s, and the tiling primitives ([`tiling`]) carve
//! arrays into per-block and per-thread views.
//!
//! Convention: coordinates and linear indices are 0-based everywhere, and
//! byte offsets are `index * size_of::<T>()`.

#[macro_use]
pub mod tuple;
pub mod dim;
pub mod error;
pub mod shape;
pub mod stride;
#[macro_use]
pub mod layout;
pub mod layout_algebra;

pub mod array;
pub mod copy;
pub mod env;
pub mod tiling;
