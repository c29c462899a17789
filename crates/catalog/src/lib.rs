//! Product catalog domain module.
//!
//! This crate contains the product record owned by the stock store and the
//! validation rules for administrative mutations, implemented purely as
//! deterministic domain logic (no IO, no storage).

pub mod product;

pub use product::{NewProduct, Product, ProductPatch};
