// src/models/mod.rs

//! Data structures representing database entities.

pub mod product;

pub use product::{NewProduct, Product, ProductChanges, ProductPage};
