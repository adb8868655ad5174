//! Flowsync Core Types and Definitions
//!
//! This crate provides the foundational types shared by the Flowsync crates:
//!
//! - **Identifiers**: Interned element identifiers ([`identifier::Id`])
//! - **Colors**: CSS color handling for image export ([`color::Color`])
//! - **Geometry**: Points, sizes, bounds and the border-intersection math ([`geometry`] module)
//! - **Graph**: The arena-style diagram graph of shapes and connections ([`graph`] module)

pub mod color;
pub mod geometry;
pub mod graph;
pub mod identifier;
