//! Deterministic editor model: keys, keymap layers, the window split tree,
//! buffers, and the editor state that ties them together.
//!
//! Nothing in this crate performs IO or runs extension code. The kernel
//! drives it one operation at a time and hands [`snapshot::RenderSnapshot`]s
//! to front ends.

pub mod buffer;
pub mod editor;
pub mod graphics;
pub mod input;
pub mod keymap;
pub mod messages;
pub mod movement;
pub mod snapshot;
pub mod split_tree;
pub mod value;
