#![recursion_limit = "256"]

//! Encoder-decoder Transformer (Vaswani et al., 2017) built on Burn.
//!
//! Layers, outermost first:
//!
//! - `application`: use cases behind the command-line front end
//! - `data`: padding token pairs into batches with masks
//! - `domain`: errors, modes and plain data types
//! - `infra`: config persistence
//! - `ml`: the model components and greedy decoding

pub mod application;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
