//! Analysis engine and language server for ChoiceScript games.
//!
//! The core ([`parser`], [`indexer`], [`validator`]) is synchronous and knows
//! nothing about the protocol; [`Backend`] drives it from editor events.

mod analysis;
mod backend;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod expression;
pub mod fs;
pub mod index;
pub mod indexer;
pub mod language;
pub mod navigation;
pub mod parser;
pub mod text;
pub mod validator;

pub use backend::Backend;
