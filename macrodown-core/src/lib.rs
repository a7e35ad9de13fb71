//! # macrodown-core
//!
//! Core library for macrodown inline macro expansion.
//!
//! This crate provides the building blocks for locating `{{ Name("arg") }}`
//! macro calls in text, dispatching them to registered handlers, and
//! integrating the (possibly malformed) handler output back into a document
//! as well-formed markup.

pub mod argument;
pub mod dispatch;
pub mod locator;
pub mod markdown;
pub mod node;
pub mod registry;
pub mod repair;

pub use argument::normalize;
pub use dispatch::{ExpandError, Expansion, MacroDispatcher};
pub use locator::find_macros;
pub use markdown::{MacroProcessor, MacroTransformer};
pub use node::{Element, Node, NodeError};
pub use registry::{ConfigError, FunctionTable, Handler, Registry, RegistryConfig};
pub use repair::repair;

pub use macrodown_types::{MacroCall, Span};
