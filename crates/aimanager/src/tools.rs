//! Tool registration, schema derivation and invocation.
//!
//! A tool is a [`ToolFunction`]: a name, documentation, a declared [`Signature`] and a
//! handler that runs either immediately or as a deferred future. Registering it in a
//! [`ToolRegistry`] derives the JSON schema advertised to the model. [`invoke`] later
//! resolves a model-issued [`FunctionCall`](crate::models::tool::FunctionCall) against the
//! registry.

mod function;
mod invoker;
mod registry;
mod schema;
mod signature;

pub use function::{ToolArgs, ToolFunction, ToolHandler};
pub use invoker::{invoke, result_text};
pub use registry::{RegisteredTool, ToolRegistry};
pub use schema::derive_schema;
pub use signature::{Param, ParamKind, ParamType, SchemaType, Signature};
