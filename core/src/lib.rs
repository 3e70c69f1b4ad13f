pub mod cli;
pub mod config;
pub mod context;
pub mod definition;
pub mod environment;
pub mod errors;
pub mod expression;
pub mod generator;
pub mod logger;
pub mod result;
pub mod runner;
pub mod tasks;
pub mod values;
pub mod variables;

// Re-export the script-facing surface
pub use context::{Context, ProcessContext};
pub use environment::{Script, ScriptEnv};
pub use errors::{BridgeError, BridgeResult};
pub use logger::{LogLevel, ScriptLogger};
pub use result::{ResultSink, ScriptResult};
pub use tasks::{TaskAccessor, TaskProxy, TaskRegistry};
pub use values::{Val, ValKind};
pub use variables::{MapStore, VariableStore, Variables};
