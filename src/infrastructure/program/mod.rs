//! Built-in program engine

mod engine;
pub mod scanner;

pub use engine::{ProgramConfig, ScriptEngine, ScriptProgram};
