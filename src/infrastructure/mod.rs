//! Infrastructure layer - External service implementations

pub mod llm;
pub mod logging;
