pub mod editing;

// Re-export key types for easier usage
pub use editing::{document::*, editor::*, node::*, placeholder::*, plugin::*, transaction::*};
pub use editing::EngineError;
