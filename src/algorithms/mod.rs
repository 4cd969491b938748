pub mod pass;
pub mod pattern;
pub mod standards;


// Re-export the pass building blocks
pub use pass::{PassExecutor, PassProgress, VerifyPass, VerifyProgress, WritePass, BUFFER_SIZE};
pub use pattern::{pattern_buffer, Pattern, PatternGenerator};
pub use standards::{StandardDefinition, StandardId, Step, CATALOG};
