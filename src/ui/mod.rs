pub mod progress;

pub use progress::{format_duration, human_bytes, status_line, ProgressView};

#[cfg(test)]
mod progress_tests;
