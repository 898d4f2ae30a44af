pub mod file;

pub use file::{DeleteOutcome, FileService};
