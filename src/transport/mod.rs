/// Pass discovery and loading from a capture directory.
pub mod fs;

pub use fs::{load_dataset, load_measurement_pass, pass_files};
