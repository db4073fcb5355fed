pub mod helpers;

pub use helpers::{ensure_directory_exists, sanitize_path_for_filename, test_data_file_name, write_to_file};
