// This file contains helper functions for persisting generated test data.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Creates a directory if it doesn't exist
pub fn ensure_directory_exists<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Sanitizes a path template for use in filenames
pub fn sanitize_path_for_filename(path: &str) -> String {
    path.replace('/', "_")
        .replace('\\', "_")
        .replace('{', "")
        .replace('}', "")
        .replace(':', "")
        .trim_matches('_')
        .to_string()
}

/// Default file name for the test data of one endpoint, e.g. `post_users_id.json`
pub fn test_data_file_name(method: &str, path: &str) -> String {
    let path = sanitize_path_for_filename(path);
    if path.is_empty() {
        format!("{}_root.json", method.to_lowercase())
    } else {
        format!("{}_{}.json", method.to_lowercase(), path)
    }
}

/// Writes content to a file, creating parent directories if needed
pub fn write_to_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        ensure_directory_exists(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(content.as_ref())?;
    Ok(())
}
