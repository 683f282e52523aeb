pub mod database;
pub mod session_store;

pub use session_store::SessionStore;

use std::fs;
use std::path::Path;

/// Ensure the directory holding the storage file exists.
pub fn ensure_data_dir(storage_path: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(storage_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
