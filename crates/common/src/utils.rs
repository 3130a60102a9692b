//! Utility functions

use uuid::Uuid;

/// New time-ordered version identifier in the 32-hex-digit form vault versions use.
pub fn new_version_id() -> String {
    Uuid::now_v7().simple().to_string()
}
