//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}-{unix millis}-{random 0..1e9}.{extension}`. The
//! user-supplied filename never contributes to a key.

use rand::Rng;
use sheetchart_core::constants::STORED_FILENAME_PREFIX;

/// Generate a storage filename for an upload with the given (validated) extension.
pub fn generate_stored_filename(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..1_000_000_000);
    let extension = extension.trim_start_matches('.').to_lowercase();
    if extension.is_empty() {
        format!("{}-{}-{}", STORED_FILENAME_PREFIX, millis, suffix)
    } else {
        format!("{}-{}-{}.{}", STORED_FILENAME_PREFIX, millis, suffix, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_filename_shape() {
        let name = generate_stored_filename("XLSX");
        assert!(name.starts_with("excel-"));
        assert!(name.ends_with(".xlsx"));
        let parts: Vec<&str> = name.trim_end_matches(".xlsx").split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert!(parts[2].parse::<u32>().unwrap() < 1_000_000_000);
    }

    #[test]
    fn stored_filenames_differ() {
        let a = generate_stored_filename("xls");
        let b = generate_stored_filename("xls");
        assert_ne!(a, b);
    }
}
