//! Blob store adapters

pub mod local;
pub mod memory;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;

/// `{millis}-{uuid}-{sanitized original name}`
pub(crate) fn generate_key(original_filename: &str) -> String {
    let sanitized: String = original_filename
        .chars()
        .rev()
        .take(100)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple(),
        sanitized
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_unique_and_path_safe() {
        let a = generate_key("../../etc/passwd");
        let b = generate_key("../../etc/passwd");
        assert_ne!(a, b);
        assert!(!a.contains('/'));
        assert!(a.ends_with(".._.._etc_passwd"));
    }

    #[test]
    fn long_names_keep_their_extension() {
        let name = format!("{}.pdf", "x".repeat(300));
        assert!(generate_key(&name).ends_with(".pdf"));
    }
}
