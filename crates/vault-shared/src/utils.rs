//! Utility functions

pub fn mask_email(email: &str) -> String {
    if let Some(at_pos) = email.find('@') {
        let (local, domain) = email.split_at(at_pos);
        let keep = if local.chars().count() <= 2 { 1 } else { 2 };
        let prefix: String = local.chars().take(keep).collect();
        format!("{}***{}", prefix, domain)
    } else {
        "***".to_string()
    }
}

/// Lowercased extension after the last dot, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_local_part() {
        assert_eq!(mask_email("alice@auditvault.com"), "al***@auditvault.com");
        assert_eq!(mask_email("a@x.io"), "a***@x.io");
        assert_eq!(mask_email("nobody"), "***");
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(file_extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("archive.tar.docx").as_deref(), Some("docx"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}
