//! Guards between untrusted input and the asset directory
//!
//! Asset names come from catalog records and config values, and inline
//! images come straight from callers. Both are checked here before anything
//! touches the filesystem or a decoder:
//! - No path separators or parent references in asset names
//! - Size cap on inline images and downloaded files

/// Largest inline image accepted for a chat render (16MB)
pub const MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

/// Largest single file accepted by the asset sync (64MB)
pub const MAX_DOWNLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Validate that an asset name is a plain file stem
pub fn validate_asset_name(name: &str) -> Result<(), SandboxError> {
    if name.trim().is_empty() {
        return Err(SandboxError::EmptyName);
    }
    if name.contains("..") || name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(SandboxError::PathTraversal);
    }
    Ok(())
}

/// Check that an inline image fits the size budget
pub fn check_image_size(bytes: usize) -> Result<(), SandboxError> {
    if bytes > MAX_IMAGE_BYTES {
        return Err(SandboxError::FileTooLarge { bytes, limit: MAX_IMAGE_BYTES });
    }
    Ok(())
}

/// Check that a downloaded body fits the size budget
pub fn check_download_size(bytes: usize) -> Result<(), SandboxError> {
    if bytes > MAX_DOWNLOAD_BYTES {
        return Err(SandboxError::FileTooLarge { bytes, limit: MAX_DOWNLOAD_BYTES });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SandboxError {
    #[error("Asset name is empty")]
    EmptyName,
    #[error("Path traversal not allowed")]
    PathTraversal,
    #[error("File of {bytes} bytes exceeds the {limit} byte limit")]
    FileTooLarge { bytes: usize, limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass() {
        assert!(validate_asset_name("Hoshino").is_ok());
        assert!(validate_asset_name("Skill_Portrait_Hoshino").is_ok());
        assert!(validate_asset_name("星野").is_ok());
    }

    #[test]
    fn traversal_is_rejected() {
        assert_eq!(validate_asset_name("../secret"), Err(SandboxError::PathTraversal));
        assert_eq!(validate_asset_name("a/b"), Err(SandboxError::PathTraversal));
        assert_eq!(validate_asset_name("a\\b"), Err(SandboxError::PathTraversal));
        assert_eq!(validate_asset_name("  "), Err(SandboxError::EmptyName));
    }

    #[test]
    fn size_caps() {
        assert!(check_image_size(1024).is_ok());
        assert!(matches!(
            check_image_size(MAX_IMAGE_BYTES + 1),
            Err(SandboxError::FileTooLarge { .. })
        ));
        assert!(check_download_size(MAX_IMAGE_BYTES + 1).is_ok());
    }

    #[test]
    fn errors_describe_the_limit() {
        let err = check_image_size(MAX_IMAGE_BYTES + 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("File of {} bytes exceeds the {} byte limit", MAX_IMAGE_BYTES + 1, MAX_IMAGE_BYTES)
        );
        let boxed: Box<dyn std::error::Error> = Box::new(SandboxError::PathTraversal);
        assert_eq!(boxed.to_string(), "Path traversal not allowed");
    }
}
