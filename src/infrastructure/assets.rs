use std::path::Path;

/// Create the local assets directory if it is missing.
pub async fn ensure_assets_dir(root: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(root).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_creates_missing_and_tolerates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("assets");

        ensure_assets_dir(&root).await.unwrap();
        assert!(root.is_dir());
        ensure_assets_dir(&root).await.unwrap();
    }
}
