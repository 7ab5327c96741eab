use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.html";

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "json" => "application/json; charset=utf-8",
        "webmanifest" => "application/manifest+json; charset=utf-8",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Maps a request path onto an existing file under `root`.
///
/// Returns `None` when the root or target does not exist, or when the
/// canonical target lies outside the canonical root (`..`, absolute
/// segments, symlinks pointing elsewhere). Directories resolve to their
/// `index.html`.
pub async fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let rel = request_path.trim_start_matches('/');
    let rel = if rel.is_empty() { INDEX_FILE } else { rel };

    let root = tokio::fs::canonicalize(root).await.ok()?;
    let mut target = tokio::fs::canonicalize(root.join(rel)).await.ok()?;
    if !target.starts_with(&root) {
        tracing::warn!(path = %request_path, "static path escapes public root");
        return None;
    }

    let meta = tokio::fs::metadata(&target).await.ok()?;
    if meta.is_dir() {
        target = tokio::fs::canonicalize(target.join(INDEX_FILE)).await.ok()?;
        if !target.starts_with(&root) {
            return None;
        }
    }
    tokio::fs::metadata(&target)
        .await
        .ok()
        .filter(|m| m.is_file())
        .map(|_| target)
}

/// Reads a resolved static file along with its content type.
pub async fn load(root: &Path, request_path: &str) -> Option<(Vec<u8>, &'static str)> {
    let path = resolve(root, request_path).await?;
    match tokio::fs::read(&path).await {
        Ok(bytes) => Some((bytes, content_type_for(&path))),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "static file unreadable");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_tree() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("public");
        std::fs::create_dir_all(public.join("docs")).unwrap();
        std::fs::write(public.join("index.html"), "<h1>intake</h1>").unwrap();
        std::fs::write(public.join("app.js"), "console.log(1)").unwrap();
        std::fs::write(public.join("docs").join("index.html"), "docs").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
        (dir, public)
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a/INDEX.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("site.webmanifest")), "application/manifest+json; charset=utf-8");
        assert_eq!(content_type_for(Path::new("logo.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("blob.bin")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("Makefile")), "application/octet-stream");
    }

    #[tokio::test]
    async fn resolves_files_and_directory_indexes() {
        let (_dir, public) = public_tree();
        let root = public.canonicalize().unwrap();

        assert_eq!(resolve(&public, "/").await, Some(root.join("index.html")));
        assert_eq!(resolve(&public, "/app.js").await, Some(root.join("app.js")));
        assert_eq!(resolve(&public, "//docs").await, Some(root.join("docs").join("index.html")));
        assert_eq!(resolve(&public, "/missing.css").await, None);
    }

    #[tokio::test]
    async fn refuses_paths_outside_root() {
        let (dir, public) = public_tree();

        assert_eq!(resolve(&public, "/../secret.txt").await, None);
        assert_eq!(resolve(&public, "/docs/../../secret.txt").await, None);
        let absolute = dir.path().join("secret.txt");
        assert_eq!(resolve(&public, absolute.to_str().unwrap()).await, None);
    }

    #[tokio::test]
    async fn missing_root_serves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(&dir.path().join("public"), "/").await, None);
    }
}
