//! File browser controller.
//!
//! Owns the path cursor and the latest bucket snapshot, and runs the user
//! actions against the platform. Every action clears the error banner when it
//! starts and clears the busy flag when it ends; a failure sets the banner
//! and otherwise leaves the state as it was.

use std::path::Path;
use std::sync::Arc;

use namespace::{children_at, Listing, NamespaceError, NamespaceIndex, PathCursor, StoredObject};
use url::Url;

use super::local;
use crate::error::ActionError;
use crate::platform::Platform;

/// Generate a platform object id.
///
/// 32 lowercase hex characters, inside the platform's id alphabet and length.
pub fn new_object_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Browser over one bucket.
pub struct FileBrowser<P: Platform> {
    platform: Arc<P>,
    bucket_id: String,
    max_size: u64,
    cursor: PathCursor,
    objects: Vec<StoredObject>,
    busy: bool,
    error: Option<ActionError>,
}

impl<P: Platform> FileBrowser<P> {
    /// Create a browser at the root with an empty snapshot.
    pub fn new(platform: Arc<P>, bucket_id: impl Into<String>, max_size: u64) -> Self {
        Self {
            platform,
            bucket_id: bucket_id.into(),
            max_size,
            cursor: PathCursor::root(),
            objects: Vec::new(),
            busy: false,
            error: None,
        }
    }

    pub fn cursor(&self) -> &PathCursor {
        &self.cursor
    }

    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// The whole-bucket snapshot from the last successful refresh.
    pub fn objects(&self) -> &[StoredObject] {
        &self.objects
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// The error banner, if one is showing.
    pub fn error(&self) -> Option<&ActionError> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Show a banner for an action run outside the browser, such as logout.
    pub fn show_error(&mut self, error: ActionError) {
        self.error = Some(error);
    }

    /// Children of the cursor in the current snapshot.
    pub fn listing(&self) -> Listing<'_> {
        children_at(&self.objects, &self.cursor)
    }

    /// Trie index over the current snapshot.
    pub fn index(&self) -> NamespaceIndex<'_> {
        NamespaceIndex::build(&self.objects)
    }

    /// Find an object of the snapshot by its full key.
    pub fn find_by_key(&self, key: &str) -> Option<&StoredObject> {
        self.objects.iter().find(|o| o.key == key)
    }

    /// Move the cursor into a child folder.
    pub fn open_folder(&mut self, name: &str) -> Result<(), NamespaceError> {
        self.cursor.open(name)
    }

    /// Move the cursor to its parent. No-op at the root.
    pub fn back(&mut self) {
        self.cursor.back();
    }

    /// Move the cursor to the root.
    pub fn home(&mut self) {
        self.cursor.home();
    }

    /// Move the cursor to a breadcrumb.
    pub fn jump(&mut self, index: usize) -> Result<(), NamespaceError> {
        self.cursor.jump(index)
    }

    /// Replace the cursor.
    pub fn set_cursor(&mut self, cursor: PathCursor) {
        self.cursor = cursor;
    }

    fn begin(&mut self) {
        self.busy = true;
        self.error = None;
    }

    fn finish<T>(&mut self, result: Result<T, ActionError>) -> Result<T, ActionError> {
        self.busy = false;
        if let Err(e) = &result {
            tracing::warn!("{}", e);
            self.error = Some(e.clone());
        }
        result
    }

    async fn fetch(&mut self) -> Result<(), ActionError> {
        match self.platform.list_objects(&self.bucket_id).await {
            Ok(objects) => {
                tracing::debug!("Fetched {} objects from {}", objects.len(), self.bucket_id);
                self.objects = objects;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Listing {} failed: {}", self.bucket_id, e);
                Err(ActionError::List)
            }
        }
    }

    /// After a successful mutation the snapshot is refetched; a failed
    /// refetch shows its own banner without failing the mutation.
    async fn refetch_after(&mut self) {
        if let Err(e) = self.fetch().await {
            self.error = Some(e);
        }
    }

    /// Refetch the bucket snapshot.
    pub async fn refresh(&mut self) -> Result<(), ActionError> {
        self.begin();
        let result = self.fetch().await;
        self.finish(result)
    }

    async fn store(&self, key: &str, path: &Path) -> Result<StoredObject, String> {
        let data = local::read_upload(path, self.max_size)
            .await
            .map_err(|e| e.to_string())?;
        let object_id = new_object_id();
        tracing::debug!("Uploading {} as {} ({} bytes)", path.display(), key, data.len());
        self.platform
            .create_object(&self.bucket_id, &object_id, key, data)
            .await
            .map_err(|e| e.to_string())
    }

    async fn upload_one(&self, path: &Path) -> Result<StoredObject, ActionError> {
        let name = local::file_name(path).map_err(|e| ActionError::Upload(e.to_string()))?;
        let key = self
            .cursor
            .key_for(&name)
            .map_err(|e| ActionError::Upload(e.to_string()))?;
        self.store(&key, path).await.map_err(ActionError::Upload)
    }

    /// Upload one local file into the current folder.
    pub async fn upload_file(&mut self, path: &Path) -> Result<StoredObject, ActionError> {
        self.begin();
        let result = self.upload_one(path).await;
        if let Ok(object) = &result {
            tracing::info!("Uploaded {}", object.key);
            self.refetch_after().await;
        }
        self.finish(result)
    }

    async fn upload_tree(&self, dir: &Path) -> Result<Vec<StoredObject>, ActionError> {
        let fail = |e: String| ActionError::FolderUpload(e);

        let dir_name = local::file_name(dir).map_err(|e| fail(e.to_string()))?;
        let files = local::collect_files(dir).map_err(|e| fail(e.to_string()))?;

        let mut uploaded = Vec::with_capacity(files.len());
        for file in &files {
            let key = self
                .cursor
                .key_for(&format!("{}/{}", dir_name, file.relative))
                .map_err(|e| fail(e.to_string()))?;
            // The first failure stops the upload; earlier files stay stored.
            let object = self.store(&key, &file.path).await.map_err(fail)?;
            uploaded.push(object);
        }
        Ok(uploaded)
    }

    /// Upload every regular file under `dir`, keeping its structure under a
    /// folder named after `dir`. Files are uploaded one at a time.
    pub async fn upload_folder(&mut self, dir: &Path) -> Result<Vec<StoredObject>, ActionError> {
        self.begin();
        let result = self.upload_tree(dir).await;
        if let Ok(uploaded) = &result {
            if uploaded.is_empty() {
                tracing::debug!("Nothing to upload under {}", dir.display());
            } else {
                tracing::info!("Uploaded {} files from {}", uploaded.len(), dir.display());
                self.refetch_after().await;
            }
        }
        self.finish(result)
    }

    /// URL the object can be downloaded from.
    pub fn download_url(&mut self, object_id: &str) -> Result<Url, ActionError> {
        self.begin();
        let result = self
            .platform
            .download_url(&self.bucket_id, object_id)
            .map_err(|e| ActionError::Download(e.to_string()));
        self.finish(result)
    }

    /// Download an object into `dest`, returning the bytes written.
    pub async fn download_to(&mut self, object_id: &str, dest: &Path) -> Result<u64, ActionError> {
        self.begin();
        let result = self
            .platform
            .download_to(&self.bucket_id, object_id, dest)
            .await
            .map_err(|e| ActionError::Download(e.to_string()));
        if let Ok(written) = &result {
            tracing::info!("Downloaded {} bytes to {}", written, dest.display());
        }
        self.finish(result)
    }

    /// Delete an object and refetch the snapshot.
    pub async fn delete(&mut self, object_id: &str) -> Result<(), ActionError> {
        self.begin();
        let result = self
            .platform
            .delete_object(&self.bucket_id, object_id)
            .await
            .map_err(|e| ActionError::Delete(e.to_string()));
        if result.is_ok() {
            tracing::info!("Deleted {}", object_id);
            self.refetch_after().await;
        }
        self.finish(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryPlatform, Operation};
    use tempfile::TempDir;

    const BUCKET: &str = "files";

    async fn create_browser() -> FileBrowser<MemoryPlatform> {
        let platform = MemoryPlatform::new();
        platform.add_account("ada@example.com", "pw", "Ada");
        platform.create_session("ada@example.com", "pw").await.unwrap();
        FileBrowser::new(Arc::new(platform), BUCKET, 1024)
    }

    #[test]
    fn test_new_object_id() {
        let id = new_object_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, new_object_id());
    }

    #[tokio::test]
    async fn test_refresh_and_listing() {
        let mut browser = create_browser().await;
        browser.platform.insert_object(BUCKET, "docs/a.txt", b"a");
        browser.platform.insert_object(BUCKET, "docs/b.txt", b"b");
        browser.platform.insert_object(BUCKET, "x.txt", b"x");

        browser.refresh().await.unwrap();
        let listing = browser.listing();
        assert_eq!(listing.folders.iter().copied().collect::<Vec<_>>(), vec!["docs"]);
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.len(), 2);

        browser.open_folder("docs").unwrap();
        assert_eq!(browser.listing().files.len(), 2);
        browser.back();
        assert!(browser.cursor().is_root());
    }

    #[tokio::test]
    async fn test_refresh_failure_banner() {
        let mut browser = create_browser().await;
        browser.platform.fail(Operation::ListObjects);

        let err = browser.refresh().await.unwrap_err();
        assert_eq!(err, ActionError::List);
        assert_eq!(browser.error().unwrap().to_string(), "Failed to fetch files");
        assert!(!browser.is_busy());
    }

    #[tokio::test]
    async fn test_upload_into_current_folder() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("c.txt");
        std::fs::write(&path, b"hello").unwrap();

        let mut browser = create_browser().await;
        browser.set_cursor(PathCursor::parse("a/b"));
        let object = browser.upload_file(&path).await.unwrap();

        assert_eq!(object.key, "a/b/c.txt");
        assert_eq!(browser.listing().files.len(), 1);
        assert!(browser.error().is_none());
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.bin");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let mut browser = create_browser().await;
        let err = browser.upload_file(&path).await.unwrap_err();
        assert!(err.to_string().starts_with("Upload failed: "));
        assert!(browser.platform.keys(BUCKET).is_empty());
    }

    #[tokio::test]
    async fn test_action_clears_previous_banner() {
        let mut browser = create_browser().await;
        browser.platform.fail(Operation::ListObjects);
        browser.refresh().await.unwrap_err();

        browser.platform.recover(Operation::ListObjects);
        browser.refresh().await.unwrap();
        assert!(browser.error().is_none());
    }

    #[tokio::test]
    async fn test_upload_succeeds_when_refetch_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, b"a").unwrap();

        let mut browser = create_browser().await;
        browser.platform.fail(Operation::ListObjects);
        assert!(browser.upload_file(&path).await.is_ok());
        assert_eq!(browser.error(), Some(&ActionError::List));
        assert_eq!(browser.platform.keys(BUCKET), vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_delete() {
        let mut browser = create_browser().await;
        let object = browser.platform.insert_object(BUCKET, "x.txt", b"x");
        browser.refresh().await.unwrap();

        browser.delete(&object.id).await.unwrap();
        assert!(browser.listing().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_snapshot() {
        let mut browser = create_browser().await;
        let object = browser.platform.insert_object(BUCKET, "x.txt", b"x");
        browser.refresh().await.unwrap();

        browser.platform.fail(Operation::DeleteObject);
        let err = browser.delete(&object.id).await.unwrap_err();
        assert!(err.to_string().starts_with("Delete failed: "));
        assert_eq!(browser.objects().len(), 1);
        assert!(!browser.is_busy());
    }

    #[tokio::test]
    async fn test_download() {
        let temp = TempDir::new().unwrap();
        let mut browser = create_browser().await;
        let object = browser.platform.insert_object(BUCKET, "x.txt", b"xyz");

        let dest = temp.path().join("out.txt");
        assert_eq!(browser.download_to(&object.id, &dest).await.unwrap(), 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"xyz");

        let url = browser.download_url(&object.id).unwrap();
        assert!(url.path().ends_with("/download"));
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let mut browser = create_browser().await;
        browser.platform.insert_object(BUCKET, "docs/a.txt", b"a");
        browser.refresh().await.unwrap();

        assert!(browser.find_by_key("docs/a.txt").is_some());
        assert!(browser.find_by_key("docs").is_none());
        assert!(browser.index().contains_folder(&PathCursor::parse("docs")));
    }
}
