//! src/services/asset_store.rs
//!
//! AssetStore: uploaded lecture files kept flat inside one directory and
//! addressed by a generated name of the form `<epoch-millis>-<sanitized-name>`.

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut, stream};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::record_store::{StoreError, StoreResult};

const MAX_FILE_NAME_LEN: usize = 255;
/// Bytes reserved for the `<epoch-millis>-<infix>-` prefix of generated names.
const NAME_PREFIX_BUDGET: usize = 32;
const MAX_NAME_ATTEMPTS: usize = 8;
const TMP_PREFIX: &str = ".tmp-";

/// Result of a successful `store` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Generated name under which the bytes were written.
    pub file_name: String,

    /// Number of bytes written.
    pub size_bytes: u64,
}

/// AssetStore persists raw upload bytes on local disk.
#[derive(Clone)]
pub struct AssetStore {
    /// Directory where lecture files are stored.
    pub base_path: PathBuf,
}

impl AssetStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create the storage directory if it is missing and remove temporary
    /// files left behind by interrupted uploads.
    pub async fn ensure_dir(&self) -> StoreResult<()> {
        if !fs::try_exists(&self.base_path).await? {
            fs::create_dir_all(&self.base_path).await?;
            info!("Created uploads directory at {}", self.base_path.display());
            return Ok(());
        }

        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(TMP_PREFIX) {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(_) => info!("Removed stale temporary upload {}", entry.path().display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::Io(err)),
            }
        }
        Ok(())
    }

    /// Names of all stored assets, temporary files excluded.
    pub async fn list_assets(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Reject names that could escape the storage directory.
    ///
    /// A leading dot covers `.`, `..` and hidden temporary files.
    fn ensure_file_name_safe(&self, file_name: &str) -> StoreResult<()> {
        if file_name.is_empty() || file_name.len() > MAX_FILE_NAME_LEN {
            return Err(StoreError::InvalidFileName);
        }
        if file_name.starts_with('.') {
            return Err(StoreError::InvalidFileName);
        }
        if file_name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
        {
            return Err(StoreError::InvalidFileName);
        }
        Ok(())
    }

    fn asset_path(&self, file_name: &str) -> PathBuf {
        self.base_path.join(file_name)
    }

    /// Stream an upload to disk under a freshly generated name.
    ///
    /// - Writes chunks to a hidden temporary file.
    /// - Flushes and fsyncs, then hard-links it under the final name.
    /// - Never overwrites an existing asset: linking fails on a taken name,
    ///   and the next attempt adds a random infix.
    ///
    /// The temporary file is removed on any error.
    pub async fn store<S>(&self, original_name: &str, stream: S) -> StoreResult<StoredAsset>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let safe_name = sanitize_file_name(original_name);
        let tmp_path = self.base_path.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StoreError::Io(err));
                }
            };
            size_bytes += chunk.len() as u64;
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        drop(file);

        let claimed = self.claim_name(&tmp_path, &safe_name).await;
        let _ = fs::remove_file(&tmp_path).await;
        let file_name = claimed?;

        debug!("stored {} bytes as {}", size_bytes, file_name);
        Ok(StoredAsset {
            file_name,
            size_bytes,
        })
    }

    /// Link the finished temporary file under a name nobody else holds.
    ///
    /// `hard_link` fails with `AlreadyExists` instead of replacing, so two
    /// uploads can never end up on the same path.
    async fn claim_name(&self, tmp_path: &Path, safe_name: &str) -> StoreResult<String> {
        let millis = Utc::now().timestamp_millis();
        let mut file_name = format!("{}-{}", millis, safe_name);
        for _ in 0..MAX_NAME_ATTEMPTS {
            match fs::hard_link(tmp_path, self.asset_path(&file_name)).await {
                Ok(_) => return Ok(file_name),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let infix = Uuid::new_v4().simple().to_string();
                    file_name = format!("{}-{}-{}", millis, &infix[..8], safe_name);
                    debug!("asset name clash, retrying as {}", file_name);
                }
                Err(err) => return Err(StoreError::Io(err)),
            }
        }
        Err(StoreError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            "could not find a free asset name",
        )))
    }

    /// Store an in-memory buffer.
    pub async fn store_bytes(&self, original_name: &str, bytes: Bytes) -> StoreResult<StoredAsset> {
        self.store(original_name, stream::once(async { Ok(bytes) }))
            .await
    }

    /// Open an asset for streaming out, together with its length.
    pub async fn retrieve(&self, file_name: &str) -> StoreResult<(File, u64)> {
        self.ensure_file_name_safe(file_name)?;
        let file = File::open(self.asset_path(file_name))
            .await
            .map_err(|err| not_found_or_io(err, file_name))?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    /// Remove an asset. Returns `false` when the file was already gone.
    pub async fn delete(&self, file_name: &str) -> StoreResult<bool> {
        self.ensure_file_name_safe(file_name)?;
        let file_path = self.asset_path(file_name);
        match fs::remove_file(&file_path).await {
            Ok(_) => {
                debug!("removed asset {}", file_path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("asset {} already missing", file_path.display());
                Ok(false)
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

fn not_found_or_io(err: io::Error, file_name: &str) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::AssetNotFound(file_name.to_string())
    } else {
        StoreError::Io(err)
    }
}

/// Reduce a client-supplied file name to a single safe path segment.
///
/// Keeps the last path component, replaces spaces, separators and control
/// characters with `_` and strips leading dots. The result fits in the
/// file name byte limit together with the generated prefix. Falls back to
/// `upload`.
pub fn sanitize_file_name(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c == ' ' || c.is_control() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect();

    let budget = MAX_FILE_NAME_LEN - NAME_PREFIX_BUDGET;
    let cleaned = truncate_to_bytes(cleaned.trim_start_matches('.'), budget);
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char boundary.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn temp_store() -> AssetStore {
        let dir = std::env::temp_dir().join(format!("asset_store_{}", Uuid::new_v4()));
        let store = AssetStore::new(dir);
        store.ensure_dir().await.unwrap();
        store
    }

    #[test]
    fn sanitize_replaces_spaces_and_strips_paths() {
        assert_eq!(sanitize_file_name("week 1 notes.pdf"), "week_1_notes.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\slides.pptx"), "slides.pptx");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("dir/"), "upload");
    }

    #[tokio::test]
    async fn store_then_retrieve_returns_same_bytes() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let chunks = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let asset = store.store("greeting file.txt", stream::iter(chunks)).await?;
        assert_eq!(asset.size_bytes, 11);
        assert!(asset.file_name.ends_with("-greeting_file.txt"));

        let (mut file, len) = store.retrieve(&asset.file_name).await?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        assert_eq!(len, 11);
        assert_eq!(buf, b"hello world");

        let _ = tokio::fs::remove_dir_all(&store.base_path).await;
        Ok(())
    }

    #[tokio::test]
    async fn store_never_overwrites_existing_asset() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let first = store.store_bytes("same.txt", Bytes::from_static(b"one")).await?;
        let second = store.store_bytes("same.txt", Bytes::from_static(b"two")).await?;
        assert_ne!(first.file_name, second.file_name);

        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&store.base_path).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names.len(), 2, "temporary files must not linger: {names:?}");
        Ok(())
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_files() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(ErrorKind::ConnectionReset, "client went away")),
        ];
        let err = store.store("broken.bin", stream::iter(chunks)).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        let mut entries = tokio::fs::read_dir(&store.base_path).await?;
        assert!(entries.next_entry().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn delete_tolerates_missing_file() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let asset = store.store_bytes("a.txt", Bytes::from_static(b"a")).await?;

        assert!(store.delete(&asset.file_name).await?);
        assert!(!store.delete(&asset.file_name).await?);
        assert!(matches!(
            store.retrieve(&asset.file_name).await,
            Err(StoreError::AssetNotFound(_))
        ));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_same_name_uploads_get_distinct_files() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let mut tasks = Vec::new();
        for i in 0..64u32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .store_bytes("same.txt", Bytes::from(i.to_string()))
                    .await
                    .map(|asset| (i, asset))
            }));
        }

        let mut stored = Vec::new();
        for task in tasks {
            stored.push(task.await??);
        }

        let mut names: Vec<_> = stored.iter().map(|(_, a)| a.file_name.clone()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 64);
        assert_eq!(store.list_assets().await?.len(), 64);

        for (i, asset) in &stored {
            let (mut file, _) = store.retrieve(&asset.file_name).await?;
            let mut buf = String::new();
            file.read_to_string(&mut buf).await?;
            assert_eq!(buf, i.to_string());
        }
        Ok(())
    }

    #[tokio::test]
    async fn long_multibyte_names_fit_the_limit() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let original = format!("{}.pdf", "ü".repeat(150));

        let first = store.store_bytes(&original, Bytes::from_static(b"a")).await?;
        let second = store.store_bytes(&original, Bytes::from_static(b"b")).await?;
        for asset in [&first, &second] {
            assert!(asset.file_name.len() <= MAX_FILE_NAME_LEN);
            store.retrieve(&asset.file_name).await?;
        }

        let sanitized = sanitize_file_name(&original);
        assert!(sanitized.len() <= MAX_FILE_NAME_LEN - NAME_PREFIX_BUDGET);
        assert!(sanitized.chars().all(|c| c == 'ü'));
        Ok(())
    }

    #[tokio::test]
    async fn accepts_legacy_names_with_double_dots() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let legacy = "1718000000000-notes..v2.pdf";
        tokio::fs::write(store.base_path.join(legacy), b"legacy").await?;

        let (_, len) = store.retrieve(legacy).await?;
        assert_eq!(len, 6);
        assert!(store.delete(legacy).await?);
        Ok(())
    }

    #[tokio::test]
    async fn ensure_dir_sweeps_stale_temp_files() -> Result<(), anyhow::Error> {
        let store = temp_store().await;
        let kept = store.store_bytes("kept.txt", Bytes::from_static(b"k")).await?;
        tokio::fs::write(store.base_path.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4())), b"x").await?;

        store.ensure_dir().await?;
        assert_eq!(store.list_assets().await?, vec![kept.file_name]);
        let mut entries = tokio::fs::read_dir(&store.base_path).await?;
        let mut count = 0;
        while entries.next_entry().await?.is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn rejects_traversal_names() {
        let store = temp_store().await;
        for name in ["", "../secret", "a/b", "..", ".", ".tmp-x", "a\\b"] {
            assert!(
                matches!(store.retrieve(name).await, Err(StoreError::InvalidFileName)),
                "{name} should be rejected"
            );
        }
    }
}
