use crate::store::{BlobStore, BlobStoreError, BlobStoreResult, validate_location};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Directory-backed blob store.
///
/// Objects are laid out as `<root>/<blake3(bucket)>/<blake3(key)>` so arbitrary bucket
/// and key strings (slashes, spaces, `..`) never escape the root. Writes go through a
/// temp file and a rename; readers see either the old object or the new one.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> BlobStoreResult<Self> {
        fs::create_dir_all(root.as_ref()).map_err(|err| {
            BlobStoreError::Backend(format!("create fs blobstore root failed: {err}"))
        })?;
        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(path_segment(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.bucket_dir(bucket).join(path_segment(key))
    }
}

fn path_segment(name: &str) -> String {
    blake3::hash(name.as_bytes()).to_hex().to_string()
}

#[async_trait::async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, bucket: &str, key: &str, bytes: Vec<u8>) -> BlobStoreResult<()> {
        validate_location(bucket, key)?;
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir)
            .map_err(|err| BlobStoreError::Backend(format!("create bucket dir failed: {err}")))?;

        let target = self.object_path(bucket, key);
        let sequence = TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("{}.{sequence}.tmp", std::process::id()));
        fs::write(&tmp, &bytes)
            .map_err(|err| BlobStoreError::Backend(format!("write object failed: {err}")))?;
        fs::rename(&tmp, &target).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            BlobStoreError::Backend(format!("rename object failed: {err}"))
        })?;

        tracing::debug!(bucket, key, size = bytes.len(), "fs blobstore object written");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> BlobStoreResult<Vec<u8>> {
        validate_location(bucket, key)?;
        match fs::read(self.object_path(bucket, key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(BlobStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(err) => Err(BlobStoreError::Backend(format!(
                "read object failed: {err}"
            ))),
        }
    }
}
