// src/services/image_store.rs

//! The file store: uploaded image blobs under a "products" namespace,
//! addressed by a content-derived filename.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::errors::Result;

/// Namespace directory for product images, mirrored in their public URLs.
pub const PRODUCTS_NAMESPACE: &str = "products";

/// Abstraction over image blob storage. The production implementation writes
/// to disk; tests substitute an in-memory map.
#[async_trait]
pub trait ImageStore: Send + Sync {
  /// Stores the blob under a content-derived name and returns that name.
  async fn store(&self, bytes: &[u8], extension: &str) -> Result<String>;

  /// Reads a stored blob back. Fails when the blob is absent.
  async fn load(&self, filename: &str) -> Result<Vec<u8>>;

  /// Removes a blob. Deleting an absent blob is a no-op, not an error.
  async fn delete(&self, filename: &str) -> Result<()>;

  /// Public URL at which the blob can be fetched.
  fn url(&self, filename: &str) -> String;
}

/// Derives the storage filename for a blob: the hex sha-256 of its content
/// plus the original file extension. Identical content therefore maps to an
/// identical name.
pub fn hashed_filename(bytes: &[u8], extension: &str) -> String {
  let digest = Sha256::digest(bytes);
  format!("{:x}.{}", digest, extension.to_ascii_lowercase())
}

/// Filesystem-backed image store rooted at the configured upload directory.
pub struct DiskImageStore {
  root: PathBuf,
}

impl DiskImageStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  fn blob_path(&self, filename: &str) -> PathBuf {
    // Filenames are always repository-generated hex digests, but reject
    // anything path-like in case a stored value was tampered with.
    let safe = Path::new(filename)
      .file_name()
      .map(|n| n.to_os_string())
      .unwrap_or_default();
    self.root.join(PRODUCTS_NAMESPACE).join(safe)
  }
}

#[async_trait]
impl ImageStore for DiskImageStore {
  #[instrument(name = "image_store::store", skip(self, bytes), fields(size = bytes.len(), extension))]
  async fn store(&self, bytes: &[u8], extension: &str) -> Result<String> {
    let filename = hashed_filename(bytes, extension);
    let path = self.blob_path(&filename);
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;
    info!("Stored image blob {}.", filename);
    Ok(filename)
  }

  #[instrument(name = "image_store::load", skip(self))]
  async fn load(&self, filename: &str) -> Result<Vec<u8>> {
    Ok(tokio::fs::read(self.blob_path(filename)).await?)
  }

  #[instrument(name = "image_store::delete", skip(self))]
  async fn delete(&self, filename: &str) -> Result<()> {
    match tokio::fs::remove_file(self.blob_path(filename)).await {
      Ok(()) => {
        info!("Deleted image blob {}.", filename);
        Ok(())
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        warn!("Image blob {} was already absent.", filename);
        Ok(())
      }
      Err(e) => Err(e.into()),
    }
  }

  fn url(&self, filename: &str) -> String {
    format!("/storage/{}/{}", PRODUCTS_NAMESPACE, filename)
  }
}
