use async_trait::async_trait;

use crate::error::SizeError;

/// Looks up the total byte length of a resource.
///
/// This is the host platform's file-size service seen through a trait
/// seam: the controller only needs the length, not the transport.
///
/// Implementations must be cheap to share (`Send + Sync`); the
/// controller keeps one behind an `Arc` for the life of the session.
#[async_trait]
pub trait SizeResolver: Send + Sync {
    /// Returns the total size in bytes of the resource at `path`.
    async fn total_size(&self, path: &str) -> Result<u64, SizeError>;
}
