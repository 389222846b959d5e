//! Single-slot memo of the last signed manifest.

use std::future::Future;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct CacheEntry {
    raw: String,
    signed: String,
}

/// Remembers the signature of the most recently signed manifest.
///
/// The slot lock is held while signing, so identical concurrent requests
/// make one remote call and different ones are serialized.
#[derive(Debug, Default)]
pub struct ManifestCache {
    slot: Mutex<Option<CacheEntry>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the signed form of `raw`, calling `sign` only on a miss.
    ///
    /// A failed `sign` leaves the cached entry untouched.
    pub async fn get_signed<F, Fut, E>(&self, raw: &str, sign: F) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref().filter(|entry| entry.raw == raw) {
            tracing::debug!("Serving cached signed manifest");
            return Ok(entry.signed.clone());
        }

        let signed = sign().await?;
        *slot = Some(CacheEntry {
            raw: raw.to_string(),
            signed: signed.clone(),
        });
        Ok(signed)
    }

    /// The raw manifest currently cached, if any.
    #[cfg(test)]
    pub(crate) async fn cached_raw(&self) -> Option<String> {
        self.slot.lock().await.as_ref().map(|entry| entry.raw.clone())
    }

    /// Forget the cached entry.
    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}
