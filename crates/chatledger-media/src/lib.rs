// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem [`AssetStore`] for profile and chat photos.
//!
//! Assets land at `<root>/<kind>/<id>.jpg` and are overwritten on every
//! refresh. Chat photos also get an accent colour: the most frequent pixel
//! of a 100x100 downscale, as `#rrggbb`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chatledger_core::{AssetKind, AssetStore, LedgerError, StoredAsset};
use image::imageops::FilterType;
use tracing::{debug, warn};

/// Colour used when the image cannot be decoded.
pub const FALLBACK_COLOR: &str = "#000000";

const SAMPLE_SIZE: u32 = 100;

/// Most frequent colour of `bytes` after a nearest-neighbour resize to
/// 100x100. Ties go to the colour seen first in row-major order.
///
/// Undecodable input yields [`FALLBACK_COLOR`].
pub fn dominant_color(bytes: &[u8]) -> String {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, "failed to decode image for accent colour");
            return FALLBACK_COLOR.to_string();
        }
    };
    let rgb = img
        .resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Nearest)
        .to_rgb8();

    // colour -> (count, first index)
    let mut counts: HashMap<[u8; 3], (u32, usize)> = HashMap::new();
    for (idx, pixel) in rgb.pixels().enumerate() {
        counts.entry(pixel.0).or_insert((0, idx)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (ca, ia)), (_, (cb, ib))| ca.cmp(cb).then(ib.cmp(ia)))
        .map(|([r, g, b], _)| format!("#{r:02x}{g:02x}{b:02x}"))
        .unwrap_or_else(|| FALLBACK_COLOR.to_string())
}

/// Writes assets under a media root directory.
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn asset_error(message: String, e: std::io::Error) -> LedgerError {
        LedgerError::Asset {
            message,
            source: Some(Box::new(e)),
        }
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn persist(
        &self,
        kind: AssetKind,
        id: i64,
        bytes: Vec<u8>,
    ) -> Result<StoredAsset, LedgerError> {
        let relative = format!("{kind}/{id}.jpg");
        let dir = self.root.join(kind.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Self::asset_error(format!("create {}", dir.display()), e))?;

        let (bytes, accent_color) = match kind {
            AssetKind::Chat => {
                let (bytes, color) = tokio::task::spawn_blocking(move || {
                    let color = dominant_color(&bytes);
                    (bytes, color)
                })
                .await
                .map_err(|e| LedgerError::Internal(format!("accent colour task failed: {e}")))?;
                (bytes, Some(color))
            }
            AssetKind::User => (bytes, None),
        };

        let path = self.root.join(&relative);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| Self::asset_error(format!("write {}", path.display()), e))?;
        debug!(path = %path.display(), size = bytes.len(), "asset stored");

        Ok(StoredAsset {
            path: relative,
            accent_color,
        })
    }
}
