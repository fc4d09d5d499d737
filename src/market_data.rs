//! Loading bar series from disk.
//!
//! This is the only asynchronous boundary. A `.bin` file is treated as a
//! bincode snapshot; anything else is parsed as a JSON array of bars.
//! Structural validation of the bars is left to the backtester.

use crate::error::DataError;
use crate::models::PriceBar;
use log::info;
use std::path::Path;

fn is_snapshot(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("bin"))
        .unwrap_or(false)
}

pub fn decode_bar_series(path: &Path, bytes: &[u8]) -> Result<Vec<PriceBar>, DataError> {
    let parse_error = |reason: String| DataError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let bars: Vec<PriceBar> = if is_snapshot(path) {
        bincode::deserialize(bytes).map_err(|err| parse_error(err.to_string()))?
    } else {
        serde_json::from_slice(bytes).map_err(|err| parse_error(err.to_string()))?
    };

    if bars.is_empty() {
        return Err(DataError::Empty(path.to_path_buf()));
    }
    Ok(bars)
}

pub async fn load_bar_series(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bars = decode_bar_series(path, &bytes)?;
    info!("Loaded {} bars from {}", bars.len(), path.display());
    Ok(bars)
}

pub async fn save_bar_snapshot(path: &Path, bars: &[PriceBar]) -> anyhow::Result<()> {
    let bytes = bincode::serialize(bars)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    info!("Wrote {} bars to {}", bars.len(), path.display());
    Ok(())
}
