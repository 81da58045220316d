//! Round-trip validation by re-reading an encoded file

use crate::euph::EuphFile;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate an encoded EUPH file by parsing it completely and decoding the
/// audio payload.
///
/// # Returns
/// Ok(()) if validation passes, Err otherwise
pub fn validate_container(path: &Path) -> Result<()> {
    log::info!("Validating container: {:?}", path);

    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat container: {:?}", path))?
        .len();
    log::info!("File size: {} bytes", file_size);

    let container =
        EuphFile::open(path).with_context(|| format!("Failed to parse container: {:?}", path))?;

    log::info!(
        "Container version {}.{}",
        container.version.0,
        container.version.1
    );

    // The parser checks the declared length against the stream it consumed;
    // cross-check the on-disk size as well.
    if container.total_length != file_size {
        anyhow::bail!(
            "Declared length {} does not match file size {}",
            container.total_length,
            file_size
        );
    }

    if container.integrity == 0 {
        log::warn!("Container carries no integrity checksum (legacy zero fill)");
    }

    log::info!(
        "META: genre={:?}, tempo={:?}, {} channel(s) at {}Hz, {:.1}s",
        container.metadata.genre,
        container.metadata.tempo,
        container.metadata.channels,
        container.metadata.sample_rate,
        container.metadata.duration
    );
    log::info!("AIMD: {} model reference(s)", container.model_refs.len());

    let audio = container
        .decode_audio()
        .context("AUDI chunk did not decode to a valid lossless buffer")?;
    log::info!(
        "AUDI: {} frames, {} channel(s) at {}Hz",
        audio.frames(),
        audio.channels,
        audio.sample_rate
    );

    log::info!("✅ Container is structurally valid");
    Ok(())
}
