//! Downsampling legality
//!
//! Runs only when an earlier step recorded a [`DownsampleParams`]. The
//! recorded destination must still describe the files on disk, the rate
//! may only drop from hi-res sources, and each media has its own policy.

use crate::error::{StepError, StepResult};
use crate::models::{DownsampleParams, Media, MusicMetadata, StreamInfo};

/// Lowest source sample rate a rate reduction may start from
pub const MIN_DOWNSAMPLE_SOURCE_RATE: u32 = 88200;

/// Lossy files report no bit depth, so it is only compared when discovered
fn check_destination_matches(params: &DownsampleParams, discovered: StreamInfo) -> StepResult<()> {
    let dst = params.destination;
    let bits_match = discovered.bit_depth.is_none() || dst.bit_depth == discovered.bit_depth;
    if dst.sample_rate != discovered.sample_rate || dst.channels != discovered.channels || !bits_match {
        return Err(StepError::fatal(format!(
            "Recorded downsample destination {} does not match the discovered audio files {}",
            params.destination, discovered
        )));
    }
    Ok(())
}

fn check_no_upsampling(params: &DownsampleParams) -> StepResult<()> {
    let (src, dst) = (params.source, params.destination);
    if dst.sample_rate > src.sample_rate {
        return Err(StepError::fatal(format!(
            "Sample rate was raised from {} Hz to {} Hz",
            src.sample_rate, dst.sample_rate
        )));
    }
    if dst.channels > src.channels {
        return Err(StepError::fatal(format!(
            "Channel count was raised from {} to {}",
            src.channels, dst.channels
        )));
    }
    if let (Some(src_bits), Some(dst_bits)) = (src.bit_depth, dst.bit_depth) {
        if dst_bits > src_bits {
            return Err(StepError::fatal(format!(
                "Bit depth was raised from {} to {}",
                src_bits, dst_bits
            )));
        }
    }
    Ok(())
}

fn check_rate_floor(params: &DownsampleParams) -> StepResult<()> {
    let (src, dst) = (params.source, params.destination);
    if src.sample_rate != dst.sample_rate && src.sample_rate < MIN_DOWNSAMPLE_SOURCE_RATE {
        return Err(StepError::fatal(format!(
            "Downsampling from {} Hz to {} Hz is not allowed, source sample rate must be at least {} Hz",
            src.sample_rate, dst.sample_rate, MIN_DOWNSAMPLE_SOURCE_RATE
        )));
    }
    Ok(())
}

fn check_channels_kept(params: &DownsampleParams, media: Media) -> StepResult<()> {
    if params.source.channels != params.destination.channels {
        return Err(StepError::fatal(format!(
            "Downmixing {} source from {} to {} channels is not allowed",
            media, params.source.channels, params.destination.channels
        )));
    }
    Ok(())
}

fn require_redbook(params: &DownsampleParams, reason: &str) -> StepResult<()> {
    if !params.destination.is_redbook() {
        return Err(StepError::fatal(format!(
            "{} must be downsampled to {}, got {}",
            reason,
            StreamInfo::REDBOOK,
            params.destination
        )));
    }
    Ok(())
}

fn check_media_policy(params: &DownsampleParams, metadata: &MusicMetadata) -> StepResult<()> {
    match metadata.media {
        Media::Cd => {
            check_channels_kept(params, metadata.media)?;
            require_redbook(params, "CD source")
        }
        Media::Sacd | Media::BluRay => {
            check_channels_kept(params, metadata.media)?;
            if metadata.format.is_lossy() {
                require_redbook(
                    params,
                    &format!("{} source for a {} transcode", metadata.media, metadata.format),
                )?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Validate the recorded downsample against the discovered stream
pub fn check_downsample(metadata: &MusicMetadata, discovered: StreamInfo) -> StepResult<()> {
    let Some(params) = metadata.additional_data.downsample.as_ref() else {
        tracing::debug!("No downsample recorded, skipping downsample check");
        return Ok(());
    };

    check_destination_matches(params, discovered)?;
    check_no_upsampling(params)?;
    check_rate_floor(params)?;
    check_media_policy(params, metadata)?;

    tracing::debug!(
        source = %params.source,
        destination = %params.destination,
        media = %metadata.media,
        "Downsample check passed"
    );
    Ok(())
}
