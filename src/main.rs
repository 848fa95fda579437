use anyhow::{Context, Result};
use clap::Parser;

use subphoto_split::logging::setup_logging;
use subphoto_split::{
    BatchRunner, Cli, FixedThreshold, ImageCodec, KeepOrientation, SubphotoExtractor,
    TimestampIdGenerator,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _logger = setup_logging(cli.verbose).context("Failed to initialize logging")?;

    let codec = ImageCodec::new(cli.quality).context("Invalid output quality")?;

    let mut extractor = SubphotoExtractor::new()
        .with_threshold(FixedThreshold::new(cli.threshold))
        .with_angle_convention(cli.angle_convention.into());
    if cli.no_orient {
        extractor = extractor.with_orientation(KeepOrientation);
    }

    let runner = BatchRunner::new(cli.batch_config(), codec, extractor)
        .context("Invalid batch configuration")?;

    log::debug!("Configuration: {:?}", runner.config());
    log::debug!(
        "Background level {}, angle convention {:?}, JPEG quality {}",
        cli.threshold,
        cli.angle_convention,
        codec.jpeg_quality()
    );

    runner
        .prepare_folders()
        .context("Failed to prepare folders")?;

    let summary = runner
        .run(&mut TimestampIdGenerator)
        .context("Batch aborted")?;

    log::info!(
        "Done: {} scan(s) split into {} photo(s), {} skipped, {} crop(s) dropped",
        summary.processed,
        summary.crops_written,
        summary.skipped,
        summary.crops_dropped
    );
    if summary.moves_failed > 0 {
        log::warn!(
            "{} processed scan(s) could not be moved and are still in {:?}",
            summary.moves_failed,
            runner.config().input_dir
        );
    }

    Ok(())
}
