//! `tilesync estimate`: how much of a sector is still missing.

use clap::Args;
use tilesync::config::format_size;
use tokio_util::sync::CancellationToken;

use super::common::{DetailArgs, ProviderArgs, SectorArgs};
use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub sector: SectorArgs,

    #[command(flatten)]
    pub detail: DetailArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

pub fn run(args: EstimateArgs) -> Result<(), CliError> {
    let runner = CliRunner::new()?;
    runner.log_startup("estimate");

    let provider = runner.provider(args.provider.provider.as_deref(), args.provider.layer.as_deref())?;
    let layer = runner.layer(&provider, args.provider.cache_dir.clone())?;
    let sector = args.sector.to_sector()?;
    let resolution = args.detail.resolution(&layer)?;

    let Some(local) = layer.local_sector(&sector) else {
        println!("{} does not cover {}", layer.name(), sector);
        return Ok(());
    };
    let level = layer
        .compute_level_for_resolution(resolution)
        .map(|l| l.number())
        .unwrap_or_default();

    let mut rng = runner.config().bulk_config().rng();
    let bytes = layer.estimated_missing_data_size(
        &local,
        resolution,
        &mut rng,
        &CancellationToken::new(),
    )?;
    let average = layer.average_tile_size();

    println!("Provider:  {}", layer.name());
    println!("Sector:    {}", local);
    println!("Level:     {}", level);
    println!("Missing:   ~{} tiles", bytes / average.max(1));
    println!("Download:  ~{}", format_size(bytes));
    Ok(())
}

