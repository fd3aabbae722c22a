use apsara_plot::plot::{parse_cli, run};
use tracing::{info, Level};

fn main() -> anyhow::Result<()> {
    let (csvin, outdir, dpi, verbose) = parse_cli();
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
    info!(
        "read data from {} and plot to {} at {} dpi",
        csvin.display(),
        outdir.display(),
        dpi
    );
    let written = run(&csvin, &outdir, dpi)?;
    for fout in written.iter() {
        info!("saved {}", fout.display());
    }
    Ok(())
}
