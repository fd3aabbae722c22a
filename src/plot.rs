use super::charts::{chart_table, DEFAULT_DPI};
use super::{PortThroughput, DEFAULT_CSV, VERSION};
use anyhow::Context;
use clap::{value_t, App, Arg};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

fn cli_app() -> App<'static, 'static> {
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("name of the csv file with the ports and throughput columns")
        .short("f")
        .long("csvfile")
        .takes_value(true)
        .default_value(DEFAULT_CSV);
    let arg_outdir = Arg::with_name("output_dir")
        .help("directory for the png charts, created if missing")
        .short("o")
        .long("outdir")
        .takes_value(true)
        .default_value(".");
    let arg_dpi = Arg::with_name("dpi")
        .help("resolution of the png charts, in dots per inch")
        .short("d")
        .long("dpi")
        .takes_value(true)
        .default_value("300")
        .validator(|v| match v.parse::<u32>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(String::from("dpi must be a positive integer")),
        });
    let arg_verbose = Arg::with_name("verbose")
        .help("print debug information")
        .short("v")
        .long("verbose")
        .takes_value(false);
    App::new("apsara_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the APSARA throughput against the number of input ports")
        .arg(arg_csvin)
        .arg(arg_outdir)
        .arg(arg_dpi)
        .arg(arg_verbose)
}

/// Takes the CLI arguments that control the plotting of the throughput charts:
/// input csv, output directory, dpi and verbosity.
pub fn parse_cli() -> (PathBuf, PathBuf, u32, bool) {
    parse_cli_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

pub fn parse_cli_from<I, T>(args: I) -> Result<(PathBuf, PathBuf, u32, bool), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli_args = cli_app().get_matches_from_safe(args)?;
    let csvin = PathBuf::from(cli_args.value_of_os("input_csvfile").unwrap_or_default());
    let outdir = PathBuf::from(cli_args.value_of_os("output_dir").unwrap_or_default());
    let dpi = value_t!(cli_args, "dpi", u32).unwrap_or(DEFAULT_DPI);
    let verbose = cli_args.is_present("verbose");
    Ok((csvin, outdir, dpi, verbose))
}

/// Loads the csv and writes one chart per metric into outdir.
/// The load checks all the columns first,
/// so a bad input never leaves a chart behind.
pub fn run(csvin: &Path, outdir: &Path, dpi: u32) -> anyhow::Result<Vec<PathBuf>> {
    let pt = PortThroughput::from_csv(csvin)
        .with_context(|| format!("loading {} failed", csvin.display()))?;
    debug!("loaded dataset:\n{}", pt);
    let written = pt
        .plot_all(&chart_table(dpi), outdir)
        .context("rendering the charts failed")?;
    Ok(written)
}
