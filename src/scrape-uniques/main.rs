use core::time::Duration;
use std::path::PathBuf;

use letools::{
    item::{save_csv, save_json},
    scrape::{CATALOG_URL, NAMES_URL, Session, SessionConfig},
};

#[derive(Clone, Copy, clap::ValueEnum)]
enum Mode {
    /// Read the in-page item database
    Data,
    /// Walk the paginated catalog table
    Table,
}

/// Scrape unique items from lastepochtools.com.
#[derive(clap::Parser)]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Data, env = "LETOOLS_MODE")]
    mode: Mode,
    /// Catalog page
    #[arg(long, default_value = CATALOG_URL, env = "LETOOLS_URL")]
    url: String,
    /// Localization data with the display names
    #[arg(long, default_value = NAMES_URL, env = "LETOOLS_NAMES_URL")]
    names_url: String,
    #[arg(short, long, default_value = "output", env = "LETOOLS_OUTPUT_DIR")]
    output_dir: PathBuf,
    #[arg(long, env = "LETOOLS_HEADLESS")]
    headless: bool,
    /// Keep hardware acceleration enabled
    #[arg(long, env = "LETOOLS_GPU")]
    gpu: bool,
    /// Seconds to wait for a page element before giving up
    #[arg(long, default_value_t = 10, env = "LETOOLS_TIMEOUT")]
    timeout: u64,
}

fn collect(args: Args) -> anyhow::Result<usize> {
    let config = SessionConfig {
        headless: args.headless,
        gpu: args.gpu,
        timeout: Duration::from_secs(args.timeout),
        ..SessionConfig::default()
    };
    let session = Session::launch(config)?;

    let json = args.output_dir.join("unique_items.json");
    let csv = args.output_dir.join("unique_items.csv");

    match args.mode {
        Mode::Data => {
            let items = session.scrape_items_data(&args.url, &args.names_url)?;
            drop(session);
            save_csv(&csv, &items)?;
            save_json(&json, &items)?;
            Ok(items.len())
        }
        Mode::Table => {
            let rows = session.scrape_items_table(&args.url)?;
            drop(session);
            save_csv(&csv, &rows)?;
            save_json(&json, &rows)?;
            Ok(rows.len())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();

    tracing::info!(target: "main", "starting scraper ...");
    let total = tokio::task::spawn_blocking(move || collect(args)).await??;
    tracing::info!(target: "main", "scraping complete. total items collected: {total}");

    Ok(())
}
