use std::path::PathBuf;

use letools::filter::RuleSet;

/// Create a Last Epoch loot filter from scraped unique items.
#[derive(clap::Parser)]
struct Args {
    /// JSON file with the scraped unique items
    #[arg(short, long, default_value = "output/unique_items.json")]
    input: PathBuf,
    /// Where to save the XML filter
    #[arg(short, long, default_value = "output/unique_items.xml")]
    output: PathBuf,
}

/// Replaces the built-in rule set with a JSON file.
const RULES_ENV: &str = "LETOOLS_RULES";

fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();

    let rule_set = match std::env::var_os(RULES_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            tracing::info!(target: "filter", "using rule set from {}", path.display());
            RuleSet::load(&path)?
        }
        None => RuleSet::default(),
    };

    let items = letools::item::load_items(&args.input)?;
    tracing::info!(target: "filter", "creating filter with {} unique items ...", items.len());

    let rules = letools::filter::build_rules(&items, &rule_set);
    letools::filter::write_filter_file(&args.output, &rules)
}
