use anyhow::{Context, Result};
use coco_subset::{config::Config, error::ConvertError};
use std::{env, path::PathBuf};
use structopt::StructOpt;
use tracing::error;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Clone, StructOpt)]
/// Convert a COCO subset into sharded TFRecord files
struct Args {
    #[structopt(long)]
    /// configuration file, explicitly given options override its values
    pub config_file: Option<PathBuf>,
    #[structopt(long)]
    /// root directory of the raw COCO dataset [default: learn/coco]
    pub data_dir: Option<PathBuf>,
    #[structopt(long)]
    /// output directory of the shard files [default: learn/coco/subset]
    pub output_dir: Option<PathBuf>,
    #[structopt(long, use_delimiter = true)]
    /// comma-separated super-categories to be included [default: person,vehicle,outdoor].
    /// An empty list is rejected rather than selecting every category.
    pub sup_cats: Option<Vec<String>>,
    #[structopt(long)]
    /// maximum number of images per category [default: 5000]
    pub max_examples_per_cat: Option<usize>,
}

pub fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let config = load_config(Args::from_args())?;

    // start conversion
    if let Err(err) = coco_subset::start(&config) {
        if let Some(kind) = ConvertError::find(&err).map(|cause| cause.kind()) {
            error!("conversion aborted by {} error", kind);
        }
        return Err(err);
    }

    Ok(())
}

/// Load the config file if given and apply the explicitly given options.
fn load_config(args: Args) -> Result<Config> {
    let Args {
        config_file,
        data_dir,
        output_dir,
        sup_cats,
        max_examples_per_cat,
    } = args;

    let mut config = match &config_file {
        Some(path) => Config::open(path)
            .with_context(|| format!("failed to load config file '{}'", path.display()))?,
        None => Config::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    if let Some(output_dir) = output_dir {
        config.output_dir = output_dir;
    }
    if let Some(sup_cats) = sup_cats {
        config.categories = sup_cats;
    }
    if let Some(max) = max_examples_per_cat {
        config.max_per_category = max;
    }

    Ok(config)
}
