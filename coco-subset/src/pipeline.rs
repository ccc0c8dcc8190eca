//! The conversion driver.

use crate::{
    common::*,
    config::{Config, Partition, PartitionConfig},
    error::ConvertError,
    example::ExampleBuilder,
    selector::select_subset,
    shard::{ShardSet, ShardStats},
    store::CocoStore,
    utils::Progress,
};

/// Summary of one converted partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionReport {
    pub partition: Partition,
    pub num_images: usize,
    pub num_objects: usize,
    pub shard_stats: ShardStats,
}

/// Convert the train and then the validation partition.
///
/// The first failure aborts the run.
pub fn start(config: &Config) -> Result<Vec<PartitionReport>> {
    config.validate()?;

    let Config {
        data_dir,
        output_dir,
        ..
    } = config;

    if !data_dir.is_dir() {
        return Err(ConvertError::MissingDataDir {
            path: data_dir.clone(),
        }
        .into());
    }

    fs::create_dir_all(output_dir).with_context(|| {
        format!(
            "failed to create output directory '{}'",
            output_dir.display()
        )
    })?;

    config
        .partitions()
        .into_iter()
        .map(|(partition, partition_config)| -> Result<_> {
            let _span = info_span!("convert", %partition).entered();
            info!(">>>> converting COCO {} dataset to TFRecord <<<<", partition);

            let report = convert_partition(config, partition, partition_config)
                .with_context(|| format!("failed to convert the {} partition", partition))?;

            info!(
                "wrote {} images with {} objects into {} shards ({} to {} records per shard)",
                report.num_images,
                report.num_objects,
                report.shard_stats.counts.len(),
                report.shard_stats.min(),
                report.shard_stats.max()
            );
            Ok(report)
        })
        .collect()
}

/// Select, build and write the examples of one partition.
pub fn convert_partition(
    config: &Config,
    partition: Partition,
    partition_config: &PartitionConfig,
) -> Result<PartitionReport> {
    let PartitionConfig {
        image_dir,
        annotation_file,
        output_name,
        num_shards,
    } = partition_config;

    let image_dir = config.data_dir.join(image_dir);
    let annotation_file = config.data_dir.join(annotation_file);

    // configuration errors surface before any shard is created
    if !image_dir.is_dir() {
        return Err(ConvertError::MissingImageDir { path: image_dir }.into());
    }
    let store = CocoStore::open(&annotation_file)?;

    let selection = select_subset(&store, &config.categories, config.max_per_category);
    let num_images = selection.len();

    let base_path = config.output_dir.join(output_name);
    let mut shards = ShardSet::create(&base_path, *num_shards)?;

    let mut progress = Progress::new("converting images", num_images, config.progress_interval);
    let mut num_objects = 0;

    let examples = ExampleBuilder::new(&store, &image_dir, &selection.category_ids)
        .examples(&selection.image_ids)
        .inspect(|result| {
            progress.tick();
            if let Ok(example) = result {
                num_objects += example.num_objects();
            }
        });
    let shard_stats = shards.write_all(examples)?;
    shards.close()?;

    debug!(
        "closed {} shards at '{}'",
        shard_stats.counts.len(),
        base_path.display()
    );

    Ok(PartitionReport {
        partition,
        num_images,
        num_objects,
        shard_stats,
    })
}
