//! Conversion program configuration format.

use crate::{common::*, error::ConvertError};

/// The main conversion configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the raw COCO dataset.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// The directory where shard files are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Super-category names to be included.
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// The maximum number of images taken from each category.
    #[serde(default = "default_max_per_category")]
    pub max_per_category: usize,
    /// Log progress once per this many images.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: NonZeroUsize,
    #[serde(default = "PartitionConfig::train")]
    pub train: PartitionConfig,
    #[serde(default = "PartitionConfig::validation")]
    pub validation: PartitionConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        let invalid = |reason: &str| ConvertError::InvalidConfig {
            reason: reason.to_owned(),
        };

        if self.categories.is_empty() {
            return Err(invalid("at least one super-category must be given"));
        }
        if self.categories.iter().any(|name| name.trim().is_empty()) {
            return Err(invalid("super-category names must not be empty"));
        }
        if self.train.output_name == self.validation.output_name {
            return Err(invalid(
                "train and validation partitions must have distinct output names",
            ));
        }

        Ok(())
    }

    /// The partitions in processing order.
    pub fn partitions(&self) -> [(Partition, &PartitionConfig); 2] {
        [
            (Partition::Train, &self.train),
            (Partition::Validation, &self.validation),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            categories: default_categories(),
            max_per_category: default_max_per_category(),
            progress_interval: default_progress_interval(),
            train: PartitionConfig::train(),
            validation: PartitionConfig::validation(),
        }
    }
}

/// The logical dataset partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Train,
    Validation,
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Per-partition input and output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Image directory relative to the data directory.
    pub image_dir: PathBuf,
    /// Annotation file relative to the data directory.
    pub annotation_file: PathBuf,
    /// Base file name of the shards in the output directory.
    pub output_name: String,
    pub num_shards: NonZeroUsize,
}

impl PartitionConfig {
    pub fn train() -> Self {
        Self {
            image_dir: "train2017".into(),
            annotation_file: ["annotations", "instances_train2017.json"].iter().collect(),
            output_name: "coco_train.record".into(),
            num_shards: NonZeroUsize::new(100).unwrap(),
        }
    }

    pub fn validation() -> Self {
        Self {
            image_dir: "val2017".into(),
            annotation_file: ["annotations", "instances_val2017.json"].iter().collect(),
            output_name: "coco_val.record".into(),
            num_shards: NonZeroUsize::new(50).unwrap(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    ["learn", "coco"].iter().collect()
}

fn default_output_dir() -> PathBuf {
    ["learn", "coco", "subset"].iter().collect()
}

fn default_categories() -> Vec<String> {
    vec!["person".into(), "vehicle".into(), "outdoor".into()]
}

fn default_max_per_category() -> usize {
    5000
}

fn default_progress_interval() -> NonZeroUsize {
    NonZeroUsize::new(100).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() -> Result<()> {
        let config: Config = json5::from_str(
            r#"{
                data_dir: "/data/coco",
                categories: ["animal"],
                // smaller validation run
                validation: {
                    image_dir: "val2017",
                    annotation_file: "annotations/instances_val2017.json",
                    output_name: "coco_val.record",
                    num_shards: 10,
                },
            }"#,
        )?;

        assert_eq!(config.data_dir, Path::new("/data/coco"));
        assert_eq!(config.output_dir, default_output_dir());
        assert_eq!(config.categories, vec!["animal".to_string()]);
        assert_eq!(config.max_per_category, 5000);
        assert_eq!(config.train, PartitionConfig::train());
        assert_eq!(config.validation.num_shards.get(), 10);
        config.validate()?;
        Ok(())
    }

    #[test]
    fn zero_shards_are_rejected() {
        let result: Result<Config, _> = json5::from_str(
            r#"{
                train: {
                    image_dir: "train2017",
                    annotation_file: "annotations/instances_train2017.json",
                    output_name: "coco_train.record",
                    num_shards: 0,
                },
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_empty_categories() {
        let config = Config {
            categories: vec![],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConvertError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn validate_rejects_shared_output_name() {
        let mut config = Config::default();
        config.validation.output_name = config.train.output_name.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partitions_run_train_first() {
        let config = Config::default();
        let order: Vec<_> = config
            .partitions()
            .iter()
            .map(|(partition, conf)| (*partition, conf.num_shards.get()))
            .collect();
        assert_eq!(order, vec![(Partition::Train, 100), (Partition::Validation, 50)]);
    }
}
