use super::*;
use crate::error::ConvertError;

/// The subset of the COCO instances file used by the conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub height: u64,
    pub width: u64,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,
    /// The box in [x, y, w, h] order.
    pub bbox: [f64; 4],
}

/// The in-memory index over a COCO instances file.
#[derive(Debug, Clone)]
pub struct CocoStore {
    categories: IndexMap<CategoryId, Category>,
    images: HashMap<ImageId, Image>,
    annotations: Vec<Annotation>,
    image_to_annotations: HashMap<ImageId, Vec<usize>>,
    category_to_images: HashMap<CategoryId, IndexSet<ImageId>>,
}

impl CocoStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let _span = info_span!("load_annotations", path = %path.display()).entered();

        let text = fs::read_to_string(path).map_err(|source| ConvertError::AnnotationRead {
            path: path.to_owned(),
            source,
        })?;
        let dataset: CocoDataset =
            serde_json::from_str(&text).map_err(|source| ConvertError::AnnotationParse {
                path: path.to_owned(),
                source,
            })?;

        info!(
            "loaded {} categories, {} images and {} annotations",
            dataset.categories.len(),
            dataset.images.len(),
            dataset.annotations.len()
        );

        Ok(Self::from_dataset(dataset)?)
    }

    /// Build the index and check that every annotation refers to a defined
    /// image and category.
    pub fn from_dataset(dataset: CocoDataset) -> Result<Self, ConvertError> {
        let CocoDataset {
            categories: category_list,
            images: image_list,
            annotations,
        } = dataset;

        let mut categories = IndexMap::with_capacity(category_list.len());
        for category in category_list {
            let id = category.id;
            if categories.insert(id, category).is_some() {
                return Err(ConvertError::DuplicateId { kind: "category", id });
            }
        }

        let mut images = HashMap::with_capacity(image_list.len());
        for image in image_list {
            let id = image.id;
            if images.insert(id, image).is_some() {
                return Err(ConvertError::DuplicateId { kind: "image", id });
            }
        }

        let mut image_to_annotations: HashMap<_, Vec<_>> = HashMap::new();
        let mut category_to_images: HashMap<_, IndexSet<_>> = HashMap::new();

        for (index, ann) in annotations.iter().enumerate() {
            let Annotation {
                id,
                image_id,
                category_id,
                ..
            } = *ann;

            if !categories.contains_key(&category_id) {
                return Err(ConvertError::UnknownCategory {
                    annotation_id: id,
                    category_id,
                });
            }
            if !images.contains_key(&image_id) {
                return Err(ConvertError::UnknownImage { image_id });
            }

            image_to_annotations.entry(image_id).or_default().push(index);
            category_to_images
                .entry(category_id)
                .or_default()
                .insert(image_id);
        }

        Ok(Self {
            categories,
            images,
            annotations,
            image_to_annotations,
            category_to_images,
        })
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }
}

impl AnnotationStore for CocoStore {
    fn resolve_category_ids(&self, super_categories: &[String]) -> Vec<CategoryId> {
        let requested: HashSet<&str> = super_categories.iter().map(String::as_str).collect();
        let known: HashSet<&str> = self
            .categories
            .values()
            .map(|category| category.supercategory.as_str())
            .collect();

        requested
            .iter()
            .filter(|name| !known.contains(*name))
            .sorted()
            .for_each(|name| warn!("super-category '{}' matches no category", name));

        self.categories
            .values()
            .filter(|category| requested.contains(category.supercategory.as_str()))
            .map(|category| category.id)
            .collect()
    }

    fn list_image_ids(&self, category_id: CategoryId) -> Vec<ImageId> {
        self.category_to_images
            .get(&category_id)
            .map(|image_ids| image_ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn image_metadata(&self, image_id: ImageId) -> Result<ImageMeta> {
        let image = self
            .images
            .get(&image_id)
            .ok_or(ConvertError::UnknownImage { image_id })?;
        let Image {
            id,
            height,
            width,
            ref file_name,
        } = *image;

        Ok(ImageMeta {
            id,
            height,
            width,
            file_name: file_name.clone(),
        })
    }

    fn list_annotations(
        &self,
        image_id: ImageId,
        category_ids: &IndexSet<CategoryId>,
    ) -> Vec<AnnotationEntry> {
        let indexes = match self.image_to_annotations.get(&image_id) {
            Some(indexes) => indexes,
            None => return vec![],
        };

        indexes
            .iter()
            .map(|&index| &self.annotations[index])
            .filter(|ann| category_ids.contains(&ann.category_id))
            .map(|ann| AnnotationEntry {
                id: ann.id,
                category_id: ann.category_id,
                bbox: ann.bbox,
            })
            .collect()
    }
}
