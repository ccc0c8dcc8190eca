//! Annotation metadata queries.

mod coco_;

pub use coco_::*;

use crate::common::*;

pub type CategoryId = u64;
pub type ImageId = u64;
pub type AnnotationId = u64;

/// Image entry without pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageMeta {
    pub id: ImageId,
    pub height: u64,
    pub width: u64,
    pub file_name: String,
}

/// An object annotation in absolute pixel units.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    pub id: AnnotationId,
    pub category_id: CategoryId,
    /// The box in [x, y, w, h] order.
    pub bbox: [f64; 4],
}

/// The queries the conversion runs against an annotation source.
pub trait AnnotationStore {
    /// Ids of the categories belonging to any of the super-categories, in
    /// dataset order.
    fn resolve_category_ids(&self, super_categories: &[String]) -> Vec<CategoryId>;

    /// Ids of the images having at least one annotation of the category.
    fn list_image_ids(&self, category_id: CategoryId) -> Vec<ImageId>;

    fn image_metadata(&self, image_id: ImageId) -> Result<ImageMeta>;

    /// Annotations on the image restricted to the categories.
    fn list_annotations(
        &self,
        image_id: ImageId,
        category_ids: &IndexSet<CategoryId>,
    ) -> Vec<AnnotationEntry>;
}
