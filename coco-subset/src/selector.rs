//! Category-based image selection.

use crate::{
    common::*,
    store::{AnnotationStore, CategoryId, ImageId},
};

/// The outcome of subset selection.
///
/// The order of `image_ids` is decided here once and is the order in which
/// examples are built and sharded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub category_ids: IndexSet<CategoryId>,
    pub image_ids: IndexSet<ImageId>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.image_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_ids.is_empty()
    }
}

/// Keep at most `cap` leading entries.
pub fn truncate_per_category<T>(mut ids: Vec<T>, cap: usize) -> Vec<T> {
    ids.truncate(cap);
    ids
}

/// Select the images of the categories under the given super-categories.
///
/// Each category contributes at most `max_per_category` images, taken in the
/// order the store lists them. The per-category lists are then merged with
/// duplicates removed, keeping the first occurrence.
pub fn select_subset<S>(
    store: &S,
    super_categories: &[String],
    max_per_category: usize,
) -> Selection
where
    S: AnnotationStore + ?Sized,
{
    let category_ids: IndexSet<_> = store
        .resolve_category_ids(super_categories)
        .into_iter()
        .collect();

    let mut num_candidates = 0;
    let image_ids: IndexSet<_> = category_ids
        .iter()
        .flat_map(|&category_id| {
            let image_ids = store.list_image_ids(category_id);
            let num_images = image_ids.len();
            let image_ids = truncate_per_category(image_ids, max_per_category);
            debug!(
                "category {} has {} images, {} taken",
                category_id,
                num_images,
                image_ids.len()
            );
            num_candidates += image_ids.len();
            image_ids
        })
        .collect();

    info!(
        "selected {} images from {} categories ({} before removing duplicates)",
        image_ids.len(),
        category_ids.len(),
        num_candidates
    );

    Selection {
        category_ids,
        image_ids,
    }
}
