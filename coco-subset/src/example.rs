//! Per-image example assembly.

use crate::{
    common::*,
    error::ConvertError,
    store::{AnnotationEntry, AnnotationStore, CategoryId, ImageId, ImageMeta},
};

/// The format tag stored with every encoded image.
pub const IMAGE_FORMAT: &str = "jpeg";

/// One training record for a single image.
///
/// The coordinate sequences and `labels` are index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionExample {
    pub height: u64,
    pub width: u64,
    pub encoded: Vec<u8>,
    pub format: &'static str,
    pub xmin: Vec<f32>,
    pub xmax: Vec<f32>,
    pub ymin: Vec<f32>,
    pub ymax: Vec<f32>,
    pub labels: Vec<i64>,
}

impl DetectionExample {
    pub fn from_labels(
        height: u64,
        width: u64,
        encoded: Vec<u8>,
        labels: Vec<Label<TLBR<f32>, CategoryId>>,
    ) -> Self {
        let num_objects = labels.len();
        let mut example = Self {
            height,
            width,
            encoded,
            format: IMAGE_FORMAT,
            xmin: Vec::with_capacity(num_objects),
            xmax: Vec::with_capacity(num_objects),
            ymin: Vec::with_capacity(num_objects),
            ymax: Vec::with_capacity(num_objects),
            labels: Vec::with_capacity(num_objects),
        };

        for Label { rect, class } in labels {
            let [t, l, b, r] = rect.tlbr();
            example.xmin.push(l);
            example.xmax.push(r);
            example.ymin.push(t);
            example.ymax.push(b);
            example.labels.push(class as i64);
        }

        example
    }

    pub fn num_objects(&self) -> usize {
        self.labels.len()
    }

    /// Convert to a `tf.train.Example` in the object detection layout.
    pub fn into_tf_example(self) -> Example {
        let Self {
            height,
            width,
            encoded,
            format,
            xmin,
            xmax,
            ymin,
            ymax,
            labels,
        } = self;

        vec![
            ("image/height", Feature::from_i64_iter([height as i64])),
            ("image/width", Feature::from_i64_iter([width as i64])),
            ("image/object/bbox/xmin", Feature::from_f32_iter(xmin)),
            ("image/object/bbox/xmax", Feature::from_f32_iter(xmax)),
            ("image/object/bbox/ymin", Feature::from_f32_iter(ymin)),
            ("image/object/bbox/ymax", Feature::from_f32_iter(ymax)),
            ("image/object/class/label", Feature::from_i64_iter(labels)),
            ("image/encoded", Feature::from_bytes_iter([encoded])),
            (
                "image/format",
                Feature::from_bytes_iter([format.as_bytes().to_vec()]),
            ),
        ]
        .into_iter()
        .map(|(key, feature)| (key.to_owned(), feature))
        .collect::<Example>()
    }
}

/// Normalize an [x, y, w, h] pixel box against the image size.
///
/// `xmin = x / W` and `xmax = xmin + w / W`, likewise for the vertical axis.
/// An image with zero height or width is a fatal data error.
pub fn normalize_bbox(
    image: &ImageMeta,
    annotation: &AnnotationEntry,
) -> Result<TLBR<f64>, ConvertError> {
    let ImageMeta {
        id: image_id,
        height,
        width,
        ..
    } = *image;
    let AnnotationEntry {
        id: annotation_id,
        bbox,
        ..
    } = *annotation;

    if height == 0 || width == 0 {
        return Err(ConvertError::DegenerateImage {
            image_id,
            height,
            width,
        });
    }

    let [x, y, w, h] = bbox;
    if !(w >= 0.0 && h >= 0.0) {
        return Err(ConvertError::MalformedBox {
            annotation_id,
            bbox,
        });
    }

    let rect = HW::try_from_hw([height as f64, width as f64])
        .and_then(|size| size.try_normalize_tlhw([y, x, h, w]))
        .map_err(|_| ConvertError::NonFiniteBox {
            annotation_id,
            bbox,
        })?;

    if rect.tlbr().into_iter().any(|side| R64::try_new(side).is_none()) {
        return Err(ConvertError::NonFiniteBox {
            annotation_id,
            bbox,
        });
    }
    if !rect.is_unit_bounded() {
        debug!(
            "box {:?} of annotation {} exceeds the bounds of image {}",
            bbox, annotation_id, image_id
        );
    }

    Ok(rect)
}

/// Builds examples for selected images.
#[derive(Debug)]
pub struct ExampleBuilder<'a, S>
where
    S: ?Sized,
{
    store: &'a S,
    image_dir: &'a Path,
    category_ids: &'a IndexSet<CategoryId>,
}

impl<'a, S> ExampleBuilder<'a, S>
where
    S: AnnotationStore + ?Sized,
{
    pub fn new(store: &'a S, image_dir: &'a Path, category_ids: &'a IndexSet<CategoryId>) -> Self {
        Self {
            store,
            image_dir,
            category_ids,
        }
    }

    pub fn build(&self, image_id: ImageId) -> Result<DetectionExample> {
        let image = self.store.image_metadata(image_id)?;

        let labels: Vec<_> = self
            .store
            .list_annotations(image_id, self.category_ids)
            .into_iter()
            .filter(|ann| {
                let allowed = self.category_ids.contains(&ann.category_id);
                if !allowed {
                    trace!(
                        "skip annotation {} with category {} on image {}",
                        ann.id,
                        ann.category_id,
                        image_id
                    );
                }
                allowed
            })
            .map(|ann| -> Result<_, ConvertError> {
                let rect = normalize_bbox(&image, &ann)?;
                let label = Label {
                    rect,
                    class: ann.category_id,
                };
                label.try_cast::<f32>().ok_or(ConvertError::NonFiniteBox {
                    annotation_id: ann.id,
                    bbox: ann.bbox,
                })
            })
            .collect::<Result<_, _>>()?;

        let path = self.image_dir.join(&image.file_name);
        let encoded = fs::read(&path).map_err(|source| ConvertError::ImageRead {
            path: path.clone(),
            source,
        })?;

        Ok(DetectionExample::from_labels(
            image.height,
            image.width,
            encoded,
            labels,
        ))
    }

    /// Lazily build examples in the order of the given image ids.
    pub fn examples(
        self,
        image_ids: &'a IndexSet<ImageId>,
    ) -> impl Iterator<Item = Result<DetectionExample>> + 'a
    where
        S: 'a,
    {
        image_ids.iter().map(move |&image_id| self.build(image_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Annotation, Category, CocoDataset, CocoStore, Image};
    use approx::assert_abs_diff_eq;
    use tfrecord::FeatureKind;

    /// A store that hands out every annotation regardless of category.
    struct UnfilteredStore {
        annotations: Vec<AnnotationEntry>,
    }

    impl AnnotationStore for UnfilteredStore {
        fn resolve_category_ids(&self, _super_categories: &[String]) -> Vec<CategoryId> {
            vec![]
        }

        fn list_image_ids(&self, _category_id: CategoryId) -> Vec<ImageId> {
            vec![]
        }

        fn image_metadata(&self, image_id: ImageId) -> Result<ImageMeta> {
            Ok(ImageMeta {
                id: image_id,
                height: 480,
                width: 640,
                file_name: format!("{}.jpg", image_id),
            })
        }

        fn list_annotations(
            &self,
            _image_id: ImageId,
            _category_ids: &IndexSet<CategoryId>,
        ) -> Vec<AnnotationEntry> {
            self.annotations.clone()
        }
    }

    fn feature_kinds(example: Example) -> HashMap<String, FeatureKind> {
        example
            .into_hash_map()
            .into_iter()
            .filter_map(|(key, feature)| Some((key, feature.into_kinds()?)))
            .collect()
    }

    fn meta(height: u64, width: u64) -> ImageMeta {
        ImageMeta {
            id: 1,
            height,
            width,
            file_name: "1.jpg".into(),
        }
    }

    fn entry(bbox: [f64; 4]) -> AnnotationEntry {
        AnnotationEntry {
            id: 9,
            category_id: 3,
            bbox,
        }
    }

    #[test]
    fn normalize_scenario() -> Result<()> {
        let rect = normalize_bbox(&meta(480, 640), &entry([64.0, 48.0, 128.0, 96.0]))?;
        let [ymin, xmin, ymax, xmax] = rect.tlbr();
        assert_abs_diff_eq!(xmin, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(ymin, 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(xmax, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(ymax, 0.3, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn normalize_follows_additive_formula() -> Result<()> {
        let sizes = [(480u64, 640u64), (333, 500), (1, 1), (427, 640)];
        let boxes = [
            [0.0, 0.0, 0.0, 0.0],
            [10.5, 20.25, 100.0, 50.0],
            [0.0, 0.0, 1.0, 1.0],
            [123.4, 56.7, 89.0, 12.3],
        ];

        for &(h, w) in &sizes {
            for bbox in boxes {
                let [x, y, bw, bh] = bbox;
                if x + bw > w as f64 || y + bh > h as f64 {
                    continue;
                }
                let rect = normalize_bbox(&meta(h, w), &entry(bbox))?;
                let [t, l, b, r] = rect.tlbr();
                let (wf, hf) = (w as f64, h as f64);
                assert_eq!(l, x / wf);
                assert_eq!(t, y / hf);
                assert_eq!(r, x / wf + bw / wf);
                assert_eq!(b, y / hf + bh / hf);
                assert!(0.0 <= l && l <= r);
                assert!(0.0 <= t && t <= b);
            }
        }
        Ok(())
    }

    #[test]
    fn zero_width_is_a_data_error() {
        let err = normalize_bbox(&meta(480, 0), &entry([1.0, 1.0, 1.0, 1.0])).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::DegenerateImage {
                image_id: 1,
                height: 480,
                width: 0
            }
        ));
        assert_eq!(err.kind(), crate::error::ErrorKind::Data);
    }

    #[test]
    fn negative_extent_is_a_data_error() {
        let err = normalize_bbox(&meta(10, 10), &entry([1.0, 1.0, -1.0, 1.0])).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedBox { .. }));

        let err = normalize_bbox(&meta(10, 10), &entry([1.0, 1.0, f64::NAN, 1.0])).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedBox { .. }));
    }

    #[test]
    fn non_finite_origin_is_a_data_error() {
        let err =
            normalize_bbox(&meta(10, 10), &entry([f64::INFINITY, 1.0, 1.0, 1.0])).unwrap_err();
        assert!(matches!(err, ConvertError::NonFiniteBox { .. }));
    }

    #[test]
    fn tf_example_features() {
        let labels = vec![
            Label {
                rect: TLBR::try_from_tlbr([0.1f32, 0.2, 0.3, 0.4]).unwrap(),
                class: 3,
            },
            Label {
                rect: TLBR::try_from_tlbr([0.5f32, 0.5, 1.0, 0.75]).unwrap(),
                class: 8,
            },
        ];
        let example = DetectionExample::from_labels(480, 640, vec![0xff, 0xd8], labels);
        assert_eq!(example.num_objects(), 2);
        assert_eq!(example.xmin, vec![0.2, 0.5]);
        assert_eq!(example.xmax, vec![0.4, 0.75]);
        assert_eq!(example.ymin, vec![0.1, 0.5]);
        assert_eq!(example.ymax, vec![0.3, 1.0]);

        let features = feature_kinds(example.into_tf_example());
        assert_eq!(features.len(), 9);
        match &features["image/format"] {
            FeatureKind::Bytes(list) => assert_eq!(list, &vec![b"jpeg".to_vec()]),
            _ => panic!("image/format must be a bytes list"),
        }
        match &features["image/encoded"] {
            FeatureKind::Bytes(list) => assert_eq!(list, &vec![vec![0xff, 0xd8]]),
            _ => panic!("image/encoded must be a bytes list"),
        }
        match &features["image/height"] {
            FeatureKind::I64(list) => assert_eq!(list, &vec![480]),
            _ => panic!("image/height must be an int64 list"),
        }
        match &features["image/width"] {
            FeatureKind::I64(list) => assert_eq!(list, &vec![640]),
            _ => panic!("image/width must be an int64 list"),
        }
        match &features["image/object/class/label"] {
            FeatureKind::I64(list) => assert_eq!(list, &vec![3, 8]),
            _ => panic!("labels must be an int64 list"),
        }

        let expected = [
            ("image/object/bbox/xmin", vec![0.2f32, 0.5]),
            ("image/object/bbox/xmax", vec![0.4, 0.75]),
            ("image/object/bbox/ymin", vec![0.1, 0.5]),
            ("image/object/bbox/ymax", vec![0.3, 1.0]),
        ];
        for (key, values) in expected {
            match &features[key] {
                FeatureKind::F32(list) => assert_eq!(list, &values, "{}", key),
                _ => panic!("{} must be a float list", key),
            }
        }
    }

    #[test]
    fn build_drops_annotations_of_other_categories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("1.jpg"), b"jpeg")?;

        let store = UnfilteredStore {
            annotations: vec![
                AnnotationEntry {
                    id: 1,
                    category_id: 99,
                    bbox: [0.0, 0.0, 320.0, 240.0],
                },
                AnnotationEntry {
                    id: 2,
                    category_id: 3,
                    bbox: [64.0, 48.0, 128.0, 96.0],
                },
                AnnotationEntry {
                    id: 3,
                    category_id: 99,
                    bbox: [10.0, 10.0, 10.0, 10.0],
                },
            ],
        };
        let category_ids: IndexSet<_> = [3].into_iter().collect();
        let example = ExampleBuilder::new(&store, dir.path(), &category_ids).build(1)?;

        assert_eq!(example.labels, vec![3]);
        assert_eq!(example.num_objects(), 1);
        assert_eq!(example.xmin.len(), 1);
        assert_eq!(example.ymax.len(), 1);
        assert_abs_diff_eq!(example.xmin[0], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(example.ymin[0], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(example.xmax[0], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(example.ymax[0], 0.3, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn build_reads_image_and_filters_categories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.jpg"), b"not really a jpeg")?;

        let dataset = CocoDataset {
            categories: vec![
                Category {
                    id: 3,
                    name: "car".into(),
                    supercategory: "vehicle".into(),
                },
                Category {
                    id: 18,
                    name: "dog".into(),
                    supercategory: "animal".into(),
                },
            ],
            images: vec![Image {
                id: 1,
                height: 480,
                width: 640,
                file_name: "a.jpg".into(),
            }],
            annotations: vec![
                Annotation {
                    id: 1,
                    image_id: 1,
                    category_id: 3,
                    bbox: [64.0, 48.0, 128.0, 96.0],
                },
                Annotation {
                    id: 2,
                    image_id: 1,
                    category_id: 18,
                    bbox: [0.0, 0.0, 10.0, 10.0],
                },
            ],
        };
        let store = CocoStore::from_dataset(dataset)?;
        let category_ids: IndexSet<_> = [3].into_iter().collect();
        let builder = ExampleBuilder::new(&store, dir.path(), &category_ids);

        let example = builder.build(1)?;
        assert_eq!(example.encoded, b"not really a jpeg".to_vec());
        assert_eq!((example.height, example.width), (480, 640));
        assert_eq!(example.labels, vec![3]);
        assert_abs_diff_eq!(example.xmax[0], 0.3, epsilon = 1e-6);

        fs::remove_file(dir.path().join("a.jpg"))?;
        let err = builder.build(1).unwrap_err();
        assert!(matches!(
            ConvertError::find(&err),
            Some(ConvertError::ImageRead { .. })
        ));
        Ok(())
    }
}
