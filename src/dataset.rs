use crate::enums::InterpolationType;
use crate::geometry::SharedGeometry;

use std::fmt;

/// Handle of a dataset held by the data store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId(pub u64);

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    Image,
    PointSet,
    Surface,
    Other,
}

/// Optional boolean properties of a dataset. A property that was never set
/// reads as its default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Properties {
    /// Global visibility. Unset means the visibility of the dataset is not tracked.
    pub visible: Option<bool>,
    pub helper_object: Option<bool>,
    /// Marks a binary (segmentation) image. Unset reads as grey-scale.
    pub binary: Option<bool>,
    /// `Some(false)` opts the dataset out of per-viewer visibility management,
    /// e.g. the crosshair planes of the render windows.
    pub managed_visibility: Option<bool>,
    /// Present only on images that can be resliced.
    pub reslice_interpolation: Option<InterpolationType>,
}

#[derive(Clone, Debug)]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
    /// `None` when the dataset carries no data at all.
    pub kind: Option<DataKind>,
    pub geometry: Option<SharedGeometry>,
    pub properties: Properties,
}

impl Dataset {
    pub fn new(name: impl Into<String>, kind: Option<DataKind>) -> Self {
        Self {
            id: DatasetId(0),
            name: name.into(),
            kind,
            geometry: None,
            properties: Properties::default(),
        }
    }

    /// A grey-scale image, visible and resliceable.
    pub fn image(name: impl Into<String>, geometry: SharedGeometry) -> Self {
        let mut dataset = Self::new(name, Some(DataKind::Image)).with_geometry(geometry);
        dataset.properties.visible = Some(true);
        dataset.properties.reslice_interpolation = Some(InterpolationType::default());
        dataset
    }

    /// A binary segmentation image.
    pub fn binary_image(name: impl Into<String>, geometry: SharedGeometry) -> Self {
        let mut dataset = Self::image(name, geometry);
        dataset.properties.binary = Some(true);
        dataset
    }

    pub fn point_set(name: impl Into<String>) -> Self {
        Self::new(name, Some(DataKind::PointSet)).with_visible(true)
    }

    pub fn surface(name: impl Into<String>, geometry: SharedGeometry) -> Self {
        Self::new(name, Some(DataKind::Surface))
            .with_geometry(geometry)
            .with_visible(true)
    }

    pub fn with_geometry(mut self, geometry: SharedGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.properties.visible = Some(visible);
        self
    }

    pub fn as_helper(mut self) -> Self {
        self.properties.helper_object = Some(true);
        self
    }

    pub fn unmanaged(mut self) -> Self {
        self.properties.managed_visibility = Some(false);
        self
    }

    pub fn is_image(&self) -> bool {
        self.kind == Some(DataKind::Image)
    }

    pub fn is_grey_scale_image(&self) -> bool {
        self.is_image() && !self.properties.binary.unwrap_or(false)
    }

    pub fn is_binary_image(&self) -> bool {
        self.is_image() && self.properties.binary.unwrap_or(false)
    }

    pub fn is_helper(&self) -> bool {
        self.properties.helper_object.unwrap_or(false)
    }

    pub fn has_visibility_property(&self) -> bool {
        self.properties.visible.is_some()
    }

    /// Global visibility; datasets without the property count as visible.
    pub fn is_visible(&self) -> bool {
        self.properties.visible.unwrap_or(true)
    }

    pub fn is_visibility_managed(&self) -> bool {
        self.properties.managed_visibility.unwrap_or(true)
    }
}
