use serde::{Deserialize, Serialize};

/// Slicing direction of a 2D render window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Axial,
    Sagittal,
    Coronal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Axial,
        Orientation::Sagittal,
        Orientation::Coronal,
    ];

    /// Position of the render window of this orientation within per-window arrays
    /// (cursor positions, scale factors).
    pub fn index(self) -> usize {
        match self {
            Orientation::Axial => 0,
            Orientation::Sagittal => 1,
            Orientation::Coronal => 2,
        }
    }
}

/// Arrangement of render windows inside one viewer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowLayout {
    Axial,
    Sagittal,
    Coronal,
    /// 2x2 grid of the three 2D windows and the 3D window.
    Ortho,
    #[serde(rename = "3d")]
    ThreeD,
    #[serde(rename = "3h")]
    ThreeHorizontal,
    #[serde(rename = "3v")]
    ThreeVertical,
    AsAcquired,
    #[default]
    Unknown,
    CorSagH,
    CorSagV,
    CorAxH,
    CorAxV,
    SagAxH,
    SagAxV,
}

impl WindowLayout {
    pub const ALL: [WindowLayout; 15] = [
        WindowLayout::Axial,
        WindowLayout::Sagittal,
        WindowLayout::Coronal,
        WindowLayout::Ortho,
        WindowLayout::ThreeD,
        WindowLayout::ThreeHorizontal,
        WindowLayout::ThreeVertical,
        WindowLayout::AsAcquired,
        WindowLayout::Unknown,
        WindowLayout::CorSagH,
        WindowLayout::CorSagV,
        WindowLayout::CorAxH,
        WindowLayout::CorAxV,
        WindowLayout::SagAxH,
        WindowLayout::SagAxV,
    ];

    /// True if the layout shows exactly one render window.
    pub fn is_single_window(self) -> bool {
        matches!(
            self,
            WindowLayout::Axial | WindowLayout::Sagittal | WindowLayout::Coronal | WindowLayout::ThreeD
        )
    }

    pub fn is_multi_window(self) -> bool {
        !self.is_single_window()
    }

    /// The orientation of a single 2D window layout.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            WindowLayout::Axial => Some(Orientation::Axial),
            WindowLayout::Sagittal => Some(Orientation::Sagittal),
            WindowLayout::Coronal => Some(Orientation::Coronal),
            _ => None,
        }
    }

    /// The 2D render windows shown by the layout.
    pub fn orientations(self) -> &'static [Orientation] {
        match self {
            WindowLayout::Axial => &[Orientation::Axial],
            WindowLayout::Sagittal => &[Orientation::Sagittal],
            WindowLayout::Coronal => &[Orientation::Coronal],
            WindowLayout::Ortho | WindowLayout::ThreeHorizontal | WindowLayout::ThreeVertical => {
                &Orientation::ALL
            }
            WindowLayout::CorSagH | WindowLayout::CorSagV => {
                &[Orientation::Coronal, Orientation::Sagittal]
            }
            WindowLayout::CorAxH | WindowLayout::CorAxV => {
                &[Orientation::Coronal, Orientation::Axial]
            }
            WindowLayout::SagAxH | WindowLayout::SagAxV => {
                &[Orientation::Sagittal, Orientation::Axial]
            }
            WindowLayout::ThreeD | WindowLayout::AsAcquired | WindowLayout::Unknown => &[],
        }
    }

    pub fn from_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Axial => WindowLayout::Axial,
            Orientation::Sagittal => WindowLayout::Sagittal,
            Orientation::Coronal => WindowLayout::Coronal,
        }
    }
}

/// How dropped datasets are spread over the viewer grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropType {
    /// Every dropped dataset goes into the viewer that was dropped on.
    #[default]
    Single,
    /// One dataset per viewer, round-robin from the viewer that was dropped on.
    Multiple,
    /// Every dataset in every viewer, each viewer at a different slice.
    All,
}

/// Whether a viewer uses the geometry shared with its siblings or its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GeometryBinding {
    #[default]
    Unbound,
    Bound,
}

impl From<bool> for GeometryBinding {
    fn from(is_bound: bool) -> Self {
        if is_bound {
            GeometryBinding::Bound
        } else {
            GeometryBinding::Unbound
        }
    }
}

/// Reslice interpolation applied to images as they are added.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationType {
    None,
    Linear,
    #[default]
    Cubic,
}
