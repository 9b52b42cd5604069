use crate::enums::Orientation;

use ndarray::{Array2, ArrayView1};
use std::sync::Arc;
use thiserror::Error;

/// World-space point in millimetres, `[x, y, z]`.
pub type Point3 = [f64; 3];

/// Geometry handed to several bound viewers at once. Viewers only ever swap the
/// reference; the geometry itself is never mutated after construction.
pub type SharedGeometry = Arc<Geometry>;

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("Geometry must have at least one voxel along each axis, got {0:?}")]
    EmptyGrid((usize, usize, usize)),

    #[error("Direction matrix must be 3x3, got {0}x{1}")]
    DirectionShape(usize, usize),

    #[error("Spacing must be positive, got {0:?}")]
    InvalidSpacing((f64, f64, f64)),
}

/// Spatial extent of a dataset: a voxel grid placed in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Voxel counts (depth, height, width), i.e. along (z, y, x).
    dim: (usize, usize, usize),
    /// Voxel size in mm along (x, y, z).
    spacing: (f64, f64, f64),
    origin: Point3,
    /// Direction cosines. Column `i` is the world direction of image axis `i`.
    direction: Array2<f64>,
    time_steps: usize,
}

/// World axis an image axis mostly runs along.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AnatomicalAxis {
    LeftRight,
    AnteriorPosterior,
    SuperiorInferior,
}

impl Geometry {
    pub fn new(
        dim: (usize, usize, usize),
        spacing: (f64, f64, f64),
    ) -> Result<Self, GeometryError> {
        if dim.0 == 0 || dim.1 == 0 || dim.2 == 0 {
            return Err(GeometryError::EmptyGrid(dim));
        }
        if spacing.0 <= 0.0 || spacing.1 <= 0.0 || spacing.2 <= 0.0 {
            return Err(GeometryError::InvalidSpacing(spacing));
        }
        Ok(Self {
            dim,
            spacing,
            origin: [0.0; 3],
            direction: Array2::eye(3),
            time_steps: 1,
        })
    }

    pub fn with_origin(mut self, origin: Point3) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_direction(mut self, direction: Array2<f64>) -> Result<Self, GeometryError> {
        let (rows, cols) = direction.dim();
        if rows != 3 || cols != 3 {
            return Err(GeometryError::DirectionShape(rows, cols));
        }
        self.direction = direction;
        Ok(self)
    }

    pub fn with_time_steps(mut self, time_steps: usize) -> Self {
        self.time_steps = time_steps.max(1);
        self
    }

    pub fn into_shared(self) -> SharedGeometry {
        Arc::new(self)
    }

    /// Get the dimensions of the grid (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.dim
    }

    pub fn spacing(&self) -> (f64, f64, f64) {
        self.spacing
    }

    pub fn origin(&self) -> Point3 {
        self.origin
    }

    pub fn direction(&self) -> &Array2<f64> {
        &self.direction
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn max_time_step(&self) -> usize {
        self.time_steps - 1
    }

    /// Number of slices when slicing along the given orientation.
    pub fn slice_count(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Axial => self.dim.0,
            Orientation::Coronal => self.dim.1,
            Orientation::Sagittal => self.dim.2,
        }
    }

    pub fn max_slice(&self, orientation: Orientation) -> usize {
        self.slice_count(orientation) - 1
    }

    pub fn is_valid_index(&self, index: usize, orientation: Orientation) -> bool {
        index < self.slice_count(orientation)
    }

    /// World axis (0 = x, 1 = y, 2 = z) that slices of this orientation are stacked along.
    fn world_axis(orientation: Orientation) -> usize {
        match orientation {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }

    fn axis_spacing(&self, axis: usize) -> f64 {
        match axis {
            0 => self.spacing.0,
            1 => self.spacing.1,
            _ => self.spacing.2,
        }
    }

    /// Size of a 2D slice in mm as (width, height).
    pub fn slice_extent(&self, orientation: Orientation) -> (f64, f64) {
        let (depth, height, width) = self.dim;
        let (sx, sy, sz) = self.spacing;
        match orientation {
            // Looking down Z-axis: X is width, Y is height
            Orientation::Axial => (width as f64 * sx, height as f64 * sy),
            // Looking down Y-axis: X is width, Z is height
            Orientation::Coronal => (width as f64 * sx, depth as f64 * sz),
            // Looking down X-axis: Y is width, Z is height
            Orientation::Sagittal => (height as f64 * sy, depth as f64 * sz),
        }
    }

    /// World position of the centre of the voxel grid.
    pub fn centre(&self) -> Point3 {
        let mut centre = self.origin;
        for orientation in Orientation::ALL {
            let axis = Self::world_axis(orientation);
            centre[axis] += self.max_slice(orientation) as f64 * self.axis_spacing(axis) / 2.0;
        }
        centre
    }

    /// Index of the slice containing `position`, clamped to the grid.
    pub fn slice_at(&self, orientation: Orientation, position: &Point3) -> usize {
        let axis = Self::world_axis(orientation);
        let index = ((position[axis] - self.origin[axis]) / self.axis_spacing(axis)).round();
        if index <= 0.0 {
            0
        } else {
            (index as usize).min(self.max_slice(orientation))
        }
    }

    /// `position` moved onto the given slice, keeping the other two coordinates.
    pub fn position_on_slice(
        &self,
        orientation: Orientation,
        slice: usize,
        position: &Point3,
    ) -> Point3 {
        let axis = Self::world_axis(orientation);
        let slice = slice.min(self.max_slice(orientation));
        let mut moved = *position;
        moved[axis] = self.origin[axis] + slice as f64 * self.axis_spacing(axis);
        moved
    }

    fn dominant_axis(column: ArrayView1<'_, f64>) -> AnatomicalAxis {
        let magnitudes = [column[0].abs(), column[1].abs(), column[2].abs()];
        if magnitudes[0] >= magnitudes[1] && magnitudes[0] >= magnitudes[2] {
            AnatomicalAxis::LeftRight
        } else if magnitudes[1] >= magnitudes[2] {
            AnatomicalAxis::AnteriorPosterior
        } else {
            AnatomicalAxis::SuperiorInferior
        }
    }

    /// Orientation of the plane the image was acquired in, read off the direction
    /// of its first two axes.
    pub fn as_acquired_orientation(&self) -> Orientation {
        let first = Self::dominant_axis(self.direction.column(0));
        let second = Self::dominant_axis(self.direction.column(1));
        match (first, second) {
            (AnatomicalAxis::LeftRight, AnatomicalAxis::AnteriorPosterior) => Orientation::Axial,
            (AnatomicalAxis::LeftRight, _) => Orientation::Coronal,
            (AnatomicalAxis::AnteriorPosterior, AnatomicalAxis::LeftRight) => Orientation::Axial,
            (AnatomicalAxis::AnteriorPosterior, _) => Orientation::Sagittal,
            (AnatomicalAxis::SuperiorInferior, AnatomicalAxis::LeftRight) => Orientation::Coronal,
            (AnatomicalAxis::SuperiorInferior, _) => Orientation::Sagittal,
        }
    }
}
