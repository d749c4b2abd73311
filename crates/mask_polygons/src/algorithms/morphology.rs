use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{MaskError, Result},
    types::BinaryMask,
};

/// Largest kernel side accepted from configuration.
pub const MAX_KERNEL_SIDE: usize = 4096;

/// How a morphological kernel is requested in configuration.
///
/// `0`, `false` and an empty grid disable the step; a positive integer `n` asks for an
/// `n x n` all-ones kernel; a grid of 0/1 rows is used as the kernel itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum KernelSpec {
    Size(i64),
    Grid(Vec<Vec<u8>>),
    Flag(bool),
}

impl KernelSpec {
    /// `Ok(None)` means the step is skipped.
    pub fn resolve(&self) -> Result<Option<StructuringElement>> {
        match self {
            Self::Size(0) | Self::Flag(false) => Ok(None),
            Self::Size(n) if *n < 0 => Err(MaskError::config(format!(
                "kernel size must be positive, got {n}"
            ))),
            Self::Size(n) => {
                let size = u32::try_from(*n).map_err(|_| {
                    MaskError::config(format!("kernel size {n} exceeds {MAX_KERNEL_SIDE}"))
                })?;
                StructuringElement::square(size).map(Some)
            }
            Self::Grid(rows) if rows.is_empty() => Ok(None),
            Self::Grid(rows) => StructuringElement::from_rows(rows).map(Some),
            Self::Flag(true) => Err(MaskError::config(
                "a kernel must be a size or a 0/1 grid, not `true`",
            )),
        }
    }
}

impl From<u32> for KernelSpec {
    fn from(size: u32) -> Self {
        Self::Size(size as i64)
    }
}

/// Resolve an optional kernel request; absence skips the step.
pub fn resolve_kernel(spec: Option<&KernelSpec>) -> Result<Option<StructuringElement>> {
    spec.map_or(Ok(None), KernelSpec::resolve)
}

/// Binary morphological kernel anchored at `(width / 2, height / 2)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl StructuringElement {
    /// All-ones `size x size` kernel.
    pub fn square(size: u32) -> Result<Self> {
        if size == 0 {
            return Err(MaskError::config("kernel size must be positive"));
        }
        let side = size as usize;
        if side > MAX_KERNEL_SIDE {
            return Err(MaskError::config(format!(
                "kernel size {side} exceeds {MAX_KERNEL_SIDE}"
            )));
        }
        let cells = side
            .checked_mul(side)
            .ok_or_else(|| MaskError::config(format!("kernel size {side} is too large")))?;
        Ok(Self {
            width: side,
            height: side,
            cells: vec![true; cells],
        })
    }

    /// Kernel from explicit rows of 0/1 values.
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(MaskError::config("kernel grid is empty"));
        }
        if width > MAX_KERNEL_SIDE || height > MAX_KERNEL_SIDE {
            return Err(MaskError::config(format!(
                "kernel grid {width}x{height} exceeds {MAX_KERNEL_SIDE}"
            )));
        }

        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MaskError::config(format!(
                    "kernel row {y} has {} cells, expected {width}",
                    row.len()
                )));
            }
            for &value in row {
                match value {
                    0 => cells.push(false),
                    1 => cells.push(true),
                    other => {
                        return Err(MaskError::config(format!(
                            "kernel cells must be 0 or 1, got {other}"
                        )));
                    }
                }
            }
        }

        if !cells.iter().any(|&c| c) {
            return Err(MaskError::config("kernel has no set cells"));
        }

        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Offsets of the set cells relative to the anchor.
    fn offsets(&self) -> Vec<(i64, i64)> {
        let anchor_x = (self.width / 2) as i64;
        let anchor_y = (self.height / 2) as i64;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .map(|(i, _)| {
                let kx = (i % self.width) as i64;
                let ky = (i / self.width) as i64;
                (kx - anchor_x, ky - anchor_y)
            })
            .collect()
    }
}

/// Cells outside the grid count as background.
pub fn erode(mask: &BinaryMask, element: &StructuringElement) -> BinaryMask {
    let offsets = element.offsets();
    BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
        offsets
            .iter()
            .all(|&(dx, dy)| mask.get_or_background(x as i64 + dx, y as i64 + dy))
    })
}

/// Cells outside the grid count as background. Uses the reflected element.
pub fn dilate(mask: &BinaryMask, element: &StructuringElement) -> BinaryMask {
    let offsets = element.offsets();
    BinaryMask::from_fn(mask.width(), mask.height(), |x, y| {
        offsets
            .iter()
            .any(|&(dx, dy)| mask.get_or_background(x as i64 - dx, y as i64 - dy))
    })
}

/// Erosion then dilation: removes foreground specks narrower than the kernel.
pub fn opening(mask: &BinaryMask, element: &StructuringElement) -> BinaryMask {
    dilate(&erode(mask, element), element)
}

/// Dilation then erosion: fills background gaps narrower than the kernel.
pub fn closing(mask: &BinaryMask, element: &StructuringElement) -> BinaryMask {
    erode(&dilate(mask, element), element)
}

/// Opening followed by closing, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphologicalFilter {
    pub open: Option<StructuringElement>,
    pub close: Option<StructuringElement>,
}

impl MorphologicalFilter {
    pub fn new(open: Option<StructuringElement>, close: Option<StructuringElement>) -> Self {
        Self { open, close }
    }

    pub fn from_specs(open: Option<&KernelSpec>, close: Option<&KernelSpec>) -> Result<Self> {
        Ok(Self {
            open: resolve_kernel(open)?,
            close: resolve_kernel(close)?,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.open.is_none() && self.close.is_none()
    }

    pub fn apply(&self, mask: &BinaryMask) -> BinaryMask {
        let mut result = match &self.open {
            Some(element) => opening(mask, element),
            None => mask.clone(),
        };
        if let Some(element) = &self.close {
            result = closing(&result, element);
        }
        debug!(
            before = mask.foreground_count(),
            after = result.foreground_count(),
            "morphological filter applied"
        );
        result
    }
}
