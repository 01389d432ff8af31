//! Cell geometry for inline images

use tracing::debug;

/// Height-to-width ratio of a terminal character cell.
///
/// Cells are roughly twice as tall as they are wide, so an image needs
/// about 2.2 columns per row to keep its proportions.
pub const CELL_ASPECT_RATIO: f64 = 2.2;

/// Destination size of an image, in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellGeometry {
    pub rows: u32,
    pub cols: u32,
}

impl CellGeometry {
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// Fit an image of `pixel_width` x `pixel_height` into the cell budget.
///
/// Starts from all `available_rows`; when the resulting column count would
/// exceed `max_cols`, columns are clamped and rows recomputed so the aspect
/// ratio holds. Rows only ever shrink. Degenerate images fit into nothing.
pub fn fit(pixel_width: u32, pixel_height: u32, available_rows: u32, max_cols: u32) -> CellGeometry {
    if pixel_width == 0 || pixel_height == 0 {
        return CellGeometry::default();
    }

    let aspect = CELL_ASPECT_RATIO * f64::from(pixel_width) / f64::from(pixel_height);

    let mut rows = f64::from(available_rows);
    let mut cols = rows * aspect;

    if cols > f64::from(max_cols) {
        cols = f64::from(max_cols);
        rows = cols / aspect;
    }

    // Truncation keeps both values within their budgets.
    let geometry = CellGeometry {
        rows: rows as u32,
        cols: cols as u32,
    };
    debug!(
        "Fitted {}x{} px into {} rows x {} cols (budget {} x {})",
        pixel_width, pixel_height, geometry.rows, geometry.cols, available_rows, max_cols
    );
    geometry
}
