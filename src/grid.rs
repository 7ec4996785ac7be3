//! Grid derivation and placement geometry.
//!
//! The same fractional rectangles computed here drive both the on-screen
//! grid and the raster exporter, so the two can never disagree about where
//! a cell sits on the page.

use crate::catalog::{CellSpan, LayoutTemplate, SlotImage};

/// Column count of the collage grid. Every layout template spans at most
/// this many columns; wider spans are clamped at placement time.
pub const GRID_COLUMNS: u32 = 2;

// ============================================================================
// Cell derivation
// ============================================================================

/// Derives the cell list actually used for rendering.
///
/// The template's cells are truncated when there are fewer images, or padded
/// with `CellSpan::DEFAULT` when there are more. The result is recomputed on
/// every structural change and never persisted.
pub fn derive_cells(layout: &LayoutTemplate, image_count: usize) -> Vec<CellSpan> {
    let mut cells: Vec<CellSpan> = layout.cells.iter().copied().take(image_count).collect();
    while cells.len() < image_count {
        cells.push(CellSpan::DEFAULT);
    }
    cells
}

// ============================================================================
// PlacedImage
// ============================================================================

/// One grid cell paired with the image occupying it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    /// The image in this cell.
    pub image: SlotImage,

    /// The cell's extent.
    pub span: CellSpan,
}

/// Zips a layout's derived cell list with an image list, positionally.
///
/// Pure; `render(layout, images).len() == images.len()` always holds.
pub fn render(layout: &LayoutTemplate, images: &[SlotImage]) -> Vec<PlacedImage> {
    derive_cells(layout, images.len())
        .into_iter()
        .zip(images.iter().cloned())
        .map(|(span, image)| PlacedImage { image, span })
        .collect()
}

// ============================================================================
// Placement solver
// ============================================================================

/// A cell's position on the page as fractions of the grid container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRect {
    /// Left edge, 0.0..1.0.
    pub x: f32,
    /// Top edge, 0.0..1.0.
    pub y: f32,
    /// Width fraction.
    pub w: f32,
    /// Height fraction.
    pub h: f32,
}

impl GridRect {
    /// Scales the fractional rect into pixel coordinates, edge-aligned so
    /// adjacent cells meet without gaps.
    pub fn to_pixels(&self, page_w: u32, page_h: u32) -> (u32, u32, u32, u32) {
        let x0 = (self.x * page_w as f32).round() as u32;
        let y0 = (self.y * page_h as f32).round() as u32;
        let x1 = ((self.x + self.w) * page_w as f32).round() as u32;
        let y1 = ((self.y + self.h) * page_h as f32).round() as u32;
        (x0, y0, x1.saturating_sub(x0).max(1), y1.saturating_sub(y0).max(1))
    }
}

/// Sparse row-major auto-placement over a `GRID_COLUMNS`-wide grid.
///
/// Mirrors CSS `grid-auto-flow: row`: a forward-moving cursor scans for the
/// first free position that fits each cell, rows grow on demand, and earlier
/// gaps are never revisited. Returns each cell's `(row, col)` plus the total
/// row count (at least 1).
pub fn place_cells(cells: &[CellSpan]) -> (Vec<(u32, u32)>, u32) {
    let mut occupied: Vec<[bool; GRID_COLUMNS as usize]> = Vec::new();
    let mut positions = Vec::with_capacity(cells.len());
    let (mut cursor_row, mut cursor_col) = (0u32, 0u32);
    let mut total_rows = 0u32;

    for cell in cells {
        let w = cell.col_span.min(GRID_COLUMNS);
        let h = cell.row_span;

        let (mut row, mut col) = (cursor_row, cursor_col);
        loop {
            if col + w > GRID_COLUMNS {
                row += 1;
                col = 0;
                continue;
            }
            if area_is_free(&mut occupied, row, col, w, h) {
                break;
            }
            col += 1;
        }

        mark_occupied(&mut occupied, row, col, w, h);
        positions.push((row, col));
        total_rows = total_rows.max(row + h);
        cursor_row = row;
        cursor_col = col;
    }

    (positions, total_rows.max(1))
}

/// Fractional page rectangles for a derived cell list, in cell order.
pub fn placed_rects(cells: &[CellSpan]) -> Vec<GridRect> {
    let (positions, rows) = place_cells(cells);
    let rows = rows as f32;
    positions
        .iter()
        .zip(cells)
        .map(|(&(row, col), cell)| GridRect {
            x: col as f32 / GRID_COLUMNS as f32,
            y: row as f32 / rows,
            w: cell.col_span.min(GRID_COLUMNS) as f32 / GRID_COLUMNS as f32,
            h: cell.row_span as f32 / rows,
        })
        .collect()
}

fn ensure_rows(occupied: &mut Vec<[bool; GRID_COLUMNS as usize]>, rows: u32) {
    while (occupied.len() as u32) < rows {
        occupied.push([false; GRID_COLUMNS as usize]);
    }
}

fn area_is_free(
    occupied: &mut Vec<[bool; GRID_COLUMNS as usize]>,
    row: u32,
    col: u32,
    w: u32,
    h: u32,
) -> bool {
    ensure_rows(occupied, row + h);
    for r in row..row + h {
        for c in col..col + w {
            if occupied[r as usize][c as usize] {
                return false;
            }
        }
    }
    true
}

fn mark_occupied(
    occupied: &mut Vec<[bool; GRID_COLUMNS as usize]>,
    row: u32,
    col: u32,
    w: u32,
    h: u32,
) {
    ensure_rows(occupied, row + h);
    for r in row..row + h {
        for c in col..col + w {
            occupied[r as usize][c as usize] = true;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Image;

    fn slots(count: usize) -> Vec<SlotImage> {
        (0..count)
            .map(|i| SlotImage::Catalog(Image::new(i as u32, format!("img/{i}.jpg"), &[])))
            .collect()
    }

    fn layout(name: &str, spans: &[(u32, u32)]) -> LayoutTemplate {
        LayoutTemplate::new(
            name,
            spans.iter().map(|&(c, r)| CellSpan::new(c, r)).collect(),
        )
    }

    #[test]
    fn derive_truncates_long_templates() {
        let l = layout("full-height-left", &[(1, 2), (1, 1), (1, 1), (1, 1)]);
        let cells = derive_cells(&l, 2);
        assert_eq!(cells, vec![CellSpan::new(1, 2), CellSpan::new(1, 1)]);
    }

    #[test]
    fn derive_pads_short_templates_with_unit_cells() {
        let l = layout("large-with-side", &[(2, 1), (1, 1), (1, 1)]);
        let cells = derive_cells(&l, 5);
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0], CellSpan::new(2, 1));
        assert_eq!(cells[3], CellSpan::DEFAULT);
        assert_eq!(cells[4], CellSpan::DEFAULT);
    }

    #[test]
    fn render_pairs_cells_and_images_positionally() {
        let l = layout("half-and-quarters", &[(2, 2), (1, 1), (1, 1)]);
        let images = slots(3);
        let placed = render(&l, &images);
        assert_eq!(placed.len(), images.len());
        assert_eq!(placed[0].span, CellSpan::new(2, 2));
        assert_eq!(placed[1].span, CellSpan::new(1, 1));
        assert_eq!(placed[2].span, CellSpan::new(1, 1));
        for (p, img) in placed.iter().zip(&images) {
            assert_eq!(&p.image, img);
        }
    }

    #[test]
    fn render_length_matches_images_beyond_template() {
        let l = layout("large-with-side", &[(2, 1), (1, 1), (1, 1)]);
        let images = slots(6);
        let placed = render(&l, &images);
        assert_eq!(placed.len(), 6);
        // Spans beyond the template are the default unit cell.
        for p in &placed[3..] {
            assert_eq!(p.span, CellSpan::DEFAULT);
        }
    }

    #[test]
    fn placement_tall_left_column() {
        // One 1x3 tower then three stacked unit cells beside it.
        let cells = vec![
            CellSpan::new(1, 3),
            CellSpan::new(1, 1),
            CellSpan::new(1, 1),
            CellSpan::new(1, 1),
        ];
        let (positions, rows) = place_cells(&cells);
        assert_eq!(positions, vec![(0, 0), (0, 1), (1, 1), (2, 1)]);
        assert_eq!(rows, 3);
    }

    #[test]
    fn placement_wide_cell_wraps_to_next_row() {
        // Unit cell, then a 2x2 hero that cannot fit beside it.
        let cells = vec![
            CellSpan::new(1, 1),
            CellSpan::new(2, 2),
            CellSpan::new(1, 1),
            CellSpan::new(1, 1),
        ];
        let (positions, rows) = place_cells(&cells);
        assert_eq!(positions, vec![(0, 0), (1, 0), (3, 0), (3, 1)]);
        assert_eq!(rows, 4);
    }

    #[test]
    fn placement_checkerboard_fills_rows_in_order() {
        let cells = vec![CellSpan::DEFAULT; 6];
        let (positions, rows) = place_cells(&cells);
        assert_eq!(
            positions,
            vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]
        );
        assert_eq!(rows, 3);
    }

    #[test]
    fn rects_cover_expected_fractions() {
        let cells = vec![CellSpan::new(2, 2), CellSpan::new(1, 1), CellSpan::new(1, 1)];
        let rects = placed_rects(&cells);
        // 2x2 hero over rows 0-1, two unit cells on row 2; 3 rows total.
        assert_eq!(rects[0], GridRect { x: 0.0, y: 0.0, w: 1.0, h: 2.0 / 3.0 });
        assert_eq!(rects[1].x, 0.0);
        assert_eq!(rects[1].w, 0.5);
        assert!((rects[1].y - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(rects[2].x, 0.5);
    }

    #[test]
    fn rect_pixel_conversion_is_gapless() {
        let left = GridRect { x: 0.0, y: 0.0, w: 0.5, h: 1.0 };
        let right = GridRect { x: 0.5, y: 0.0, w: 0.5, h: 1.0 };
        let (lx, _, lw, _) = left.to_pixels(817, 1056);
        let (rx, _, rw, _) = right.to_pixels(817, 1056);
        assert_eq!(lx + lw, rx);
        assert_eq!(rx + rw, 817);
    }

    #[test]
    fn oversized_col_span_is_clamped() {
        let cells = vec![CellSpan::new(4, 1), CellSpan::new(1, 1)];
        let (positions, rows) = place_cells(&cells);
        assert_eq!(positions, vec![(0, 0), (1, 0)]);
        assert_eq!(rows, 2);
    }
}
