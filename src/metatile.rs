//! 6x6 tile grids, the shape of every portrait in the game

use crate::bitmap::IndexedImage;
use crate::tile::{TILE_SIZE, Tile};
use std::fmt;

/// Portraits are `GRID` tiles wide and high
pub const GRID: usize = 6;

/// Portrait size in pixels
pub const PORTRAIT_SIZE: usize = GRID * TILE_SIZE;

const_assert_eq!(PORTRAIT_SIZE, 48);

pub type Grid<T> = [[T; GRID]; GRID];

/// Build a `Grid` by calling `f(row, col)` for every cell
pub fn grid_from_fn<T: Copy + Default, F: FnMut(usize, usize) -> T>(mut f: F) -> Grid<T> {
    let mut grid = [[T::default(); GRID]; GRID];

    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            *cell = f(r, c);
        }
    }

    grid
}

/// Compose a 48x48 image. `cell(row, col)` returns the tile for each cell, cells returning `None`
/// are left at palette index 0.
pub fn compose<F>(mut cell: F) -> IndexedImage
where
    F: FnMut(usize, usize) -> Option<Tile>,
{
    let mut img = IndexedImage::new(PORTRAIT_SIZE, PORTRAIT_SIZE);

    for row in 0..GRID {
        for col in 0..GRID {
            if let Some(tile) = cell(row, col) {
                img.blit_tile(col, row, &tile);
            }
        }
    }

    img
}

/// Displays a grid one row per line, `None` cells as `--`
pub struct GridDisplay<'a, T>(pub &'a Grid<Option<T>>);

impl<T: fmt::Display> fmt::Display for GridDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, row) in self.0.iter().enumerate() {
            write!(f, "  row {}:", r)?;

            for cell in row {
                match cell {
                    Some(v) => write!(f, " {:>4}", v)?,
                    None => write!(f, "   --")?,
                }
            }

            writeln!(f)?;
        }

        Ok(())
    }
}

#[test]
fn test_compose() {
    let mut full = [0u8; 16];
    full[..8].fill(0xff);
    full[8..].fill(0xff);

    let tile = Tile::decode(&full);

    let img = compose(|r, c| (r == c).then_some(tile));

    assert_eq!((img.width(), img.height()), (48, 48));
    assert_eq!(img.pixel(0, 0), 3);
    assert_eq!(img.pixel(47, 47), 3);
    assert_eq!(img.pixel(8, 0), 0);
    assert_eq!(img.pixel(20, 20), 3);
}

#[test]
fn test_grid_display() {
    let grid = grid_from_fn(|r, c| if r == 2 && c > 0 { None } else { Some(r * 6 + c) });

    let s = GridDisplay(&grid).to_string();
    let lines: Vec<_> = s.lines().collect();

    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "  row 0:    0    1    2    3    4    5");
    assert_eq!(lines[2], "  row 2:   12   --   --   --   --   --");
}
