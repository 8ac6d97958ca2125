//! Uniform grid for proximity queries during collision screening.

use std::collections::HashMap;

/// Grid-based index over a fixed point set.
///
/// Queries look at the 27 cells around each query point, so the cutoff
/// passed to [`any_within`](Self::any_within) must not exceed the cell size.
#[derive(Debug)]
pub(crate) struct SpatialGrid {
    inv_cell_size: f64,
    cells: HashMap<(i64, i64, i64), Vec<usize>>,
    positions: Vec<[f64; 3]>,
}

impl SpatialGrid {
    /// Indexes `positions`; `cell_size` must be positive and finite.
    pub fn from_positions(positions: Vec<[f64; 3]>, cell_size: f64) -> Self {
        let mut grid = Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            positions: Vec::with_capacity(positions.len()),
        };
        for pos in positions {
            grid.insert(pos);
        }
        grid
    }

    fn cell_coords(&self, pos: [f64; 3]) -> (i64, i64, i64) {
        (
            (pos[0] * self.inv_cell_size).floor() as i64,
            (pos[1] * self.inv_cell_size).floor() as i64,
            (pos[2] * self.inv_cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, pos: [f64; 3]) {
        let cell = self.cell_coords(pos);
        self.cells.entry(cell).or_default().push(self.positions.len());
        self.positions.push(pos);
    }

    /// `true` if any indexed point lies within `cutoff` (inclusive) of any
    /// query point.
    pub fn any_within(&self, queries: &[[f64; 3]], cutoff: f64) -> bool {
        let cutoff_sq = cutoff * cutoff;
        queries.iter().any(|query| {
            let (cx, cy, cz) = self.cell_coords(*query);
            (-1..=1).any(|dx| {
                (-1..=1).any(|dy| {
                    (-1..=1).any(|dz| {
                        self.cells
                            .get(&(cx + dx, cy + dy, cz + dz))
                            .is_some_and(|indices| {
                                indices.iter().any(|&idx| {
                                    let pos = self.positions[idx];
                                    let dist_sq = (pos[0] - query[0]).powi(2)
                                        + (pos[1] - query[1]).powi(2)
                                        + (pos[2] - query[2]).powi(2);
                                    dist_sq <= cutoff_sq
                                })
                            })
                    })
                })
            })
        })
    }
}
