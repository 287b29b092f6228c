// mazenav_core/src/world.rs

//! The read-only maze the robot drives through: an occupancy grid, the wall
//! rectangles derived from it and the landmark positions.

use nalgebra::Point2;

use crate::error::WorldError;

/// Occupancy state of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Free,
    Wall,
    /// A free cell with a landmark at its centre.
    Landmark,
}

impl Cell {
    fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' => Some(Cell::Wall),
            '.' | ' ' => Some(Cell::Free),
            'L' => Some(Cell::Landmark),
            _ => None,
        }
    }
}

/// Row-major occupancy grid of square cells.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl OccupancyGrid {
    /// Builds a grid from nested rows. Every row must have the same width.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self, WorldError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(WorldError::EmptyLayout);
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(WorldError::RaggedRow {
                    row: i,
                    expected: cols,
                    found: row.len(),
                });
            }
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the cell at `(row, col)`, or `None` outside the grid.
    pub fn get(&self, row: i64, col: i64) -> Option<Cell> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    /// Anything outside the grid blocks rays just like a wall.
    pub fn is_blocked(&self, row: i64, col: i64) -> bool {
        !matches!(self.get(row, col), Some(Cell::Free) | Some(Cell::Landmark))
    }

    /// Iterates `(row, col, cell)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (i / self.cols, i % self.cols, *cell))
    }
}

/// Axis-aligned wall rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WallRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Liang-Barsky clip of the segment `a -> b` against this rectangle.
    pub fn intersects_segment(&self, a: Point2<f64>, b: Point2<f64>) -> bool {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let checks = [
            (-dx, a.x - self.x),
            (dx, self.right() - a.x),
            (-dy, a.y - self.y),
            (dy, self.bottom() - a.y),
        ];
        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return false;
            }
        }
        true
    }
}

/// The maze as seen by the engine. Fixed for the lifetime of a simulation.
#[derive(Debug, Clone)]
pub struct Maze {
    grid: OccupancyGrid,
    cell_size: f64,
    walls: Vec<WallRect>,
    landmarks: Vec<Point2<f64>>,
}

impl Maze {
    /// Derives one wall rectangle per wall cell and one landmark per landmark cell.
    pub fn from_grid(grid: OccupancyGrid, cell_size: f64) -> Result<Self, WorldError> {
        if !(cell_size > 0.0) {
            return Err(WorldError::InvalidCellSize(cell_size));
        }
        let mut walls = Vec::new();
        let mut landmarks = Vec::new();
        for (row, col, cell) in grid.iter() {
            let x = col as f64 * cell_size;
            let y = row as f64 * cell_size;
            match cell {
                Cell::Wall => walls.push(WallRect::new(x, y, cell_size, cell_size)),
                Cell::Landmark => {
                    landmarks.push(Point2::new(x + cell_size / 2.0, y + cell_size / 2.0))
                }
                Cell::Free => {}
            }
        }
        Ok(Self {
            grid,
            cell_size,
            walls,
            landmarks,
        })
    }

    /// Parses a text layout: `#` wall, `.` or space free, `L` landmark.
    pub fn from_ascii(layout: &str, cell_size: f64) -> Result<Self, WorldError> {
        let mut rows = Vec::new();
        for (row, line) in layout
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .enumerate()
        {
            let cells = line
                .chars()
                .enumerate()
                .map(|(col, symbol)| {
                    Cell::from_symbol(symbol).ok_or(WorldError::UnknownSymbol { symbol, row, col })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(cells);
        }
        Self::from_grid(OccupancyGrid::from_rows(rows)?, cell_size)
    }

    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn walls(&self) -> &[WallRect] {
        &self.walls
    }

    pub fn landmarks(&self) -> &[Point2<f64>] {
        &self.landmarks
    }

    pub fn width(&self) -> f64 {
        self.grid.cols() as f64 * self.cell_size
    }

    pub fn height(&self) -> f64 {
        self.grid.rows() as f64 * self.cell_size
    }

    /// Whether the world point falls on a wall cell or outside the grid.
    pub fn is_blocked_at(&self, x: f64, y: f64) -> bool {
        let col = (x / self.cell_size).floor() as i64;
        let row = (y / self.cell_size).floor() as i64;
        self.grid.is_blocked(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = "\
#####
#..L#
#.#.#
#####
";

    #[test]
    fn ascii_layout_derives_walls_and_landmarks() {
        let maze = Maze::from_ascii(LAYOUT, 40.0).unwrap();
        assert_eq!(maze.grid().rows(), 4);
        assert_eq!(maze.grid().cols(), 5);
        assert_eq!(maze.walls().len(), 15);
        assert_eq!(maze.landmarks(), &[Point2::new(140.0, 60.0)]);
        assert_eq!(maze.width(), 200.0);
        assert_eq!(maze.height(), 160.0);
    }

    #[test]
    fn ragged_layout_is_rejected() {
        let err = Maze::from_ascii("###\n##\n", 40.0).unwrap_err();
        assert_eq!(
            err,
            WorldError::RaggedRow {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn unknown_symbol_is_rejected() {
        let err = Maze::from_ascii("#x#\n", 40.0).unwrap_err();
        assert!(matches!(err, WorldError::UnknownSymbol { symbol: 'x', .. }));
    }

    #[test]
    fn outside_the_grid_counts_as_blocked() {
        let maze = Maze::from_ascii(LAYOUT, 40.0).unwrap();
        assert!(maze.is_blocked_at(-1.0, 50.0));
        assert!(maze.is_blocked_at(50.0, 1000.0));
        assert!(!maze.is_blocked_at(50.0, 50.0));
        // Landmark cells do not block.
        assert!(!maze.is_blocked_at(140.0, 60.0));
    }

    #[test]
    fn segment_clip_detects_crossing_and_miss() {
        let wall = WallRect::new(40.0, 40.0, 40.0, 40.0);
        assert!(wall.intersects_segment(Point2::new(0.0, 60.0), Point2::new(120.0, 60.0)));
        assert!(!wall.intersects_segment(Point2::new(0.0, 10.0), Point2::new(120.0, 10.0)));
        assert!(!wall.intersects_segment(Point2::new(0.0, 0.0), Point2::new(30.0, 30.0)));
    }
}
