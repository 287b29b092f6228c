// mazenav_core/src/models/collision.rs

//! Directional collision resolution between the circular robot footprint and
//! the axis-aligned maze walls.
//!
//! The footprint is rasterised into a bitmap mask. A wall in contact with the
//! mask is classified into one of the four cardinal directions by snapping the
//! centroid of the overlapping pixels to the nearest entry of a calibration
//! table, measured from the mask itself when the footprint is built. Diagonal
//! contacts therefore resolve to their nearest cardinal direction.

use nalgebra::Point2;

use crate::types::Pose;
use crate::world::WallRect;

/// Cardinal direction of a contact, in screen coordinates (`+y` is SOUTH).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];
}

/// The set of directions in which motion is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactSet {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl ContactSet {
    pub fn insert(&mut self, direction: Direction) {
        match direction {
            Direction::North => self.north = true,
            Direction::South => self.south = true,
            Direction::East => self.east = true,
            Direction::West => self.west = true,
        }
    }

    pub fn contains(&self, direction: Direction) -> bool {
        match direction {
            Direction::North => self.north,
            Direction::South => self.south,
            Direction::East => self.east,
            Direction::West => self.west,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.north || self.south || self.east || self.west)
    }

    pub fn union(&self, other: &ContactSet) -> ContactSet {
        ContactSet {
            north: self.north || other.north,
            south: self.south || other.south,
            east: self.east || other.east,
            west: self.west || other.west,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|d| self.contains(*d))
    }

    /// Stops `candidate` from advancing past `pre` along every blocked direction.
    /// Each axis is clamped independently; heading is untouched.
    pub fn clamp(&self, pre: &Pose, candidate: &Pose) -> Pose {
        let mut out = *candidate;
        if self.south {
            out.y = out.y.min(pre.y);
        }
        if self.north {
            out.y = out.y.max(pre.y);
        }
        if self.east {
            out.x = out.x.min(pre.x);
        }
        if self.west {
            out.x = out.x.max(pre.x);
        }
        out
    }
}

/// Rectangle the robot centre must stay inside, `[r, width - r] x [r, height - r]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
}

/// Outcome of resolving one step of motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub pose: Pose,
    pub contacts: ContactSet,
    /// True when walls or the arena edge changed the candidate position.
    pub collided: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelTest {
    /// The pixel square touches the closed wall rectangle.
    Touching,
    /// The pixel centre lies inside the wall rectangle.
    Inside,
}

/// Circular collision footprint with its calibration table.
#[derive(Debug, Clone)]
pub struct Footprint {
    radius: f64,
    /// Side length of the square mask, in pixels.
    size: usize,
    /// `(column, row)` of every set pixel of the mask.
    pixels: Vec<(usize, usize)>,
    calibration: [(Direction, Point2<f64>); 4],
}

impl Footprint {
    pub fn new(radius: f64) -> Self {
        let size = ((2.0 * radius).round() as usize).max(1);
        let mut pixels = Vec::new();
        for row in 0..size {
            for col in 0..size {
                let dx = col as f64 + 0.5 - radius;
                let dy = row as f64 + 0.5 - radius;
                if dx * dx + dy * dy <= radius * radius {
                    pixels.push((col, row));
                }
            }
        }
        // A footprint smaller than a pixel still occupies its single pixel.
        if pixels.is_empty() {
            pixels.push((0, 0));
        }
        let calibration = Self::calibrate(&pixels);
        Self {
            radius,
            size,
            pixels,
            calibration,
        }
    }

    /// Measures the cardinal reference points: the centroid of the extreme
    /// top row, bottom row, right column and left column of the mask.
    fn calibrate(pixels: &[(usize, usize)]) -> [(Direction, Point2<f64>); 4] {
        let min_row = pixels.iter().map(|p| p.1).min().unwrap_or(0);
        let max_row = pixels.iter().map(|p| p.1).max().unwrap_or(0);
        let min_col = pixels.iter().map(|p| p.0).min().unwrap_or(0);
        let max_col = pixels.iter().map(|p| p.0).max().unwrap_or(0);

        let centroid = |keep: &dyn Fn(&(usize, usize)) -> bool| -> Point2<f64> {
            let (sum, n) = pixels
                .iter()
                .filter(|p| keep(p))
                .fold((Point2::<f64>::origin(), 0usize), |(acc, n), p| {
                    (
                        Point2::new(acc.x + p.0 as f64, acc.y + p.1 as f64),
                        n + 1,
                    )
                });
            let n = n.max(1) as f64;
            Point2::new(sum.x / n, sum.y / n)
        };

        [
            (Direction::North, centroid(&|p: &(usize, usize)| p.1 == min_row)),
            (Direction::South, centroid(&|p: &(usize, usize)| p.1 == max_row)),
            (Direction::East, centroid(&|p: &(usize, usize)| p.0 == max_col)),
            (Direction::West, centroid(&|p: &(usize, usize)| p.0 == min_col)),
        ]
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The calibration table, in mask pixel coordinates.
    pub fn calibration(&self) -> &[(Direction, Point2<f64>); 4] {
        &self.calibration
    }

    /// Walls touching the footprint placed at `pose`, by direction.
    pub fn contacts(&self, pose: &Pose, walls: &[WallRect]) -> ContactSet {
        self.classify_all(pose, walls, PixelTest::Touching)
    }

    /// Whether any mask pixel centre lies inside a wall.
    pub fn overlaps_any(&self, pose: &Pose, walls: &[WallRect]) -> bool {
        walls
            .iter()
            .any(|wall| self.overlap_point(pose, wall, PixelTest::Inside).is_some())
    }

    /// Resolves a candidate pose against the walls, then clamps it into the arena.
    ///
    /// Contacts are detected with the footprint at the pre-motion pose and the
    /// blocked axes of the candidate are clamped. If the clamped pose still
    /// overlaps a wall, the overlap at that pose is classified and clamped
    /// once more, falling back to the pre-motion position as a last resort.
    pub fn resolve(
        &self,
        pre: &Pose,
        candidate: &Pose,
        walls: &[WallRect],
        arena: &Arena,
    ) -> Resolution {
        let mut contacts = self.contacts(pre, walls);
        let mut pose = contacts.clamp(pre, candidate);

        let penetrating = self.classify_all(&pose, walls, PixelTest::Inside);
        if !penetrating.is_empty() {
            contacts = contacts.union(&penetrating);
            pose = penetrating.clamp(pre, &pose);
            if self.overlaps_any(&pose, walls) && !self.overlaps_any(pre, walls) {
                pose.x = pre.x;
                pose.y = pre.y;
            }
        }

        let pose = self.clamp_to_arena(&pose, arena);
        let collided = pose.x != candidate.x || pose.y != candidate.y;
        Resolution {
            pose,
            contacts,
            collided,
        }
    }

    pub fn clamp_to_arena(&self, pose: &Pose, arena: &Arena) -> Pose {
        let r = self.radius;
        Pose {
            x: pose.x.max(r).min(arena.width - r),
            y: pose.y.max(r).min(arena.height - r),
            theta: pose.theta,
        }
    }

    fn classify_all(&self, pose: &Pose, walls: &[WallRect], test: PixelTest) -> ContactSet {
        let mut contacts = ContactSet::default();
        for wall in walls {
            if let Some(point) = self.overlap_point(pose, wall, test) {
                contacts.insert(self.nearest_cardinal(&point));
            }
        }
        contacts
    }

    /// Centroid of the mask pixels overlapping `wall`, in mask coordinates.
    fn overlap_point(&self, pose: &Pose, wall: &WallRect, test: PixelTest) -> Option<Point2<f64>> {
        let origin_x = pose.x - self.radius;
        let origin_y = pose.y - self.radius;
        let extent = self.size as f64;

        // Cheap bounding-box rejection before walking the mask.
        if origin_x > wall.right()
            || origin_x + extent < wall.x
            || origin_y > wall.bottom()
            || origin_y + extent < wall.y
        {
            return None;
        }

        let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0usize);
        for &(col, row) in &self.pixels {
            let px = origin_x + col as f64;
            let py = origin_y + row as f64;
            let hit = match test {
                PixelTest::Touching => {
                    px <= wall.right()
                        && px + 1.0 >= wall.x
                        && py <= wall.bottom()
                        && py + 1.0 >= wall.y
                }
                PixelTest::Inside => wall.contains(px + 0.5, py + 0.5),
            };
            if hit {
                sum_x += col as f64;
                sum_y += row as f64;
                count += 1;
            }
        }
        (count > 0).then(|| Point2::new(sum_x / count as f64, sum_y / count as f64))
    }

    fn nearest_cardinal(&self, point: &Point2<f64>) -> Direction {
        let mut best = self.calibration[0];
        let mut best_dist = nalgebra::distance_squared(point, &best.1);
        for entry in &self.calibration[1..] {
            let dist = nalgebra::distance_squared(point, &entry.1);
            if dist < best_dist {
                best = *entry;
                best_dist = dist;
            }
        }
        best.0
    }
}
