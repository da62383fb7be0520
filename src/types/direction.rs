//! Direction and axis types for grid traversal.

/// The six face directions of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    /// All six directions in order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Get the cell offset for this direction.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }
}

/// The three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All three axes, in the order the box merger grows along them.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis in `[x, y, z]` arrays.
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_unit_steps() {
        let mut sum = (0, 0, 0);
        for dir in Direction::ALL {
            let (x, y, z) = dir.offset();
            assert_eq!(x.abs() + y.abs() + z.abs(), 1);
            sum = (sum.0 + x, sum.1 + y, sum.2 + z);
        }
        assert_eq!(sum, (0, 0, 0));
    }

    #[test]
    fn test_axis_index_order() {
        let indices: Vec<usize> = Axis::ALL.iter().map(Axis::index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
