//! Z-order tile traversal.
//!
//! Tile ids are produced by decoding successive Morton codes into (x, y) and discarding
//! codes that fall outside the tile grid; grids are rarely power-of-two squares, so the
//! skip is what makes the enumeration exhaustive.  Spatial locality of the resulting
//! order is what makes the shared cache effective across sorter pools.

fn decode_coordinate(code: u64, shift: u64) -> u64 {
    let mut coordinate = 0;
    for i in 0..32 {
        coordinate |= ((code >> (2 * i + shift)) & 1) << i;
    }
    coordinate
}

#[derive(Debug, Default)]
pub struct MortonWalker {
    code: u64,
}

impl MortonWalker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next in-grid tile id.  Callers must not ask for more tiles than the grid holds.
    pub fn next_tile(&mut self, grid_width: u64, grid_height: u64) -> u64 {
        loop {
            let x = decode_coordinate(self.code, 0);
            let y = decode_coordinate(self.code, 1);
            self.code += 1;

            if x < grid_width && y < grid_height {
                return y * grid_width + x;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visit_all(width: u64, height: u64) -> Vec<u64> {
        let mut walker = MortonWalker::new();
        (0..width * height)
            .map(|_| walker.next_tile(width, height))
            .collect()
    }

    #[test]
    fn square_power_of_two_grid() {
        let mut order = visit_all(4, 4);
        assert_eq!(order[..4], [0, 1, 4, 5]);
        order.sort_unstable();
        assert_eq!(order, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn non_power_of_two_grid_visits_every_tile_once() {
        for (w, h) in [(3, 5), (7, 2), (5, 5), (1, 9), (6, 1)] {
            let mut order = visit_all(w, h);
            order.sort_unstable();
            assert_eq!(order, (0..w * h).collect::<Vec<_>>(), "grid {w}x{h}");
        }
    }

    #[test]
    fn first_tile_is_origin() {
        let mut walker = MortonWalker::new();
        assert_eq!(walker.next_tile(10, 10), 0);
    }
}
