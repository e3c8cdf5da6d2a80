use rand::Rng;
use rand::seq::SliceRandom;
use vsearch_core::{StimulusItem, StimulusKind};

/// Lays out search displays on a square grid.
#[derive(Debug, Clone, Copy)]
pub struct StimulusGenerator {
    grid_size: u32,
}

impl StimulusGenerator {
    pub fn new(grid_size: u32) -> Self {
        Self { grid_size }
    }

    /// Places `set_size` items on distinct cells.
    ///
    /// The cells are the first `set_size` of a uniform permutation of the
    /// grid. When `target_present`, the first drawn cell holds the target.
    /// Every other item is `DistractorA` or `DistractorB` with equal odds,
    /// independently, so the distractor mix is not balanced.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        set_size: u32,
        target_present: bool,
        rng: &mut R,
    ) -> Vec<StimulusItem> {
        let n = self.grid_size;
        let mut cells: Vec<(u32, u32)> = (0..n * n).map(|i| (i % n, i / n)).collect();
        cells.shuffle(rng);
        cells.truncate(set_size.min(n * n) as usize);

        cells
            .into_iter()
            .enumerate()
            .map(|(i, (grid_x, grid_y))| {
                let kind = if target_present && i == 0 {
                    StimulusKind::Target
                } else if rng.random_bool(0.5) {
                    StimulusKind::DistractorA
                } else {
                    StimulusKind::DistractorB
                };
                StimulusItem {
                    kind,
                    grid_x,
                    grid_y,
                }
            })
            .collect()
    }
}

impl Default for StimulusGenerator {
    fn default() -> Self {
        Self::new(5)
    }
}
