use serde::{Deserialize, Serialize};

/// Defines stimuli and their render data
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    /// Index into the renderer's per-kind pixmap cache.
    fn cache_id(&self) -> usize;
    fn is_target(&self) -> bool;
    /// Grid cell as `(column, row)`.
    fn cell(&self) -> (u32, u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusKind {
    Target,
    DistractorA,
    DistractorB,
}

impl StimulusKind {
    pub const COUNT: usize = 3;
}

/// One item of a search display, placed on a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusItem {
    pub kind: StimulusKind,
    pub grid_x: u32,
    pub grid_y: u32,
}

impl Stimulus for StimulusItem {
    fn cache_id(&self) -> usize {
        match self.kind {
            StimulusKind::Target => 0,
            StimulusKind::DistractorA => 1,
            StimulusKind::DistractorB => 2,
        }
    }

    fn is_target(&self) -> bool {
        matches!(self.kind, StimulusKind::Target)
    }

    fn cell(&self) -> (u32, u32) {
        (self.grid_x, self.grid_y)
    }
}
