use anyhow::{Context, Result, anyhow, ensure};
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};
use vsearch_core::{Response, Stimulus, StimulusItem};
use vsearch_experiment::{ExperimentView, Outcome, Summary};
use vsearch_timing::Timer;

#[repr(usize)]
#[derive(Debug, Clone, Copy)]
enum CacheIndex {
    // Search items, matching `Stimulus::cache_id` (0-2)
    Target = 0,
    DistractorA = 1,
    DistractorB = 2,

    FixationCross = 3,

    // Feedback marks (4-6)
    Correct = 4,
    Incorrect = 5,
    TooSlow = 6,
}

impl CacheIndex {
    const STATIC_COUNT: usize = 7;
}

const BACKGROUND: [u8; 4] = [128, 128, 128, 255];
const RED: [u8; 4] = [220, 40, 40, 255];
const GREEN: [u8; 4] = [40, 180, 70, 255];
const ORANGE: [u8; 4] = [240, 150, 30, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];
const DARK: [u8; 4] = [60, 60, 60, 255];

const MARK_PX: f32 = 80.0;

pub struct FrameStats {
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
}

pub trait Renderer {
    fn clear(&mut self);
    /// Draws cached pixmap `index` centred on `pos`.
    fn blit_cached(&mut self, index: usize, pos: (f32, f32));
}

pub trait ViewRenderer: Renderer {
    fn render_view(&mut self, view: &ExperimentView<'_>) -> Result<()>;
}

fn paint(color: [u8; 4]) -> Paint<'static> {
    let mut p = Paint::default();
    p.set_color(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    p.anti_alias = true;
    p
}

fn blank(size: f32) -> Result<Pixmap> {
    let side = size.ceil().max(1.0) as u32;
    Pixmap::new(side, side).ok_or_else(|| anyhow!("invalid pixmap size {side}"))
}

/// Draws experiment views with tiny-skia into an RGBA frame buffer.
///
/// Every static shape is rasterised once into `static_cache` and blitted per
/// frame. Item pixmaps depend on the grid cell size and are rebuilt on resize.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    center: (f32, f32),
    grid_size: u32,
    cell_px: f32,

    static_cache: Vec<Pixmap>,
    canvas: Pixmap,

    /// Characters typed so far on the setup screen.
    entry_len: usize,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, grid_size: u32) -> Result<Self> {
        let canvas = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| anyhow!("invalid canvas size {width}x{height}"))?;
        let mut renderer = SkiaRenderer {
            width,
            height,
            center: (width as f32 / 2.0, height as f32 / 2.0),
            grid_size: grid_size.max(1),
            cell_px: 0.0,
            static_cache: Vec::with_capacity(CacheIndex::STATIC_COUNT),
            canvas,
            entry_len: 0,
        };
        renderer.init_cache()?;
        Ok(renderer)
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<()> {
        self.width = new_width;
        self.height = new_height;
        self.center = (new_width as f32 / 2.0, new_height as f32 / 2.0);
        self.canvas = Pixmap::new(new_width.max(1), new_height.max(1))
            .context("failed to resize canvas pixmap")?;
        self.init_cache()
    }

    pub fn set_entry_len(&mut self, len: usize) {
        self.entry_len = len;
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    fn init_cache(&mut self) -> Result<()> {
        let side = self.width.min(self.height) as f32 * 0.7;
        self.cell_px = (side / self.grid_size as f32).max(4.0);
        let item = (self.cell_px * 0.6).max(2.0);

        self.static_cache = vec![
            Self::circle_pixmap(item, RED)?,
            Self::circle_pixmap(item, GREEN)?,
            Self::square_pixmap(item, RED)?,
            Self::fixation_pixmap()?,
            Self::ring_pixmap(MARK_PX, GREEN)?,
            Self::cross_pixmap(MARK_PX, RED)?,
            Self::outline_square_pixmap(MARK_PX, ORANGE)?,
        ];
        debug_assert_eq!(self.static_cache.len(), CacheIndex::STATIC_COUNT);
        tracing::debug!(cell_px = self.cell_px, "stimulus cache built");
        Ok(())
    }

    fn circle_pixmap(size: f32, color: [u8; 4]) -> Result<Pixmap> {
        let mut pm = blank(size)?;
        let r = size / 2.0;
        let path = PathBuilder::from_circle(r, r, r).context("circle path")?;
        pm.fill_path(
            &path,
            &paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
        Ok(pm)
    }

    fn square_pixmap(size: f32, color: [u8; 4]) -> Result<Pixmap> {
        let mut pm = blank(size)?;
        let rect = Rect::from_xywh(0.0, 0.0, size, size).context("square rect")?;
        pm.fill_rect(rect, &paint(color), Transform::identity(), None);
        Ok(pm)
    }

    fn fixation_pixmap() -> Result<Pixmap> {
        let size = 40.0; // full extent of cross
        let mut pm = blank(size)?;
        let mut p = paint(WHITE);
        p.anti_alias = false;

        let h = Rect::from_xywh(0.0, (size - 2.0) * 0.5, size, 2.0).context("fixation bar")?;
        pm.fill_rect(h, &p, Transform::identity(), None);
        let v = Rect::from_xywh((size - 2.0) * 0.5, 0.0, 2.0, size).context("fixation bar")?;
        pm.fill_rect(v, &p, Transform::identity(), None);
        Ok(pm)
    }

    fn ring_pixmap(size: f32, color: [u8; 4]) -> Result<Pixmap> {
        let mut pm = blank(size)?;
        let stroke = Stroke {
            width: size * 0.12,
            ..Stroke::default()
        };
        let r = size / 2.0;
        let path =
            PathBuilder::from_circle(r, r, r - stroke.width).context("feedback ring path")?;
        pm.stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
        Ok(pm)
    }

    fn cross_pixmap(size: f32, color: [u8; 4]) -> Result<Pixmap> {
        let mut pm = blank(size)?;
        let stroke = Stroke {
            width: size * 0.12,
            ..Stroke::default()
        };
        let inset = stroke.width;
        let mut pb = PathBuilder::new();
        pb.move_to(inset, inset);
        pb.line_to(size - inset, size - inset);
        pb.move_to(size - inset, inset);
        pb.line_to(inset, size - inset);
        let path = pb.finish().context("feedback cross path")?;
        pm.stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
        Ok(pm)
    }

    fn outline_square_pixmap(size: f32, color: [u8; 4]) -> Result<Pixmap> {
        let mut pm = blank(size)?;
        let stroke = Stroke {
            width: size * 0.12,
            ..Stroke::default()
        };
        let inset = stroke.width;
        let rect = Rect::from_xywh(inset, inset, size - 2.0 * inset, size - 2.0 * inset)
            .context("timeout mark rect")?;
        let path = PathBuilder::from_rect(rect);
        pm.stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
        Ok(pm)
    }

    /// Centre of grid cell `(x, y)` in canvas pixels.
    fn cell_center(&self, cell: (u32, u32)) -> (f32, f32) {
        let side = self.cell_px * self.grid_size as f32;
        let origin = (self.center.0 - side / 2.0, self.center.1 - side / 2.0);
        (
            origin.0 + (cell.0 as f32 + 0.5) * self.cell_px,
            origin.1 + (cell.1 as f32 + 0.5) * self.cell_px,
        )
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 4]) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.canvas
                .fill_rect(rect, &paint(color), Transform::identity(), None);
        }
    }

    fn draw_progress(&mut self, (current, total): (usize, usize)) {
        if total == 0 {
            return;
        }
        let w = self.width as f32 * 0.6;
        let x = (self.width as f32 - w) / 2.0;
        self.fill_rect(x, 20.0, w, 6.0, DARK);
        let done = w * current.min(total) as f32 / total as f32;
        self.fill_rect(x, 20.0, done, 6.0, WHITE);
    }

    fn draw_stimuli(&mut self, stimuli: &[StimulusItem]) {
        for item in stimuli {
            let pos = self.cell_center(item.cell());
            self.blit_cached(item.cache_id(), pos);
        }
    }

    fn draw_setup(&mut self, message: Option<&str>) {
        let box_w = self.width as f32 * 0.4;
        let x = self.center.0 - box_w / 2.0;
        let y = self.center.1 - 30.0;
        self.fill_rect(x, y, box_w, 60.0, DARK);

        // One tick per typed character.
        let tick = 14.0;
        let max_ticks = ((box_w - 20.0) / (tick + 6.0)).max(0.0) as usize;
        for i in 0..self.entry_len.min(max_ticks) {
            let tx = x + 10.0 + i as f32 * (tick + 6.0);
            self.fill_rect(tx, y + 23.0, tick, tick, WHITE);
        }

        if message.is_some() {
            self.fill_rect(x, y + 70.0, box_w, 6.0, RED);
        }
    }

    fn draw_instructions(&mut self) {
        // The target large in the middle, the two distractors below it.
        let (cx, cy) = self.center;
        self.blit_cached(CacheIndex::Target as usize, (cx, cy - self.cell_px));
        self.blit_cached(
            CacheIndex::DistractorA as usize,
            (cx - self.cell_px, cy + self.cell_px),
        );
        self.blit_cached(
            CacheIndex::DistractorB as usize,
            (cx + self.cell_px, cy + self.cell_px),
        );
    }

    fn draw_feedback(&mut self, outcome: &Outcome) {
        let mark = match (outcome.response, outcome.correct) {
            (Response::Timeout, _) => CacheIndex::TooSlow,
            (_, true) => CacheIndex::Correct,
            (_, false) => CacheIndex::Incorrect,
        };
        self.blit_cached(mark as usize, self.center);
    }

    /// Bar chart of mean RT per set size, plus an accuracy column.
    fn draw_results(&mut self, summary: &Summary) {
        let chart_w = self.width as f32 * 0.6;
        let chart_h = self.height as f32 * 0.5;
        let left = (self.width as f32 - chart_w) / 2.0;
        let baseline = self.center.1 + chart_h / 2.0;

        self.fill_rect(left, baseline, chart_w, 2.0, WHITE);

        let max_rt = summary
            .per_size
            .values()
            .filter_map(|s| s.mean_rt_ms)
            .fold(1.0_f64, f64::max);
        let columns = summary.per_size.len() + 1;
        let slot = chart_w / columns as f32;
        let bar_w = slot * 0.6;

        let bars: Vec<f64> = summary
            .per_size
            .values()
            .map(|s| s.mean_rt_ms.unwrap_or(0.0) / max_rt)
            .collect();
        for (i, frac) in bars.into_iter().enumerate() {
            let h = chart_h * frac as f32;
            let x = left + i as f32 * slot + (slot - bar_w) / 2.0;
            self.fill_rect(x, baseline - h, bar_w, h, WHITE);
        }

        let x = left + (columns - 1) as f32 * slot + (slot - bar_w) / 2.0;
        self.fill_rect(x, baseline - chart_h, bar_w, chart_h, DARK);
        let h = chart_h * summary.overall_accuracy as f32;
        self.fill_rect(x, baseline - h, bar_w, h, GREEN);
    }

    /// Renders `view` and copies the result into `frame_buffer` (RGBA8,
    /// same size as the canvas).
    pub fn render_frame<T: Timer<Timestamp = u64>>(
        &mut self,
        view: &ExperimentView<'_>,
        frame_buffer: &mut [u8],
        timer: &T,
    ) -> Result<FrameStats> {
        let start = timer.now();
        self.render_view(view)?;
        let draw = timer.elapsed(start);

        let data = self.canvas.data();
        ensure!(
            frame_buffer.len() == data.len(),
            "frame buffer is {} bytes, canvas is {}",
            frame_buffer.len(),
            data.len()
        );
        let t = timer.now();
        // The canvas is opaque, so premultiplied and straight RGBA agree.
        frame_buffer.copy_from_slice(data);
        let copy = timer.elapsed(t);

        Ok(FrameStats {
            draw,
            copy,
            total: timer.elapsed(start),
        })
    }
}

impl Renderer for SkiaRenderer {
    fn clear(&mut self) {
        self.canvas.fill(Color::from_rgba8(
            BACKGROUND[0],
            BACKGROUND[1],
            BACKGROUND[2],
            BACKGROUND[3],
        ));
    }

    fn blit_cached(&mut self, index: usize, pos: (f32, f32)) {
        let Some(pixmap) = self.static_cache.get(index) else {
            return;
        };
        let x = (pos.0 - pixmap.width() as f32 / 2.0).round() as i32;
        let y = (pos.1 - pixmap.height() as f32 / 2.0).round() as i32;
        self.canvas.draw_pixmap(
            x,
            y,
            pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
}

impl ViewRenderer for SkiaRenderer {
    fn render_view(&mut self, view: &ExperimentView<'_>) -> Result<()> {
        self.clear();
        match view {
            ExperimentView::Setup { message } => self.draw_setup(*message),
            ExperimentView::Instructions { .. } => self.draw_instructions(),
            ExperimentView::Fixation { progress } => {
                self.blit_cached(CacheIndex::FixationCross as usize, self.center);
                self.draw_progress(*progress);
            }
            ExperimentView::Trial { stimuli, progress } => {
                self.draw_stimuli(stimuli);
                self.draw_progress(*progress);
            }
            ExperimentView::Feedback { outcome, progress } => {
                self.draw_feedback(outcome);
                self.draw_progress(*progress);
            }
            ExperimentView::Results { summary } => self.draw_results(summary),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsearch_core::StimulusKind;
    use vsearch_experiment::summarize;
    use vsearch_timing::ManualClock;

    fn pixel(r: &SkiaRenderer, pos: (f32, f32)) -> [u8; 4] {
        let p = r
            .canvas()
            .pixel(pos.0 as u32, pos.1 as u32)
            .expect("pixel in bounds");
        [p.red(), p.green(), p.blue(), p.alpha()]
    }

    #[test]
    fn items_land_on_their_cells() {
        let mut r = SkiaRenderer::new(500, 500, 5).unwrap();
        let stimuli = [
            StimulusItem {
                kind: StimulusKind::Target,
                grid_x: 0,
                grid_y: 0,
            },
            StimulusItem {
                kind: StimulusKind::DistractorA,
                grid_x: 4,
                grid_y: 4,
            },
        ];
        r.render_view(&ExperimentView::Trial {
            stimuli: &stimuli,
            progress: (0, 40),
        })
        .unwrap();

        assert_eq!(pixel(&r, r.cell_center((0, 0))), RED);
        assert_eq!(pixel(&r, r.cell_center((4, 4))), GREEN);
        assert_eq!(pixel(&r, r.cell_center((2, 2))), BACKGROUND);
    }

    #[test]
    fn frame_copy_checks_buffer_size() {
        let mut r = SkiaRenderer::new(64, 48, 5).unwrap();
        let clock = ManualClock::new();
        let view = ExperimentView::Fixation { progress: (3, 40) };

        let mut frame = vec![0u8; 64 * 48 * 4];
        r.render_frame(&view, &mut frame, &clock).unwrap();
        assert_eq!(&frame[..4], &BACKGROUND);

        let mut short = vec![0u8; 16];
        assert!(r.render_frame(&view, &mut short, &clock).is_err());
    }

    #[test]
    fn results_chart_renders_without_data() {
        let mut r = SkiaRenderer::new(320, 240, 5).unwrap();
        let summary = summarize(&[], &[5, 10, 15, 20]);
        r.render_view(&ExperimentView::Results { summary: &summary })
            .unwrap();
    }

    #[test]
    fn resize_rebuilds_cache() {
        let mut r = SkiaRenderer::new(320, 240, 5).unwrap();
        let before = r.cell_px;
        r.resize(640, 480).unwrap();
        assert!(r.cell_px > before);
        assert_eq!(r.canvas().width(), 640);
    }
}
