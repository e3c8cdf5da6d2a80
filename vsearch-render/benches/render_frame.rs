use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use vsearch_core::StimulusItem;
use vsearch_experiment::{summarize, ExperimentView, StimulusGenerator};
use vsearch_render::SkiaRenderer;
use vsearch_timing::HighPrecisionTimer;

fn harness() -> (SkiaRenderer, Vec<u8>, HighPrecisionTimer) {
    let width = 1280u32;
    let height = 720u32;
    let r = SkiaRenderer::new(width, height, 5).expect("renderer");
    let fb = vec![0u8; (width * height * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

fn layout(set_size: u32) -> Vec<StimulusItem> {
    let mut rng = StdRng::seed_from_u64(7);
    StimulusGenerator::new(5).generate(set_size, true, &mut rng)
}

pub fn bench_frame_trial(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    for set_size in [5u32, 20] {
        let stimuli = layout(set_size);
        g.bench_function(format!("trial_{set_size}"), |b| {
            b.iter_batched(
                harness,
                |(mut r, mut fb, t)| {
                    let view = ExperimentView::Trial {
                        stimuli: &stimuli,
                        progress: (10, 40),
                    };
                    black_box(r.render_frame(&view, &mut fb, &t).is_ok());
                },
                BatchSize::LargeInput,
            )
        });
    }

    let summary = summarize(&[], &[5, 10, 15, 20]);
    g.bench_function("results", |b| {
        b.iter_batched(
            harness,
            |(mut r, mut fb, t)| {
                let view = ExperimentView::Results { summary: &summary };
                black_box(r.render_frame(&view, &mut fb, &t).is_ok());
            },
            BatchSize::LargeInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_frame_trial);
criterion_main!(benches);
