use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use mindmap_rs_canvas::parser::parse_outline;
use mindmap_rs_canvas::{
    Config, Engine, MindEngine, PointerButton, PointerEvent, PressedButtons, RenderOptions,
    SvgSurface, render_records,
};
use std::hint::black_box;

/// Outline with `fanout` children per node, `depth` levels below the root.
fn balanced_outline(fanout: usize, depth: usize) -> String {
    fn push_level(out: &mut String, fanout: usize, depth: usize, level: usize, path: &str) {
        if level > depth {
            return;
        }
        for idx in 0..fanout {
            let label = format!("{path}.{}", idx + 1);
            out.push_str(&"  ".repeat(level));
            out.push_str(&format!("Topic {label}\n"));
            push_level(out, fanout, depth, level + 1, &label);
        }
    }
    let mut out = String::from("mindmap\nCentral idea\n");
    push_level(&mut out, fanout, depth, 1, "1");
    out
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.layout.fast_text_metrics = true;
    config
}

const SHAPES: [(&str, usize, usize); 4] = [
    ("wide_1x12", 12, 1),
    ("balanced_3x3", 3, 3),
    ("balanced_4x4", 4, 4),
    ("deep_2x7", 2, 7),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, fanout, depth) in SHAPES {
        let input = balanced_outline(fanout, depth);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let roots = parse_outline(black_box(data)).expect("parse failed");
                black_box(roots.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let options = RenderOptions::default().with_config(fast_config());
    for (name, fanout, depth) in SHAPES {
        let roots = parse_outline(&balanced_outline(fanout, depth)).expect("parse failed");
        group.bench_with_input(BenchmarkId::from_parameter(name), &roots, |b, data| {
            b.iter(|| {
                let svg = render_records(black_box(data.clone()), &options).expect("render failed");
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

fn rendered(fanout: usize, depth: usize) -> MindEngine<SvgSurface> {
    let roots = parse_outline(&balanced_outline(fanout, depth)).expect("parse failed");
    let surface = SvgSurface::new(1200.0, 800.0).with_fast_text_metrics(true);
    let mut engine = MindEngine::new(surface, fast_config(), "bench").expect("engine");
    block_on(engine.render_body(roots)).expect("render failed");
    engine
}

fn bench_connector_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("connectors");
    for (name, fanout, depth) in SHAPES {
        let mut engine = rendered(fanout, depth);
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                engine.redraw_lines(true).expect("routing failed");
            });
        });
    }
    group.finish();
}

fn bench_pan(c: &mut Criterion) {
    let mut group = c.benchmark_group("pan");
    for (name, fanout, depth) in SHAPES {
        let mut engine = rendered(fanout, depth);
        let pressed = PressedButtons::only(PointerButton::Secondary);
        group.bench_function(BenchmarkId::from_parameter(name), |b| {
            b.iter(|| {
                block_on(async {
                    engine
                        .handle_pointer(PointerEvent::down(
                            PointerButton::Secondary,
                            (0.0, 0.0),
                            None,
                        ))
                        .await;
                    engine
                        .handle_pointer(PointerEvent::moved(pressed, black_box((24.0, 12.0))))
                        .await;
                    engine
                        .handle_pointer(PointerEvent::up(PointerButton::Secondary, (24.0, 12.0)))
                        .await;
                });
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout, bench_connector_routing, bench_pan
);
criterion_main!(benches);
