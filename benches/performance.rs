use pure_markup::menu::MenuAction;
use pure_markup::render::{RenderState, render_region};
use pure_markup::theme::Theme;
use pure_markup::{Editor, EditorOptions, NoPrompt};
use std::time::{Duration, Instant};

/// Performance benchmark suite for style toggling and rendering
///
/// Run with: cargo test --release --bench performance -- --nocapture
///
/// This measures:
/// - Region rendering performance
/// - Toggling styles inside large regions
/// - Character insertion/deletion
/// - Saving and loading stored content
const SMALL_REGION_RUNS: usize = 10;
const MEDIUM_REGION_RUNS: usize = 100;
const LARGE_REGION_RUNS: usize = 1000;

const ITERATIONS: usize = 100;

const SAMPLE_WORDS: [&str; 12] = [
    "Lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
];

/// Markup with `runs` runs of text, every third one formatted.
fn create_styled_markup(runs: usize) -> String {
    let mut html = String::new();
    for i in 0..runs {
        let word = SAMPLE_WORDS[i % SAMPLE_WORDS.len()];
        let run = if i % 15 == 0 {
            format!("<b><span style=\"font-style:italic;\">{word} {i}</span></b>")
        } else if i % 3 == 0 {
            format!("<b>{word} {i}</b>")
        } else if i % 5 == 0 {
            format!("<span style=\"text-decoration-line:underline;\">{word} {i}</span>")
        } else {
            format!("{word} {i}")
        };
        html.push_str(&run);
        html.push(' ');
        if i % 10 == 9 {
            html.push('\n');
        }
    }
    html
}

fn create_editor(runs: usize) -> Editor {
    Editor::from_html(&create_styled_markup(runs), EditorOptions::default())
        .expect("benchmark markup should parse")
}

struct BenchmarkResult {
    name: String,
    iterations: usize,
    total_duration: Duration,
    avg_duration: Duration,
    min_duration: Duration,
    max_duration: Duration,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n{}", "=".repeat(70));
        println!("Benchmark: {}", self.name);
        println!("{}", "=".repeat(70));
        println!("Iterations:     {}", self.iterations);
        println!("Total time:     {:?}", self.total_duration);
        println!("Average:        {:?}", self.avg_duration);
        println!("Min:            {:?}", self.min_duration);
        println!("Max:            {:?}", self.max_duration);
        println!(
            "Ops/sec:        {:.2}",
            1_000_000.0 / self.avg_duration.as_micros().max(1) as f64
        );

        if self.avg_duration.as_millis() > 100 {
            println!("\n⚠️  WARNING: Average duration > 100ms (user-perceptible lag)");
        } else if self.avg_duration.as_millis() > 16 {
            println!("\n⚠️  WARNING: Average duration > 16ms (may drop frames)");
        }
    }
}

fn benchmark<F>(name: &str, iterations: usize, mut f: F) -> BenchmarkResult
where
    F: FnMut(),
{
    let mut durations = Vec::with_capacity(iterations);

    // Warmup
    for _ in 0..10 {
        f();
    }

    for _ in 0..iterations {
        let start = Instant::now();
        f();
        durations.push(start.elapsed());
    }

    let total_duration: Duration = durations.iter().sum();
    let avg_duration = total_duration / iterations as u32;
    let min_duration = *durations.iter().min().unwrap();
    let max_duration = *durations.iter().max().unwrap();

    BenchmarkResult {
        name: name.to_string(),
        iterations,
        total_duration,
        avg_duration,
        min_duration,
        max_duration,
    }
}

fn sizes() -> Vec<(&'static str, usize)> {
    vec![
        ("Small (10 runs)", SMALL_REGION_RUNS),
        ("Medium (100 runs)", MEDIUM_REGION_RUNS),
        ("Large (1000 runs)", LARGE_REGION_RUNS),
    ]
}

#[test]
fn bench_rendering_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           RENDERING PERFORMANCE BENCHMARKS                     ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    let theme = Theme::default();
    for (name, runs) in sizes() {
        let editor = create_editor(runs);
        let state = RenderState {
            cursor: editor.char_len() / 2,
            selection: Some((0, editor.char_len() / 3)),
        };
        let result = benchmark(&format!("render_region - {name}"), ITERATIONS, || {
            let _ = render_region(editor.markup(), editor.region(), 80, state, &theme);
        });
        result.print();
    }
}

#[test]
fn bench_toggle_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           STYLE TOGGLE BENCHMARKS                              ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, runs) in sizes() {
        let mut editor = create_editor(runs);
        // A plain run in the middle of the region.
        let text = editor.text();
        let needle = format!(" {} ", runs / 2 + 1);
        let start = text
            .find(&needle)
            .map(|byte| text[..byte].chars().count() + 1)
            .unwrap_or(0);
        let end = start + needle.trim().chars().count();

        let result = benchmark(&format!("toggle bold on/off - {name}"), ITERATIONS, || {
            editor.select(start, end);
            let _ = editor.apply_action(MenuAction::Bold, &mut NoPrompt);
            let _ = editor.apply_action(MenuAction::Bold, &mut NoPrompt);
        });
        result.print();

        let result = benchmark(&format!("active_styles - {name}"), ITERATIONS, || {
            editor.select(start, end);
            let _ = editor.active_styles();
        });
        result.print();
    }
}

#[test]
fn bench_editing_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           EDITING PERFORMANCE BENCHMARKS                       ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, runs) in sizes() {
        let mut editor = create_editor(runs);
        let middle = editor.char_len() / 2;

        let result = benchmark(&format!("insert + backspace - {name}"), ITERATIONS, || {
            editor.set_cursor(middle, false);
            editor.insert_char('x');
            editor.backspace();
        });
        result.print();
    }
}

#[test]
fn bench_persistence_performance() {
    println!("\n\n╔════════════════════════════════════════════════════════════════╗");
    println!("║           SAVE / LOAD BENCHMARKS                               ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    for (name, runs) in sizes() {
        let mut editor = create_editor(runs);
        let stored = editor.save();

        let result = benchmark(&format!("save - {name}"), ITERATIONS, || {
            let _ = editor.save();
        });
        result.print();

        let result = benchmark(&format!("load - {name}"), ITERATIONS, || {
            editor.load(&stored).expect("stored content should load");
        });
        result.print();
    }
}
