//! Benchmarks for vim_core keystroke throughput.

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use ropey::Rope;
use std::time::Duration;
use vim_core::{EditorOps, Engine, InputEvent, KeyCode, KeyEvent, Modifiers, Offset, Range, Selection};

/// Rope-based buffer for benchmarking
struct BenchBuffer {
    rope: Rope,
    caret: Offset,
    selection: Option<Selection>,
}

impl BenchBuffer {
    fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            caret: 0,
            selection: None,
        }
    }
}

impl EditorOps for BenchBuffer {
    fn text_len(&self) -> usize {
        self.rope.len_chars()
    }

    fn char_at(&self, offset: Offset) -> Option<char> {
        self.rope.get_char(offset)
    }

    fn slice(&self, range: Range) -> String {
        let end = range.end.min(self.rope.len_chars());
        self.rope.slice(range.start.min(end)..end).to_string()
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line_of_offset(&self, offset: Offset) -> usize {
        self.rope.char_to_line(offset.min(self.rope.len_chars()))
    }

    fn line_start(&self, line: usize) -> Offset {
        self.rope.line_to_char(line.min(self.rope.len_lines() - 1))
    }

    fn line_end(&self, line: usize) -> Offset {
        let line = line.min(self.rope.len_lines() - 1);
        if line + 1 < self.rope.len_lines() {
            self.rope.line_to_char(line + 1) - 1
        } else {
            self.rope.len_chars()
        }
    }

    fn replace(&mut self, range: Range, text: &str) {
        let end = range.end.min(self.rope.len_chars());
        let start = range.start.min(end);
        self.rope.remove(start..end);
        self.rope.insert(start, text);
    }

    fn caret(&self) -> Offset {
        self.caret
    }

    fn set_caret(&mut self, offset: Offset) {
        self.caret = offset.min(self.rope.len_chars());
    }

    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }
}

fn generate_sample_text(lines: usize) -> String {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str(&format!(
            "This is line {} with some sample text for benchmarking vim operations.\n",
            i + 1
        ));
        if i % 10 == 0 {
            text.push('\n'); // Add blank lines for paragraphs
        }
    }
    text
}

fn key(c: char) -> KeyEvent {
    KeyEvent {
        code: KeyCode::Char(c),
        mods: Modifiers::empty(),
    }
}

fn esc() -> KeyEvent {
    KeyEvent {
        code: KeyCode::Esc,
        mods: Modifiers::empty(),
    }
}

fn benchmark_simple_movements(c: &mut Criterion) {
    let mut buffer = BenchBuffer::new(&generate_sample_text(1000));
    let mut engine = Engine::new();

    c.bench_function("simple movements (hjkl)", |b| {
        b.iter(|| {
            for m in ['j', 'j', 'l', 'l', 'h', 'k'] {
                let _ = engine.handle_key(&mut buffer, black_box(key(m)));
            }
        });
    });
}

fn benchmark_word_movements(c: &mut Criterion) {
    let mut buffer = BenchBuffer::new(&generate_sample_text(1000));
    let mut engine = Engine::new();

    c.bench_function("word movements (w/b)", |b| {
        b.iter(|| {
            for m in ['w', 'w', 'w', 'b', 'w'] {
                let _ = engine.handle_key(&mut buffer, black_box(key(m)));
            }
        });
    });
}

fn benchmark_delete_operations(c: &mut Criterion) {
    let text = generate_sample_text(1000);
    let mut engine = Engine::new();

    c.bench_function("delete operations (dw, dd)", |b| {
        b.iter_batched(
            || {
                let mut buffer = BenchBuffer::new(&text);
                let caret = buffer.line_start(50) + 10;
                buffer.set_caret(caret);
                buffer
            },
            |mut buffer| {
                let _ = engine.feed_keys(&mut buffer, black_box("dw"));
                let _ = engine.feed_keys(&mut buffer, black_box("dd"));
                buffer
            },
            BatchSize::LargeInput,
        );
    });
}

fn benchmark_visual_selection(c: &mut Criterion) {
    let mut buffer = BenchBuffer::new(&generate_sample_text(1000));
    let mut engine = Engine::new();

    c.bench_function("visual selection", |b| {
        b.iter(|| {
            let _ = engine.handle_key(&mut buffer, black_box(key('v')));
            for _ in 0..5 {
                let _ = engine.handle_key(&mut buffer, black_box(key('w')));
            }
            let _ = engine.handle_key(&mut buffer, black_box(esc()));
        });
    });
}

fn benchmark_search_operations(c: &mut Criterion) {
    let mut buffer = BenchBuffer::new(&generate_sample_text(1000));
    let mut engine = Engine::new();

    c.bench_function("search operations", |b| {
        b.iter(|| {
            let _ = engine.handle_key(&mut buffer, black_box(key('/')));
            for ch in "line 9".chars() {
                let _ = engine.handle_event(&mut buffer, black_box(InputEvent::ReceivedChar(ch)));
            }
            let _ = engine.handle_key(
                &mut buffer,
                black_box(KeyEvent {
                    code: KeyCode::Enter,
                    mods: Modifiers::empty(),
                }),
            );
        });
    });
}

fn benchmark_substitute(c: &mut Criterion) {
    let text = generate_sample_text(1000);
    let mut engine = Engine::new();

    c.bench_function("substitute whole buffer", |b| {
        b.iter_batched(
            || BenchBuffer::new(&text),
            |mut buffer| {
                let _ = engine.execute_command_line(&mut buffer, black_box("%s/\\<line\\>/row/g"));
                buffer
            },
            BatchSize::LargeInput,
        );
    });
}

fn benchmark_mapped_keys(c: &mut Criterion) {
    let mut buffer = BenchBuffer::new(&generate_sample_text(1000));
    let mut engine = Engine::new();
    let _ = engine.source(
        &mut buffer,
        "nnoremap <Space>j 5j\nnnoremap <Space>k 5k\ninoremap jk <Esc>",
    );

    c.bench_function("mapped keys", |b| {
        b.iter(|| {
            let _ = engine.feed_keys(&mut buffer, black_box("<Space>j<Space>k"));
        });
    });
}

fn benchmark_complex_sequence(c: &mut Criterion) {
    let text = generate_sample_text(1000);
    let mut engine = Engine::new();

    c.bench_function("complex keystroke sequence", |b| {
        b.iter_batched(
            || BenchBuffer::new(&text),
            |mut buffer| {
                // Down five lines, two words, delete a word, then type
                for c in ['5', 'j', 'w', 'w', 'd', 'w', 'i'] {
                    let _ = engine.handle_key(&mut buffer, black_box(key(c)));
                }
                for ch in "hello world".chars() {
                    let _ = engine.handle_event(&mut buffer, black_box(InputEvent::ReceivedChar(ch)));
                }
                let _ = engine.handle_key(&mut buffer, black_box(esc()));
                buffer
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(100);
    targets = benchmark_simple_movements,
              benchmark_word_movements,
              benchmark_delete_operations,
              benchmark_visual_selection,
              benchmark_search_operations,
              benchmark_substitute,
              benchmark_mapped_keys,
              benchmark_complex_sequence
}
criterion_main!(benches);
