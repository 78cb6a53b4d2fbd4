use criterion::{Criterion, criterion_group, criterion_main};
use jsreflect_core::parser::parse;
use jsreflect_core::parser::scanner::Scanner;
use jsreflect_core::zone::Zone;
use jsreflect_core::{ReflectOptions, reflect_parse};

/// A medium-sized script touching most statement and expression forms.
fn medium_script() -> String {
    let unit = r#"
function Queue(capacity) {
    this.items = [];
    this.capacity = capacity || 16;
}
Queue.prototype.push = function (item) {
    if (this.items.length >= this.capacity) {
        throw new Error("queue full: " + this.capacity);
    }
    this.items.push(item);
    return this.items.length;
};
var squares = [x * x for (x in [1, 2, 3, 4]) if (x % 2)];
for (var i = 0, n = 10; i < n; i++) {
    switch (i & 3) {
        case 0: continue;
        case 1: let y = i << 2; break;
        default: try { f(i, {a: i, b: [i, , i]}); } catch (e) { log(e); } finally { done(); }
    }
}
label: while (true) { do { break label; } while (false); }
var {a, b: [c, d]} = obj, re = /ab+c/gi;
"#;
    unit.repeat(16)
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

fn bench_scan(c: &mut Criterion) {
    let src = medium_script();
    c.bench_function("scan_medium_script", |b| {
        b.iter(|| Scanner::tokenize_all(std::hint::black_box(&src)).map(|t| t.len()));
    });
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn bench_parse(c: &mut Criterion) {
    let src = medium_script();
    c.bench_function("parse_medium_script", |b| {
        b.iter(|| {
            let zone = Zone::new();
            parse(&zone, std::hint::black_box(&src), 1, 1024).map(|tree| tree.count())
        });
    });
}

// ---------------------------------------------------------------------------
// Reflecting
// ---------------------------------------------------------------------------

fn bench_reflect(c: &mut Criterion) {
    let src = medium_script();
    let with_loc = ReflectOptions::new();
    let without_loc = ReflectOptions::new().loc(false);

    c.bench_function("reflect_medium_script_loc", |b| {
        b.iter(|| reflect_parse(std::hint::black_box(&src), &with_loc).is_ok());
    });

    c.bench_function("reflect_medium_script_no_loc", |b| {
        b.iter(|| reflect_parse(std::hint::black_box(&src), &without_loc).is_ok());
    });

    c.bench_function("reflect_medium_script_to_json", |b| {
        b.iter(|| reflect_parse(std::hint::black_box(&src), &without_loc).map(|ast| ast.to_json()));
    });
}

criterion_group!(benches, bench_scan, bench_parse, bench_reflect);
criterion_main!(benches);
