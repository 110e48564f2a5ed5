use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use strandhtml::error_logger::ErrorLogger;
use strandhtml::parser::Html5Parser;
use strandhtml::tokenizer::{TokenFetch, Tokenizer};

fn sample_document() -> String {
    let mut out = String::from("<!DOCTYPE html><html><head><title>bench</title></head><body>");
    for i in 0..500 {
        out.push_str(&format!(
            "<div class=\"row r{i}\"><p>cell &amp; entity {i}</p><ul><li>a<li>b</ul>\
             <table><tr><td>{i}</td><td>x</td></tr></table></div>"
        ));
    }
    out.push_str("</body></html>");
    out
}

fn tokenize(input: &str) -> usize {
    let error_logger = Rc::new(RefCell::new(ErrorLogger::new()));
    let mut tokenizer = Tokenizer::new(None, error_logger);
    tokenizer.write(input);
    tokenizer.end();

    let mut count = 0;
    while let TokenFetch::Token(token) = tokenizer.next_token() {
        count += 1;
        if token.is_eof() {
            break;
        }
    }
    count
}

fn bench_tokenizer(c: &mut Criterion) {
    let input = sample_document();

    let mut group = c.benchmark_group("tokenizer");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("tokenize", |b| b.iter(|| black_box(tokenize(&input))));
    group.bench_function("parse", |b| {
        b.iter(|| {
            let parser = Html5Parser::parse_str(&input);
            black_box(parser.document().tree_format().len())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_tokenizer);
criterion_main!(benches);
