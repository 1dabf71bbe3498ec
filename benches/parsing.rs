//! Benchmarks for chatarchive parsing and output.
//!
//! Run with: `cargo bench`
//! Run specific group: `cargo bench --bench parsing -- trillian`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chatarchive::adapters::{SmsAdapter, TelegramAdapter, TrillianAdapter};
use chatarchive::config::SourceOptions;
use chatarchive::core::{ContactDeduplicator, to_jsonl};
use chatarchive::parsing::{FormatHint, TimestampNormalizer, strip_markup};
use chatarchive::{Contact, Message, MessageTarget, Platform, PlatformIdentity};

use chrono::{Duration, TimeZone, Utc};

// =============================================================================
// Test Data Generators
// =============================================================================

/// One session per 50 messages, every third message with a continuation line.
fn generate_trillian_log(count: usize) -> String {
    let mut out = String::with_capacity(count * 40);
    for i in 0..count {
        if i % 50 == 0 {
            if i > 0 {
                out.push_str("Session Close (Alice): Thu Jan 24 23:05:59 2002\n");
            }
            out.push_str("Session Start (ICQ - 000002:Alice): Thu Jan 24 21:54:39 2002\n");
        }
        let speaker = if i % 2 == 0 { "Alice" } else { "Bob" };
        out.push_str(&format!("{speaker}: Message number {i}\n"));
        if i % 3 == 0 {
            out.push_str("and a second line\n");
        }
    }
    out
}

fn generate_sms_txt(count: usize) -> String {
    let mut out = String::with_capacity(count * 100);
    for i in 0..count {
        out.push_str(&format!(
            "Received SMS.\nId: {i}\nDate: 29.12.2003 г. 21:{:02}:05\nNumbers: 0888{i:06} <Ivan>\nMessage number {i}\n--------------------\n",
            i % 60
        ));
    }
    out
}

fn generate_telegram_jsonl(count: usize) -> String {
    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        let (from, to) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
        lines.push(format!(
            r#"{{"event": "message", "date": {}, "text": "Message number {}", "from": {{"peer_id": {}, "peer_type": "user", "print_name": "P{}"}}, "to": {{"peer_id": {}, "peer_type": "user"}}}}"#,
            1485941000 + i as i64 * 60,
            i,
            from,
            from,
            to
        ));
    }
    lines.join("\n")
}

fn generate_messages(count: usize) -> Vec<Message> {
    let base = Utc.with_ymd_and_hms(2002, 1, 24, 21, 54, 39).unwrap();
    (0..count)
        .map(|i| {
            Message::new(
                base + Duration::seconds(i as i64 * 5),
                Platform::Icq,
                if i % 2 == 0 { "000001" } else { "000002" },
                MessageTarget::user("000003"),
                format!("Message number {i}\nwith \"quotes\" and Привет"),
            )
        })
        .collect()
}

// =============================================================================
// Parsing Benchmarks
// =============================================================================

fn bench_trillian_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("trillian_parsing");
    let adapter = TrillianAdapter::new(SourceOptions::new().with_owner("000001")).unwrap();

    for size in [100_usize, 1_000, 10_000, 50_000] {
        let log = generate_trillian_log(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &log, |b, log| {
            b.iter(|| {
                let count = adapter.parse_str(black_box(log)).unwrap().filter(Result::is_ok).count();
                black_box(count)
            });
        });
    }
    group.finish();
}

fn bench_sms_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sms_parsing");
    let adapter = SmsAdapter::new(SourceOptions::new().with_owner("me")).unwrap();

    for size in [100_usize, 1_000, 10_000] {
        let txt = generate_sms_txt(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &txt, |b, txt| {
            b.iter(|| {
                let count = adapter.parse_txt(black_box(txt)).unwrap().filter(Result::is_ok).count();
                black_box(count)
            });
        });
    }
    group.finish();
}

fn bench_telegram_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("telegram_parsing");
    let adapter = TelegramAdapter::new(SourceOptions::new()).unwrap();

    for size in [100_usize, 1_000, 10_000] {
        let jsonl = generate_telegram_jsonl(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &jsonl, |b, jsonl| {
            b.iter(|| black_box(adapter.parse_str(black_box(jsonl))));
        });
    }
    group.finish();
}

fn bench_timestamp_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("timestamp_normalize");
    let normalizer = TimestampNormalizer::default();

    let inputs = [
        ("trillian", "Thu Jan 24 21:54:39 2002", FormatHint::Trillian),
        ("sms", "29.12.2003 г. 21:40:05", FormatHint::Sms),
        ("google_chat", "1 March 2000 at 09:33:50 UTC", FormatHint::GoogleChat),
        ("epoch_millis", "1700000000000", FormatHint::Epoch),
    ];
    for (name, raw, hint) in inputs {
        group.bench_function(name, |b| {
            b.iter(|| black_box(normalizer.normalize(black_box(raw), hint)));
        });
    }
    group.finish();
}

fn bench_strip_markup(c: &mut Criterion) {
    let input = r#"<b>bold</b> and <a href="https://example.com">a link</a> &amp; <ss type="smile">:)</ss> text"#;
    c.bench_function("strip_markup", |b| b.iter(|| black_box(strip_markup(black_box(input)))));
}

// =============================================================================
// Processing Benchmarks
// =============================================================================

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("contact_dedup");

    for size in [1_000_usize, 10_000, 100_000] {
        // every identity is seen ten times
        let sightings: Vec<Contact> = (0..size)
            .map(|i| Contact::new(format!("User {}", i % (size / 10)), PlatformIdentity::new((i % (size / 10)).to_string(), Platform::Icq)))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &sightings, |b, sightings| {
            b.iter(|| {
                let mut dedup = ContactDeduplicator::new();
                dedup.extend(black_box(sightings.clone()));
                black_box(dedup.finalize())
            });
        });
    }
    group.finish();
}

fn bench_jsonl_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("jsonl_output");

    for size in [100_usize, 1_000, 10_000] {
        let messages = generate_messages(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &messages, |b, messages| {
            b.iter(|| black_box(to_jsonl(black_box(messages)).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_trillian_parsing,
    bench_sms_parsing,
    bench_telegram_parsing,
    bench_timestamp_normalize,
    bench_strip_markup,
    bench_dedup,
    bench_jsonl_output,
);

criterion_main!(benches);
