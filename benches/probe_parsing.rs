//! Benchmarks for probe output parsing
//!
//! Measures stream-line scanning and stream selection on ffprobe listings.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mkvshrink_av::{ProbeParser, StreamSelector};
use mkvshrink_core::config::SelectionConfig;

/// Listing for a typical single-episode release
const PROBE_SIMPLE: &str = "\
Input #0, matroska,webm, from 'Show S01E01 WEB-DL 1080p.mkv':
  Metadata:
    title           : Show S01E01
  Duration: 00:42:10.05, start: 0.000000, bitrate: 5321 kb/s
  Stream #0:0: Video: h264 (High), yuv420p(progressive), 1920x1080, SAR 1:1 DAR 16:9, 23.98 fps (default)
  Stream #0:1(rus): Audio: ac3, 48000 Hz, 5.1(side), fltp, 384 kb/s (default)
  Stream #0:2(eng): Audio: eac3, 48000 Hz, 5.1(side), fltp, 640 kb/s
  Stream #0:3(rus): Subtitle: subrip
  Stream #0:4(eng): Subtitle: subrip
";

/// Builds a listing with many dubs, subtitles and attachments, each stream
/// followed by a metadata block as ffprobe prints them.
fn probe_complex() -> String {
    let mut text = String::from(
        "Input #0, matroska,webm, from 'Show S01E01 2160p REMUX.mkv':\n\
         \x20 Duration: 00:58:31.02, start: 0.000000, bitrate: 61234 kb/s\n\
         \x20 Stream #0:0: Video: hevc (Main 10), yuv420p10le(tv, bt2020nc/bt2020/smpte2084), 3840x2160 (default)\n",
    );
    let languages = ["jpn", "rus", "rus", "ukr", "eng", "ger", "fre", "ita"];
    let mut index = 1;
    for lang in languages {
        text.push_str(&format!(
            "  Stream #0:{index}({lang}): Audio: eac3, 48000 Hz, 5.1(side), fltp, 640 kb/s\n\
             \x20   Metadata:\n\
             \x20     title           : {lang} dub\n"
        ));
        index += 1;
    }
    for lang in languages.iter().chain(languages.iter()) {
        text.push_str(&format!(
            "  Stream #0:{index}({lang}): Subtitle: ass\n\
             \x20   Metadata:\n\
             \x20     title           : {lang} full\n"
        ));
        index += 1;
    }
    for _ in 0..10 {
        text.push_str(&format!("  Stream #0:{index}: Attachment: ttf\n"));
        index += 1;
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let parser = ProbeParser::new().unwrap();
    let complex = probe_complex();
    let mut group = c.benchmark_group("probe_parse");

    group.throughput(Throughput::Bytes(PROBE_SIMPLE.len() as u64));
    group.bench_with_input(BenchmarkId::new("ffprobe", "simple"), &PROBE_SIMPLE, |b, text| {
        b.iter(|| parser.parse(black_box(text)));
    });

    group.throughput(Throughput::Bytes(complex.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("ffprobe", "complex"),
        complex.as_str(),
        |b, text| {
            b.iter(|| parser.parse(black_box(text)));
        },
    );

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let parser = ProbeParser::new().unwrap();
    let selector = StreamSelector::from_config(&SelectionConfig::default());
    let simple = parser.parse(PROBE_SIMPLE);
    let complex = parser.parse(&probe_complex());
    let mut group = c.benchmark_group("stream_select");

    group.bench_function("simple", |b| b.iter(|| selector.select(black_box(&simple))));
    group.bench_function("complex", |b| b.iter(|| selector.select(black_box(&complex))));

    group.finish();
}

fn bench_parser_construction(c: &mut Criterion) {
    c.bench_function("probe_parser_new", |b| b.iter(ProbeParser::new));
}

criterion_group!(benches, bench_parse, bench_select, bench_parser_construction);
criterion_main!(benches);
