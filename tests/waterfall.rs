//! Waterfall policy tests with scripted engines.
//!
//! Every engine slot is filled with a [`Scripted`] engine that returns a
//! fixed reply and counts its calls, so the tests observe exactly which
//! steps ran and in what order without any external tool installed.

use doc2md::{
    ConversionProgressCallback, ConversionRequest, ConversionResult, ConvertError, Converter,
    ConverterConfig, Engine, EngineFault, EngineOutcome, EngineSet, Method, StagedInput,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const ODT: &str = "application/vnd.oasis.opendocument.text";
const MSWORD: &str = "application/msword";
const OCTET: &str = "application/octet-stream";

#[derive(Clone)]
enum Reply {
    Text(&'static str),
    /// An outcome built by hand that claims success whatever the text.
    Claimed(&'static str),
    Fault(&'static str),
}

struct Scripted {
    name: &'static str,
    reply: Reply,
    calls: AtomicUsize,
    /// Staged paths seen by this engine, with whether they existed then.
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl Scripted {
    fn new(name: &'static str, reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            name,
            reply,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Engine for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    fn attempt(&self, input: &StagedInput) -> Result<EngineOutcome, EngineFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((input.path().to_path_buf(), input.path().exists()));
        match self.reply {
            Reply::Text(t) => Ok(EngineOutcome::from_text(t)),
            Reply::Claimed(t) => Ok(EngineOutcome {
                text: t.to_string(),
                succeeded: true,
            }),
            Reply::Fault(detail) => Err(EngineFault::ToolFailed {
                tool: self.name.to_string(),
                detail: detail.to_string(),
            }),
        }
    }
}

struct Harness {
    primary: Arc<Scripted>,
    pandoc: Arc<Scripted>,
    antiword: Arc<Scripted>,
    ocr: Arc<Scripted>,
}

impl Harness {
    fn new(primary: Reply, pandoc: Reply, antiword: Reply, ocr: Reply) -> Self {
        Self {
            primary: Scripted::new("primary-mock", primary),
            pandoc: Scripted::new("pandoc-mock", pandoc),
            antiword: Scripted::new("antiword-mock", antiword),
            ocr: Scripted::new("ocr-mock", ocr),
        }
    }

    fn engines(&self) -> EngineSet {
        EngineSet {
            primary: self.primary.clone(),
            format_fallback: self.pandoc.clone(),
            legacy_word: self.antiword.clone(),
            image_text: self.ocr.clone(),
        }
    }

    fn converter(&self) -> Converter {
        Converter::with_engines(ConverterConfig::default(), self.engines())
    }

    fn converter_with(&self, config: ConverterConfig) -> Converter {
        Converter::with_engines(config, self.engines())
    }

    /// Convert with the default configuration.
    async fn convert(
        &self,
        content: &[u8],
        filename: &str,
        media_type: &str,
    ) -> Result<ConversionResult, ConvertError> {
        self.converter()
            .convert(content.to_vec(), filename, media_type)
            .await
    }

    fn calls(&self) -> [usize; 4] {
        [
            self.primary.calls(),
            self.pandoc.calls(),
            self.antiword.calls(),
            self.ocr.calls(),
        ]
    }
}

fn empty() -> Reply {
    Reply::Text("")
}

fn text(t: &'static str) -> Reply {
    Reply::Text(t)
}

fn request(content: &[u8], filename: &str, media_type: &str) -> ConversionRequest {
    ConversionRequest::new(content.to_vec(), filename, media_type)
}

// ── Preconditions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_content_runs_no_engine() {
    let h = Harness::new(text("x"), text("x"), text("x"), text("x"));
    for (name, mime) in [("a.docx", DOCX), ("scan.png", "image/png"), ("", "")] {
        let err = h.convert(&[], name, mime).await.unwrap_err();
        assert!(matches!(err, ConvertError::EmptyInput), "{name}: {err:?}");
        assert_eq!(err.status_code(), 400);
    }
    assert_eq!(h.calls(), [0, 0, 0, 0]);
}

#[tokio::test]
async fn oversized_content_runs_no_engine() {
    let h = Harness::new(text("x"), text("x"), text("x"), text("x"));
    let config = ConverterConfig::builder().max_file_size(8).build().unwrap();
    let err = h
        .converter_with(config)
        .convert(vec![0u8; 9], "a.docx", DOCX)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::TooLarge { size: 9, max: 8 }));
    assert_eq!(err.status_code(), 413);
    assert_eq!(h.calls(), [0, 0, 0, 0]);
}

// ── Primary ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn primary_success_ends_the_waterfall() {
    let h = Harness::new(
        text("# Report\n\nQ3 numbers"),
        text("pandoc"),
        empty(),
        empty(),
    );
    let result = h.convert(b"PK..", "report.docx", DOCX).await.unwrap();
    assert_eq!(result.method, Method::Primary);
    assert_eq!(result.markdown, "# Report\n\nQ3 numbers");
    assert_eq!(result.filename, "report.docx");
    assert_eq!(result.content_type, DOCX);
    assert_eq!(result.size_bytes, 4);
    assert_eq!(h.calls(), [1, 0, 0, 0]);
}

#[tokio::test]
async fn whitespace_only_primary_output_is_not_accepted() {
    let h = Harness::new(text(" \n\t "), text("from pandoc"), empty(), empty());
    let result = h.convert(b"data", "notes.odt", ODT).await.unwrap();
    assert_eq!(result.method, Method::FormatFallback);
    assert_eq!(result.markdown, "from pandoc");
    assert_eq!(h.calls(), [1, 1, 0, 0]);
}

#[tokio::test]
async fn blank_outcome_claiming_success_is_not_accepted() {
    let h = Harness::new(Reply::Claimed("  \n "), text("from pandoc"), empty(), empty());
    let result = h.convert(b"data", "notes.odt", ODT).await.unwrap();
    assert_eq!(result.method, Method::FormatFallback);
    assert_eq!(result.markdown, "from pandoc");

    let h = Harness::new(Reply::Claimed("   "), Reply::Claimed(""), empty(), empty());
    let err = h.convert(b"data", "notes.odt", ODT).await.unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed), "got {err:?}");
    assert_eq!(h.calls(), [1, 1, 0, 0]);
}

// ── Legacy Word ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn legacy_word_never_reaches_primary() {
    let h = Harness::new(
        text("primary"),
        text("pandoc text"),
        text("antiword"),
        empty(),
    );
    let result = h
        .convert(b"\xD0\xCF\x11\xE0", "memo.doc", MSWORD)
        .await
        .unwrap();
    assert_eq!(result.method, Method::FormatFallback);
    assert_eq!(result.markdown, "pandoc text");
    assert_eq!(h.calls(), [0, 1, 0, 0]);
}

#[tokio::test]
async fn legacy_word_detected_by_media_type_alone() {
    let h = Harness::new(text("primary"), empty(), text("antiword text"), empty());
    let result = h.convert(b"bytes", "upload", MSWORD).await.unwrap();
    assert_eq!(result.method, Method::LegacyWordFallback);
    assert_eq!(result.markdown, "antiword text");
    assert_eq!(h.calls(), [0, 1, 1, 0]);
}

#[tokio::test]
async fn legacy_word_falls_through_to_antiword() {
    let h = Harness::new(
        text("primary"),
        Reply::Fault("exit 64"),
        text("  plain memo  "),
        empty(),
    );
    let result = h.convert(b"bytes", "MEMO.DOC", OCTET).await.unwrap();
    assert_eq!(result.method, Method::LegacyWordFallback);
    assert_eq!(result.markdown, "plain memo");
    assert_eq!(h.calls(), [0, 1, 1, 0]);
}

#[tokio::test]
async fn legacy_word_primary_can_be_enabled() {
    let h = Harness::new(text("primary text"), text("pandoc"), empty(), empty());
    let config = ConverterConfig::builder()
        .primary_for_legacy_word(true)
        .build()
        .unwrap();
    let result = h
        .converter_with(config)
        .convert(b"bytes".to_vec(), "memo.doc", MSWORD)
        .await
        .unwrap();
    assert_eq!(result.method, Method::Primary);
    assert_eq!(h.calls(), [1, 0, 0, 0]);
}

#[tokio::test]
async fn antiword_only_runs_for_legacy_word() {
    let h = Harness::new(empty(), empty(), text("antiword"), empty());
    let err = h
        .convert(b"bytes", "a.rtf", "application/rtf")
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed));
    assert_eq!(err.status_code(), 422);
    assert_eq!(h.calls(), [1, 1, 0, 0]);
}

// ── Images ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ocr_overrides_short_image_text() {
    let h = Harness::new(
        text("  abc  "),
        text("pandoc"),
        empty(),
        text("Nota fiscal 123"),
    );
    let result = h.convert(&[1, 2, 3], "scan.png", "image/png").await.unwrap();
    assert_eq!(result.method, Method::ImageTextFallback);
    assert_eq!(result.markdown, "Nota fiscal 123");
    // primary accepted "abc", so pandoc is skipped but OCR still runs
    assert_eq!(h.calls(), [1, 0, 0, 1]);
}

#[tokio::test]
async fn ocr_runs_when_nothing_was_accepted() {
    let h = Harness::new(empty(), empty(), text("antiword"), text("x"));
    let result = h.convert(&[1, 2, 3], "photo.JPG", OCTET).await.unwrap();
    assert_eq!(result.method, Method::ImageTextFallback);
    assert_eq!(result.markdown, "x");
    assert_eq!(h.calls(), [1, 1, 0, 1]);
}

#[tokio::test]
async fn long_enough_image_text_is_not_overridden() {
    let h = Harness::new(text("0123456789"), empty(), empty(), text("ocr text wins?"));
    let result = h.convert(&[1], "scan.png", "image/png").await.unwrap();
    assert_eq!(result.method, Method::Primary);
    assert_eq!(result.markdown, "0123456789");
    assert_eq!(h.calls(), [1, 0, 0, 0]);
}

#[tokio::test]
async fn threshold_counts_characters_not_bytes() {
    // nine characters, eighteen bytes
    let h = Harness::new(text("ááááááááá"), empty(), empty(), text("ocr"));
    let result = h.convert(&[1], "scan.png", "image/png").await.unwrap();
    assert_eq!(result.method, Method::ImageTextFallback);
}

#[tokio::test]
async fn empty_ocr_keeps_the_short_result() {
    let h = Harness::new(text("abc"), empty(), empty(), text("   "));
    let result = h.convert(&[1], "scan.png", "image/png").await.unwrap();
    assert_eq!(result.method, Method::Primary);
    assert_eq!(result.markdown, "abc");
}

#[tokio::test]
async fn image_media_type_alone_makes_an_image() {
    let h = Harness::new(empty(), empty(), empty(), text("texto reconhecido"));
    let result = h.convert(&[1], "upload", "image/webp").await.unwrap();
    assert_eq!(result.method, Method::ImageTextFallback);
}

#[tokio::test]
async fn gif_can_be_excluded_from_the_image_set() {
    let h = Harness::new(empty(), empty(), empty(), text("ocr"));
    let config = ConverterConfig::builder()
        .image_extensions([".png", ".jpg", ".jpeg", ".tiff", ".bmp"])
        .build()
        .unwrap();
    let err = h
        .converter_with(config)
        .convert(vec![1], "anim.gif", OCTET)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed));
    assert_eq!(h.calls(), [1, 1, 0, 0]);
}

// ── Faults ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn primary_fault_is_contained_when_a_fallback_succeeds() {
    let h = Harness::new(Reply::Fault("corrupt zip"), text("recovered"), empty(), empty());
    let result = h.convert(b"PK", "report.docx", DOCX).await.unwrap();
    assert_eq!(result.method, Method::FormatFallback);
    assert_eq!(result.markdown, "recovered");
}

#[tokio::test]
async fn clean_fallback_after_a_fault_is_all_engines_failed() {
    let h = Harness::new(Reply::Fault("corrupt zip"), empty(), empty(), empty());
    let err = h.convert(b"PK", "report.docx", DOCX).await.unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed), "got {err:?}");
    assert_eq!(err.status_code(), 422);
    assert_eq!(h.calls(), [1, 1, 0, 0]);
}

#[tokio::test]
async fn fault_in_the_last_step_surfaces_for_non_image() {
    let h = Harness::new(empty(), Reply::Fault("pandoc crashed"), empty(), empty());
    let err = h.convert(b"PK", "report.docx", DOCX).await.unwrap_err();
    match err {
        ConvertError::ConversionFaulted { method, ref detail } => {
            assert_eq!(method, Method::FormatFallback);
            assert!(detail.contains("pandoc crashed"), "got: {detail}");
        }
        ref other => panic!("expected ConversionFaulted, got {other:?}"),
    }
    assert_eq!(err.status_code(), 500);
    assert_eq!(h.calls(), [1, 1, 0, 0]);
}

#[tokio::test]
async fn legacy_word_fault_surfaces_only_from_the_last_step() {
    let h = Harness::new(empty(), Reply::Fault("exit 64"), empty(), empty());
    let err = h.convert(b"bytes", "memo.doc", MSWORD).await.unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed), "got {err:?}");
    assert_eq!(h.calls(), [0, 1, 1, 0]);

    let h = Harness::new(empty(), empty(), Reply::Fault("antiword crashed"), empty());
    let err = h.convert(b"bytes", "memo.doc", MSWORD).await.unwrap_err();
    assert!(
        matches!(
            err,
            ConvertError::ConversionFaulted {
                method: Method::LegacyWordFallback,
                ..
            }
        ),
        "got {err:?}"
    );
}

#[tokio::test]
async fn image_faults_fall_through_to_ocr() {
    let h = Harness::new(
        Reply::Fault("decoder crashed"),
        Reply::Fault("pandoc missing"),
        empty(),
        text("scanned words"),
    );
    let result = h.convert(&[1], "scan.png", "image/png").await.unwrap();
    assert_eq!(result.method, Method::ImageTextFallback);
    assert_eq!(h.calls(), [1, 1, 0, 1]);
}

#[tokio::test]
async fn image_faults_are_never_surfaced() {
    let h = Harness::new(
        Reply::Fault("decoder crashed"),
        Reply::Fault("pandoc missing"),
        empty(),
        Reply::Fault("tesseract missing"),
    );
    let err = h.convert(&[1], "scan.png", "image/png").await.unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed), "got {err:?}");
}

#[tokio::test]
async fn unsupported_format_without_faults_is_all_engines_failed() {
    let h = Harness::new(empty(), empty(), empty(), empty());
    let err = h.convert(b"???", "blob.bin", OCTET).await.unwrap_err();
    assert!(matches!(err, ConvertError::AllEnginesFailed));
    assert_eq!(err.kind(), "all_engines_failed");
}

// ── Resources & repeatability ────────────────────────────────────────────────

#[tokio::test]
async fn staged_file_is_removed_on_success_and_failure() {
    let ok = Harness::new(text("fine"), empty(), empty(), empty());
    ok.convert(b"abc", "a.docx", DOCX).await.unwrap();

    let bad = Harness::new(Reply::Fault("boom"), Reply::Fault("boom"), empty(), empty());
    bad.convert(b"abc", "a.docx", DOCX).await.unwrap_err();

    for engine in [&ok.primary, &bad.primary, &bad.pandoc] {
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (path, existed) = &seen[0];
        assert!(*existed, "staged file should exist during the attempt");
        assert!(!path.exists(), "staged file {} was not removed", path.display());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("docx"));
    }
}

#[tokio::test]
async fn every_engine_sees_the_same_staged_file() {
    let h = Harness::new(empty(), empty(), text("memo"), empty());
    h.convert(b"x", "memo.doc", MSWORD).await.unwrap();
    let pandoc_path = h.pandoc.seen.lock().unwrap()[0].0.clone();
    let antiword_path = h.antiword.seen.lock().unwrap()[0].0.clone();
    assert_eq!(pandoc_path, antiword_path);
}

#[tokio::test]
async fn repeated_conversion_is_idempotent() {
    let h = Harness::new(text("ab"), empty(), empty(), text("recognised text"));
    let c = h.converter();
    let first = c.convert(vec![7, 7], "scan.png", "image/png").await.unwrap();
    let second = c.convert(vec![7, 7], "scan.png", "image/png").await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_use_private_temp_files() {
    let h = Harness::new(text("concurrent"), empty(), empty(), empty());
    let c = h.converter();
    let tasks: Vec<_> = (0..16u8)
        .map(|i| {
            let c = c.clone();
            let name = format!("doc{i}.docx");
            tokio::spawn(async move { c.convert(vec![i + 1], name, DOCX).await })
        })
        .collect();
    for t in tasks {
        assert_eq!(t.await.unwrap().unwrap().method, Method::Primary);
    }
    let seen = h.primary.seen.lock().unwrap();
    let mut paths: Vec<_> = seen.iter().map(|(p, _)| p.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 16);
}

#[test]
fn blocking_entry_point_matches_async_policy() {
    let h = Harness::new(empty(), text("pandoc markdown"), empty(), empty());
    let result = h
        .converter()
        .convert_blocking(&request(b"{\\rtf1}", "letter.rtf", "application/rtf"))
        .unwrap();
    assert_eq!(result.method, Method::FormatFallback);
}

#[test]
fn async_api_from_synchronous_code() {
    let h = Harness::new(text("sync caller"), empty(), empty(), empty());
    let c = h.converter();
    let result = tokio_test::block_on(c.convert(b"abc".to_vec(), "a.docx", DOCX)).unwrap();
    assert_eq!(result.markdown, "sync caller");
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ConversionProgressCallback for Recorder {
    fn on_conversion_start(&self, filename: &str, size_bytes: usize) {
        self.record(format!("start {filename} {size_bytes}"));
    }

    fn on_attempt_start(&self, method: Method, engine: &str) {
        self.record(format!("try {method} {engine}"));
    }

    fn on_attempt_complete(&self, method: Method, _engine: &str, text_len: usize) {
        self.record(format!("done {method} {text_len}"));
    }

    fn on_attempt_failed(&self, method: Method, _engine: &str, _error: &str) {
        self.record(format!("fail {method}"));
    }

    fn on_conversion_complete(&self, method: Option<Method>) {
        let tag = method.map_or("none".to_string(), |m| m.to_string());
        self.record(format!("complete {tag}"));
    }
}

fn recording_config(recorder: &Arc<Recorder>) -> ConverterConfig {
    ConverterConfig::builder()
        .progress_callback(recorder.clone() as Arc<dyn ConversionProgressCallback>)
        .build()
        .unwrap()
}

#[tokio::test]
async fn progress_events_follow_the_waterfall() {
    let recorder = Arc::new(Recorder::default());
    let h = Harness::new(Reply::Fault("bad"), text(" ok "), empty(), empty());
    h.converter_with(recording_config(&recorder))
        .convert(b"abc".to_vec(), "a.docx", DOCX)
        .await
        .unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start a.docx 3",
            "try primary primary-mock",
            "fail primary",
            "try format-fallback pandoc-mock",
            "done format-fallback 2",
            "complete format-fallback",
        ]
    );
}

#[tokio::test]
async fn precondition_failures_emit_no_events() {
    let recorder = Arc::new(Recorder::default());
    let h = Harness::new(empty(), empty(), empty(), empty());
    h.converter_with(recording_config(&recorder))
        .convert(Vec::new(), "a.docx", DOCX)
        .await
        .unwrap_err();
    assert!(recorder.events.lock().unwrap().is_empty());
}
