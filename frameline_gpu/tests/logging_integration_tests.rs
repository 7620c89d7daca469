//! Integration tests for logging and degraded-mode reporting
//!
//! These tests swap the process-wide logger and are serialized.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use std::sync::{Arc, Mutex};

use frameline_gpu::frameline::device::{
    BufferDesc, BufferUsage, MemoryLocation, MockGraphicsDevice, SamplerDesc, TextureDesc,
    TextureFormat,
};
use frameline_gpu::frameline::log::{self, LogEntry, LogSeverity, Logger};
use frameline_gpu::frameline::transfer::TextureRegion;
use frameline_gpu::frameline::{RenderConfig, RenderContext};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn quiet_context() -> RenderContext<MockGraphicsDevice> {
    let config = RenderConfig {
        assert_on_protocol_violation: false,
        ..RenderConfig::default()
    };
    RenderContext::new(MockGraphicsDevice::new(), config).unwrap()
}

fn has_entry(entries: &[LogEntry], severity: LogSeverity, source: &str, needle: &str) -> bool {
    entries
        .iter()
        .any(|e| e.severity == severity && e.source == source && e.message.contains(needle))
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    log::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    log::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());

    let captured = entries.lock().unwrap().clone();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "test::module");
    assert_eq!(captured[1].message, "Test warning message");
    assert!(captured[0].file.is_none());

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_context_startup_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let ctx = quiet_context();
    drop(ctx);

    let captured = entries.lock().unwrap().clone();
    assert!(captured
        .iter()
        .any(|e| e.severity == LogSeverity::Info && e.source == "frameline::RenderContext"));

    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_protocol_violation_is_logged_with_location() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let mut ctx = quiet_context();
    let bound = ctx.bind_framebuffer(&Default::default());
    assert!(!bound);

    let captured = entries.lock().unwrap().clone();
    let violation = captured
        .iter()
        .find(|e| e.message.contains("without color or depth attachments"))
        .expect("violation logged");
    assert_eq!(violation.severity, LogSeverity::Error);
    assert!(violation.file.is_some());
    assert!(violation.line.is_some());

    drop(ctx);
    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_oversized_upload_logs_error() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let mut ctx = quiet_context();
    let buffer = ctx.create_buffer(BufferDesc {
        size: 16,
        usage: BufferUsage::UNIFORM,
        location: MemoryLocation::CpuToGpu,
    });
    assert!(!ctx.upload_buffer(buffer, 8, &[0; 16]));

    let captured = entries.lock().unwrap().clone();
    assert!(captured
        .iter()
        .any(|e| e.severity == LogSeverity::Error && e.source == "frameline::RenderContext"));

    drop(ctx);
    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_unsupported_mip_blit_is_a_warning() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let mut ctx = quiet_context();
    let mut desc = TextureDesc::tex2d(16, 16, TextureFormat::D32_FLOAT);
    desc.mip_levels = 5;
    let texture = ctx.create_texture(desc, SamplerDesc::default());
    assert!(!ctx.generate_mip_maps(texture));
    // the texture stays usable
    assert!(ctx.texture(texture).unwrap().is_ready());

    let captured = entries.lock().unwrap().clone();
    assert!(has_entry(&captured, LogSeverity::Warn, "frameline::RenderContext", "D32_FLOAT"));
    assert!(!captured.iter().any(|e| e.severity == LogSeverity::Error));

    drop(ctx);
    log::reset_logger();
}

#[test]
#[serial]
fn test_integration_download_of_unknown_region_logs_error() {
    let (test_logger, entries) = TestLogger::new();
    log::set_logger(test_logger);

    let mut ctx = quiet_context();
    let texture = ctx.create_texture(TextureDesc::tex2d(4, 4, TextureFormat::R8_UNORM), SamplerDesc::default());
    assert!(ctx.download_texture_sync(texture, &TextureRegion::rect(2, 2, 4, 4, 1)).is_none());

    let captured = entries.lock().unwrap().clone();
    assert!(captured.iter().any(|e| e.severity == LogSeverity::Error && e.message.contains("exceeds")));

    drop(ctx);
    log::reset_logger();
}
