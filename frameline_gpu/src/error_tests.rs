//! Unit tests for error.rs

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkQueueSubmit failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkQueueSubmit failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_out_of_pool_memory_display() {
    assert_eq!(format!("{}", Error::OutOfPoolMemory), "Out of descriptor pool memory");
}

#[test]
fn test_protocol_violation_display() {
    let err = Error::ProtocolViolation("dispatch inside render pass".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Protocol violation"));
    assert!(display.contains("dispatch inside render pass"));
}

#[test]
fn test_unsupported_display() {
    let err = Error::Unsupported("linear blit on D32_FLOAT".to_string());
    assert!(format!("{}", err).contains("D32_FLOAT"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err1 = Error::InvalidResource("texture".to_string());
    let err2 = err1.clone();
    assert_eq!(err1, err2);
    assert_ne!(err1, Error::OutOfMemory);
}

#[test]
fn test_result_question_mark_propagation() {
    fn inner() -> Result<u32> {
        Err(Error::OutOfPoolMemory)
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }
    assert_eq!(outer(), Err(Error::OutOfPoolMemory));
}
