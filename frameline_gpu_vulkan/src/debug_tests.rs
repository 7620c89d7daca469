use super::*;
use serial_test::serial;

#[test]
fn test_severity_masks() {
    assert_eq!(ValidationSeverity::ErrorsOnly.to_vk(), vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
    let mask = ValidationSeverity::ErrorsAndWarnings.to_vk();
    assert!(mask.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING));
    assert!(!mask.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO));
    assert!(ValidationSeverity::All.to_vk().contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

#[test]
fn test_type_labels() {
    assert_eq!(type_label(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION), "Validation");
    assert_eq!(type_label(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE), "Performance");
    assert_eq!(type_label(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL), "General");
}

#[test]
#[serial]
fn test_stats_count_by_severity_and_reset_on_init() {
    init_debug_config(Config { severity: ValidationSeverity::All, panic_on_error: false });

    VALIDATION_STATS.record(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);
    VALIDATION_STATS.record(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING);
    VALIDATION_STATS.record(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING);
    VALIDATION_STATS.record(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE);

    let stats = get_validation_stats();
    assert_eq!(stats, ValidationStats { errors: 1, warnings: 2, info: 0, verbose: 1 });
    assert_eq!(stats.total(), 4);

    init_debug_config(Config { severity: ValidationSeverity::All, panic_on_error: false });
    assert_eq!(get_validation_stats().total(), 0);
    cleanup_debug_config();
}

#[test]
#[serial]
fn test_repeated_messages_are_counted() {
    init_debug_config(Config { severity: ValidationSeverity::ErrorsOnly, panic_on_error: false });

    assert_eq!(track_message("VUID-1"), 1);
    assert_eq!(track_message("VUID-2"), 1);
    assert_eq!(track_message("VUID-1"), 2);

    cleanup_debug_config();
}
