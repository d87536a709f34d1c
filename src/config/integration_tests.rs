// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::{
    load_and_validate_config, load_sequence, NotificationConfig, RuntimeBuilder, StorageConfig,
};
use crate::compiler::active_points;
use crate::sequence::ChannelId;

/// Test that the demo configuration loads and validates
#[test]
fn test_demo_yaml_loading() {
    let config = load_and_validate_config("configs/demo.yaml").unwrap();

    assert_eq!(config.scheduler.max_iterations, Some(2));
    assert!(!config.scheduler.shuffle);
    assert_eq!(config.storage, StorageConfig::Memory);
    assert_eq!(config.notifications, NotificationConfig::Log);
    assert_eq!(config.output_systems.len(), 2);
    assert_eq!(config.output_systems[0].name, "timing");
    assert_eq!(config.output_systems[1].completion_delay_ms(), 500);
    assert!(config.sequence.ends_with("configs/sequence.yaml"));
}

/// Test building the runtime from the demo configuration
#[test]
fn test_build_runtime_from_yaml() {
    let config = load_and_validate_config("configs/demo.yaml").unwrap();
    let runtime = RuntimeBuilder::from_config(&config).unwrap();

    assert_eq!(
        runtime.hardware.systems().collect::<Vec<_>>(),
        vec!["timing", "coils"]
    );
    assert_eq!(runtime.hardware.owner_of(&ChannelId::new("ao0", 1)), Some("coils"));
    assert_eq!(runtime.hardware.owner_of(&ChannelId::new("dio0", 2)), Some("timing"));
    assert_eq!(runtime.hardware.owner_of(&ChannelId::new("dio1", 0)), None);
    assert_eq!(runtime.options, config.scheduler);
}

/// Test that the demo sequence loads against the configured channels and compiles cleanly
#[test]
fn test_demo_sequence_compiles() {
    let config = load_and_validate_config("configs/demo.yaml").unwrap();
    let runtime = RuntimeBuilder::from_config(&config).unwrap();
    let sequence = load_sequence(&config, &runtime.hardware).unwrap();

    assert!(sequence.variables.evaluation().is_complete());
    assert_eq!(sequence.variables.value("b_ramp"), Some(5.0));
    assert_eq!(sequence.playlists.active_name(), Some("main"));

    let timeline = active_points(&sequence).unwrap();
    assert!(timeline.is_complete());
    // load (t_load + 10 ms ramp = 210) + gap t_tof (1) + image (1.5)
    assert!((timeline.length - 212.5).abs() < 1e-9);
    assert_eq!(timeline.channels.len(), 5);
}
