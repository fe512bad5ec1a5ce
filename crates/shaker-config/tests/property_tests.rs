//! Property tests for configuration validation.

use proptest::prelude::*;
use shaker_config::{ConfigError, ShakerConfig};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Volumes inside [0, 1] always build.
    #[test]
    fn prop_in_range_volumes_build(volume in 0.0f32..=1.0, headroom in 0.0f32..=1.0) {
        let config = ShakerConfig::builder()
            .master_volume(volume)
            .output_headroom(headroom)
            .build();
        prop_assert!(config.is_ok());
    }

    /// Out-of-range master volume is rejected with the field named.
    #[test]
    fn prop_out_of_range_volume_rejected(volume in prop_oneof![-10.0f32..-0.001, 1.001f32..10.0]) {
        let result = ShakerConfig::builder().master_volume(volume).build();
        let is_master_volume = matches!(
            result,
            Err(ConfigError::InvalidValue { field: "master_volume", .. })
        );
        prop_assert!(is_master_volume);
    }

    /// Serialising a valid configuration and reading it back validates.
    #[test]
    fn prop_json_text_revalidates(volume in 0.0f32..=1.0) {
        let mut config = ShakerConfig::default();
        config.master_volume = volume;
        let json = serde_json::to_string(&config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let loaded = ShakerConfig::from_json_str(&json, std::path::Path::new("inline.json"))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!((loaded.master_volume - volume).abs() < 1e-6);
    }
}
