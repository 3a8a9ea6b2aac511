//! Process-wide configuration installation
//!
//! Lives in its own test binary: the configuration and kernel are chosen once
//! per process, so this must run before any codec call.

use tscodec::compression::metrics::global_metrics;
use tscodec::compression::simd::kernel;
use tscodec::{config, decode_integers, encode_integers, CodecConfig, Error, KernelPreference};

#[test]
fn installed_configuration_drives_codecs() {
    let installed = CodecConfig {
        kernel: KernelPreference::Generic,
        max_decode_values: 100,
        metrics_enabled: false,
    };
    tscodec::init(installed.clone()).unwrap();
    assert_eq!(config::current(), &installed);

    // first installation wins
    assert!(matches!(
        tscodec::init(CodecConfig::default()),
        Err(Error::Configuration(_))
    ));

    assert_eq!(kernel().name(), "generic");

    // decode limit applies to the free functions
    let within = encode_integers(&mut vec![1i64; 100]);
    let beyond = encode_integers(&mut vec![1i64; 101]);
    let mut dst = Vec::new();
    decode_integers(&within, &mut dst).unwrap();
    assert_eq!(dst.len(), 100);
    assert!(decode_integers(&beyond, &mut dst).is_err());
    assert!(dst.is_empty());

    // metrics are disabled
    let snapshot = global_metrics().snapshot();
    assert_eq!(snapshot.integer.encode_count(), 0);
    assert_eq!(snapshot.integer.decode_errors, 0);
}

#[test]
fn invalid_configuration_is_refused() {
    let invalid = CodecConfig {
        max_decode_values: 0,
        ..CodecConfig::default()
    };
    assert!(invalid.validate().is_err());
}
