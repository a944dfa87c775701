// Tests for configuration loading

use std::fs;

use voice_demo::config::{ChatConfig, VoiceConfig};
use voice_demo::Config;

#[test]
fn test_defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing");

    let cfg = Config::load(path.to_str().unwrap()).unwrap();

    assert_eq!(cfg.service.http.port, 8080);
    assert_eq!(cfg.voice.input_sample_rate, 16000);
    assert_eq!(cfg.voice.output_sample_rate, 24000);
    assert_eq!(cfg.voice.frame_size, 4096);
    assert_eq!(cfg.voice.open_timeout_secs, VoiceConfig::default().open_timeout_secs);
    assert_eq!(cfg.chat.fallback_message, ChatConfig::default().fallback_message);
}

#[test]
fn test_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("demo.toml"),
        r#"
[service.http]
port = 9001

[voice]
persona = "scheduler"
open_timeout_secs = 5

[chat]
fallback_message = "Try again later."
"#,
    )
    .unwrap();

    let cfg = Config::load(dir.path().join("demo").to_str().unwrap()).unwrap();

    assert_eq!(cfg.service.http.port, 9001);
    assert_eq!(cfg.voice.persona, "scheduler");
    assert_eq!(cfg.voice.open_timeout().as_secs(), 5);
    assert_eq!(cfg.chat.fallback_message, "Try again later.");
    // Untouched keys keep their defaults
    assert_eq!(cfg.voice.input_sample_rate, 16000);
    assert_eq!(cfg.chat.model, ChatConfig::default().model);
}

#[test]
fn test_bundled_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/voice-demo");
    let cfg = Config::load(path).unwrap();

    assert_eq!(cfg.voice.persona, "receptionist");
    assert_eq!(cfg.chat.persona, "assistant");
}
