use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use watchpost::config::MonitorConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "WATCHPOST_CONFIG",
        "WATCHPOST_SOURCE",
        "WATCHPOST_LOG_DIR",
        "WATCHPOST_STATUS_PAGE",
        "WATCHPOST_MIN_AREA",
        "WATCHPOST_DIFF_THRESHOLD",
        "WATCHPOST_CONTINUE_ON_DEGENERATE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "url": "dir:///var/frames",
            "target_fps": 5,
            "width": 800,
            "height": 600
        },
        "motion": {
            "blur_kernel": 15,
            "diff_threshold": 40,
            "dilate_iterations": 3,
            "min_area": 800
        },
        "face": {
            "backend": "none",
            "confidence": 0.5
        },
        "logs": {
            "dir": "/var/log/watchpost",
            "text_log": "people.txt",
            "event_log": "events.csv"
        },
        "preview": {
            "path": "/tmp/watchpost.jpg",
            "every_n_ticks": 25,
            "window": true
        },
        "users": {
            "night_shift": "s3cret"
        },
        "continue_on_degenerate_start": true,
        "max_ticks": 1000,
        "poll_interval_ms": 5
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("WATCHPOST_CONFIG", file.path());
    std::env::set_var("WATCHPOST_SOURCE", "stub://lobby");
    std::env::set_var("WATCHPOST_MIN_AREA", "1200");
    std::env::set_var("WATCHPOST_CONTINUE_ON_DEGENERATE", "false");

    let cfg = MonitorConfig::load().expect("load config");

    assert_eq!(cfg.source.url, "stub://lobby");
    assert_eq!(cfg.source.target_fps, 5);
    assert_eq!((cfg.source.width, cfg.source.height), (800, 600));
    assert_eq!(cfg.motion.blur_kernel, 15);
    assert_eq!(cfg.motion.diff_threshold, 40);
    assert_eq!(cfg.motion.dilate_iterations, 3);
    assert_eq!(cfg.motion.min_area, 1200);
    assert_eq!(cfg.face.confidence, 0.5);
    assert_eq!(
        cfg.logs.event_log_path(),
        PathBuf::from("/var/log/watchpost/events.csv")
    );
    assert_eq!(
        cfg.logs.text_log_path(),
        PathBuf::from("/var/log/watchpost/people.txt")
    );
    assert_eq!(cfg.preview.path, Some(PathBuf::from("/tmp/watchpost.jpg")));
    assert_eq!(cfg.preview.every_n_ticks, 25);
    assert!(cfg.preview.window);
    assert!(!cfg.continue_on_degenerate_start);
    assert_eq!(cfg.max_ticks, Some(1000));
    assert!(cfg.credentials().verify("night_shift", "s3cret").is_ok());
    assert!(cfg.credentials().verify("admin", "1234").is_err());

    let settings = cfg.monitor_settings();
    assert_eq!(settings.motion.min_area, 1200);
    assert!(!settings.continue_on_degenerate_start);
    assert_eq!(settings.status_page, Some(PathBuf::from("status.html")));

    clear_env();
}

#[test]
fn defaults_without_any_configuration() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load().expect("load defaults");
    assert_eq!(cfg.source.url, "stub://camera");
    assert_eq!(cfg.motion.blur_kernel, 21);
    assert_eq!(cfg.motion.diff_threshold, 25);
    assert_eq!(cfg.motion.dilate_iterations, 2);
    assert_eq!(cfg.motion.min_area, 500);
    assert_eq!(cfg.face.backend, "none");
    assert!(!cfg.preview.window);
    assert!(cfg.continue_on_degenerate_start);
    assert!(cfg.credentials().verify("admin", "1234").is_ok());
}

#[test]
fn bad_env_values_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("WATCHPOST_DIFF_THRESHOLD", "256");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("WATCHPOST_MIN_AREA", "lots");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("WATCHPOST_CONTINUE_ON_DEGENERATE", "perhaps");
    assert!(MonitorConfig::load().is_err());
    clear_env();
}

#[test]
fn explicit_path_wins_over_environment() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"source": {"url": "stub://garage"}}"#)
        .expect("write config");
    std::env::set_var("WATCHPOST_CONFIG", "/nonexistent/watchpost.json");

    let cfg = MonitorConfig::load_from(Some(file.path())).expect("load explicit");
    assert_eq!(cfg.source.url, "stub://garage");
    assert!(MonitorConfig::load().is_err());

    clear_env();
}
