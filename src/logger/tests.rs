//! Tests for the logger module

use crate::logger::config::*;
use crate::logger::{LoggerError, init_logger, open_log_file};
use std::io::Write;
use std::path::PathBuf;

#[cfg(test)]
mod config_tests {
    use super::*;

    /// Helper function to create a test configuration
    fn create_test_config() -> LoggerConfig {
        LoggerConfig {
            console: ConsoleConfig {
                enabled: true,
                colored: false,
            },
            file: FileConfig {
                enabled: false,
                path: PathBuf::from("test.log"),
                append: true,
                format: LogFormat::Full,
            },
            level: "info".to_string(),
        }
    }

    #[test]
    fn test_default_config_creation() {
        let config = LoggerConfig::default();
        assert!(config.console.enabled);
        assert!(config.console.colored);
        assert!(!config.file.enabled);
        assert_eq!(config.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();
        assert!(config.validate().is_ok());

        config.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_valid_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error", "WARN"] {
            let config = LoggerConfig {
                level: level.to_string(),
                ..create_test_config()
            };
            assert!(config.validate().is_ok(), "Level should be valid: {}", level);
        }
    }

    #[test]
    fn test_both_outputs_disabled() {
        let mut config = create_test_config();
        config.console.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_enabled_requires_path() {
        let result = FileConfig::new(true, PathBuf::new(), true, LogFormat::Json);
        assert!(result.is_err());

        let disabled = FileConfig::new(false, PathBuf::new(), true, LogFormat::Json);
        assert!(disabled.is_ok());
    }

    #[test]
    fn test_log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Full);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("full".parse::<LogFormat>().unwrap(), LogFormat::Full);
        assert_eq!("COMPACT".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.as_str(), "compact");
    }
}

#[cfg(test)]
mod writer_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_parent_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("dir").join("app.log");
        let config = FileConfig::new(true, path.clone(), true, LogFormat::Json).unwrap();

        let mut file = open_log_file(&config).expect("Should open log file");
        writeln!(file, "first line").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_open_log_file_append_and_truncate() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("app.log");
        std::fs::write(&path, "existing\n").unwrap();

        let append = FileConfig::new(true, path.clone(), true, LogFormat::Full).unwrap();
        writeln!(open_log_file(&append).unwrap(), "appended").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "existing\nappended\n");

        let truncate = FileConfig::new(true, path.clone(), false, LogFormat::Full).unwrap();
        writeln!(open_log_file(&truncate).unwrap(), "fresh").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}

#[cfg(test)]
mod init_tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_rejected_before_init() {
        let config = LoggerConfig {
            level: "loud".to_string(),
            ..LoggerConfig::default()
        };
        assert!(init_logger(config).is_err());
    }

    #[test]
    fn test_second_init_returns_error() {
        let config = LoggerConfig {
            console: ConsoleConfig::new(true, false),
            ..LoggerConfig::default()
        };

        // The first call may already fail if another test installed a subscriber.
        let _ = init_logger(config.clone());
        let err = init_logger(config).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<LoggerError>(),
            Some(LoggerError::Init { .. })
        ));
    }
}
