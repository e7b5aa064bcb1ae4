//! INI file configuration adapter.

use crate::domain::error::SwingtraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SwingtraderError> {
        let mut config = Ini::new();
        config
            .load(&path)
            .map_err(|e| SwingtraderError::ConfigParse {
                file: path.as_ref().display().to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SwingtraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|e| SwingtraderError::ConfigParse {
                file: "<inline>".to_string(),
                reason: e,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[monitor]
symbols = NVDA, AMD, MSFT
benchmark = SPY

[risk]
max_risk_fraction_per_trade = 0.01
max_concurrent_positions = 5
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("monitor", "benchmark"),
            Some("SPY".to_string())
        );
        assert_eq!(adapter.get_int("risk", "max_concurrent_positions", 0), 5);
        assert_eq!(
            adapter.get_double("risk", "max_risk_fraction_per_trade", 0.0),
            0.01
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[monitor]\n").unwrap();
        assert_eq!(adapter.get_string("monitor", "benchmark"), None);
        assert_eq!(adapter.get_int("monitor", "tick_interval_secs", 300), 300);
        assert_eq!(adapter.get_double("risk", "missing", 0.5), 0.5);
        assert!(adapter.get_bool("position", "use_trailing_stop", true));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[risk]\nmax_concurrent_positions = many\n").unwrap();
        assert_eq!(adapter.get_int("risk", "max_concurrent_positions", 5), 5);
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[position]\na = true\nb = no\nc = 1\n").unwrap();
        assert!(adapter.get_bool("position", "a", false));
        assert!(!adapter.get_bool("position", "b", true));
        assert!(adapter.get_bool("position", "c", false));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[store]\npath = /var/lib/swingtrader/positions.json\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("store", "path"),
            Some("/var/lib/swingtrader/positions.json".to_string())
        );
    }

    #[test]
    fn from_file_errors_on_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/swingtrader.ini");
        assert!(matches!(
            result,
            Err(SwingtraderError::ConfigParse { .. })
        ));
    }
}
