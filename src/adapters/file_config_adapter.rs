//! INI file configuration adapter.

use crate::domain::error::TraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| TraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, TraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| TraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[oracle]
api_keys = KEY1, KEY2
cooldown_secs = 60

[storage]
root = /var/lib/tradeledger
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("storage", "root"),
            Some("/var/lib/tradeledger".to_string())
        );
        assert_eq!(adapter.get_int("oracle", "cooldown_secs", 0), 60);
    }

    #[test]
    fn get_list_splits_on_commas() {
        let adapter =
            FileConfigAdapter::from_string("[oracle]\napi_keys = KEY1, ,KEY2 ,\n").unwrap();
        assert_eq!(adapter.get_list("oracle", "api_keys"), vec!["KEY1", "KEY2"]);
        assert!(adapter.get_list("oracle", "missing").is_empty());
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[oracle]\napi_keys = K\n").unwrap();
        assert_eq!(adapter.get_string("oracle", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[oracle]\ntimeout_secs = soon\n").unwrap();
        assert_eq!(adapter.get_int("oracle", "timeout_secs", 30), 30);
        assert_eq!(adapter.get_int("oracle", "cooldown_secs", 60), 60);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[storage]\nroot = res\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("storage", "root"), Some("res".to_string()));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(TraderError::ConfigParse { .. })));
    }
}
