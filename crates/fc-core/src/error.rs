//! Configuration errors.
//!
//! [`ConfigError`] is produced while reading a `filecast.json` file and when
//! [`Config::validate`](crate::Config::validate) rejects a setting.

use camino::Utf8PathBuf;

/// Why a configuration could not be loaded or used.
///
/// # Examples
///
/// ```
/// use fc_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/srv/dashboard/dist"));
/// assert!(error.to_string().contains("/srv/dashboard/dist"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `server.static_dir` names a directory that is not there.
    #[error("static bundle directory not found: {0}")]
    MissingDirectory(Utf8PathBuf),

    /// A setting is out of range or otherwise unusable.
    #[error("bad value for '{option}': {reason}")]
    InvalidOption {
        /// Dotted key of the setting, e.g. `hub.connection_buffer`.
        option: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for [`Config`](crate::Config).
    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_static_dir_names_the_path() {
        let error = ConfigError::MissingDirectory(Utf8PathBuf::from("/srv/dashboard/dist"));
        assert_eq!(
            error.to_string(),
            "static bundle directory not found: /srv/dashboard/dist"
        );
    }

    #[test]
    fn test_bad_value_names_the_key() {
        let error = ConfigError::InvalidOption {
            option: "hub.connection_buffer".to_owned(),
            reason: "must be greater than zero".to_owned(),
        };
        assert_eq!(
            error.to_string(),
            "bad value for 'hub.connection_buffer': must be greater than zero"
        );
    }

    #[test]
    fn test_malformed_file() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = ConfigError::from(parse);
        assert!(error.to_string().starts_with("malformed config file"));
    }
}
