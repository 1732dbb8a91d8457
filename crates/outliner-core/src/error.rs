//! Error types of the core crate.

/// Errors that can occur when loading or checking [`ViewSettings`].
///
/// [`ViewSettings`]: crate::settings::ViewSettings
#[derive(Debug)]
pub enum SettingsError {
    /// I/O error reading a file.
    Io(std::io::Error),
    /// TOML parse error.
    #[cfg(feature = "settings-config")]
    Toml(toml::de::Error),
    /// TOML serialization error.
    #[cfg(feature = "settings-config")]
    TomlSer(toml::ser::Error),
    /// JSON parse error.
    #[cfg(feature = "settings-config")]
    Json(serde_json::Error),
    /// Validation errors.
    Validation(Vec<String>),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            #[cfg(feature = "settings-config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "settings-config")]
            Self::TomlSer(e) => write!(f, "TOML write error: {e}"),
            #[cfg(feature = "settings-config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => {
                write!(f, "validation errors: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            #[cfg(feature = "settings-config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "settings-config")]
            Self::TomlSer(e) => Some(e),
            #[cfg(feature = "settings-config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

impl From<std::io::Error> for SettingsError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
