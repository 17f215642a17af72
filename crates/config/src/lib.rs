//! Configuration for gudang.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. built-in defaults ([`Config::default()`]),
//! 2. the user config file (`config.toml` in the platform config directory),
//! 3. `gudang.toml` in the working directory,
//! 4. a config file passed explicitly (e.g. `--config`),
//! 5. environment variables prefixed with `GUDANG_` (`GUDANG_STORAGE_DIR`,
//!    `GUDANG_DATABASE`, ...).
//!
//! Relative paths are resolved against the working directory once
//! everything is merged.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "gudang.toml";
/// Prefix of environment variables overriding config values.
pub const ENV_PREFIX: &str = "GUDANG_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the uploaded video files.
    pub storage_dir: PathBuf,
    /// SQLite database holding video metadata.
    pub database: PathBuf,
    /// Base of the (decorative) streaming URLs shown next to each video.
    pub stream_base_url: String,
    /// File extensions accepted for upload, without the leading dot.
    pub extensions: Vec<String>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("videos"),
            database: PathBuf::from("videos.db"),
            stream_base_url: "https://gudangvideo.streamlit.app".to_string(),
            extensions: ["mp4", "avi", "mov", "mkv"].map(String::from).to_vec(),
        }
    }
}

impl Config {
    /// Load, resolve and validate the configuration from every source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().or_raise(|| ErrorKind::WorkingDirectory)?;
        let explicit = explicit.map(|path| cwd.join(path));
        if let Some(path) = &explicit
            && !path.is_file()
        {
            exn::bail!(ErrorKind::Missing(path.clone()));
        }
        let config = Self::from_figment(Self::figment(explicit.as_deref()))?.resolve(&cwd);
        tracing::debug!(?config, "Loaded configuration");
        Ok(config)
    }

    /// The merged sources, before extraction.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = Self::user_config_file() {
            figment = figment.merge(Toml::file_exact(user));
        }
        figment = figment.merge(Toml::file_exact(LOCAL_CONFIG_FILE));
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract and validate a config from an arbitrary figment. Paths are
    /// left as they are.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// `config.toml` inside the platform's config directory for gudang.
    pub fn user_config_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gudang").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Make relative paths absolute by joining them onto `base`.
    pub fn resolve(mut self, base: &Path) -> Self {
        self.storage_dir = base.join(&self.storage_dir);
        self.database = base.join(&self.database);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_dir.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("storage_dir is empty".to_string()));
        }
        if self.database.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Invalid("database is empty".to_string()));
        }
        if self.stream_base_url.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("stream_base_url is empty".to_string()));
        }
        if self.extensions.is_empty() {
            exn::bail!(ErrorKind::Invalid("no upload extensions configured".to_string()));
        }
        for ext in &self.extensions {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                exn::bail!(ErrorKind::Invalid(format!("invalid extension {ext:?} (expected e.g. \"mp4\")")));
            }
        }
        Ok(())
    }

    /// Whether `name` ends with one of the accepted extensions (case
    /// insensitive).
    pub fn is_allowed_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
    }

    /// Streaming URL shown for a stored video. Nothing serves it.
    pub fn stream_url(&self, filename: &str) -> String {
        format!("{}/videos/{filename}", self.stream_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::from_figment(Figment::from(Serialized::defaults(Config::default()))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_local_file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_FILE,
                r#"
                    storage_dir = "media"
                    extensions = ["mp4", "webm"]
                "#,
            )?;
            jail.set_env("GUDANG_STREAM_BASE_URL", "https://videos.example.com/");
            let config = Config::load(None).unwrap();
            assert!(config.storage_dir.is_absolute());
            assert!(config.storage_dir.ends_with("media"));
            assert!(config.database.ends_with("videos.db"));
            assert_eq!(config.extensions, ["mp4", "webm"]);
            assert_eq!(config.stream_url("clip.mp4"), "https://videos.example.com/videos/clip.mp4");
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_beats_local_file() {
        Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG_FILE, r#"database = "local.db""#)?;
            jail.create_file("other.toml", r#"database = "/srv/gudang/videos.db""#)?;
            let config = Config::load(Some(Path::new("other.toml"))).unwrap();
            assert_eq!(config.database, Path::new("/srv/gudang/videos.db"));
            Ok(())
        });
    }

    #[test]
    fn test_local_file_in_parent_directory_is_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG_FILE, r#"storage_dir = "/from/parent""#)?;
            jail.create_dir("child")?;
            jail.change_dir("child")?;
            let config = Config::load(None).unwrap();
            assert!(config.storage_dir.ends_with("child/videos"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Missing(_)));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG_FILE, r#"extensions = []"#)?;
            let err = Config::load(None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case(vec![".mp4"])]
    #[case(vec![""])]
    #[case(vec!["a/b"])]
    fn test_bad_extensions(#[case] extensions: Vec<&str>) {
        let config = Config {
            extensions: extensions.into_iter().map(String::from).collect(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[rstest]
    #[case("clip.mp4", true)]
    #[case("CLIP.MKV", true)]
    #[case("archive.tar.mov", true)]
    #[case("notes.txt", false)]
    #[case("mp4", false)]
    #[case("clip.", false)]
    fn test_is_allowed_extension(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(Config::default().is_allowed_extension(name), expected);
    }

    #[test]
    fn test_resolve_keeps_absolute_paths() {
        let config = Config {
            database: PathBuf::from("/var/lib/gudang/videos.db"),
            ..Config::default()
        }
        .resolve(Path::new("/home/op"));
        assert_eq!(config.database, Path::new("/var/lib/gudang/videos.db"));
        assert_eq!(config.storage_dir, Path::new("/home/op/videos"));
    }

    #[test]
    fn test_stream_url() {
        assert_eq!(Config::default().stream_url("clip.mp4"), "https://gudangvideo.streamlit.app/videos/clip.mp4");
    }
}
