use std::str::FromStr;

use anyhow::{Context, anyhow, bail};
use fromenv::FromEnv;

use crate::value::LikeMode;

/// What to do when a predicate names a column the entity does not declare.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColumnMode {
    /// Replace the predicate with `1=1`.
    Ignore,
    /// Fail with [`crate::Error::UnknownColumn`].
    #[default]
    Throw,
    /// Skip the check.
    Off,
}

impl FromStr for ColumnMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "throw" => Ok(Self::Throw),
            "off" => Ok(Self::Off),
            _ => Err(anyhow!("unknown column mode `{s}`")),
        }
    }
}

/// Compilation settings shared by the statement builders and the DAO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Maximum number of values in one `IN` list.
    pub chunk_size: usize,

    /// Page size used when paging is requested without a limit.
    pub page_size: u64,

    /// Column whitelist behaviour.
    pub column_mode: ColumnMode,

    /// Default LIKE pattern mode.
    pub like_mode: LikeMode,

    /// LIKE escape character.
    pub like_escape: Option<char>,

    /// Column ordered by when paging without an explicit order.
    pub default_order: String,

    /// Whether inserts write the identifier column.
    pub insert_identifier: bool,

    /// Maximum rows per `INSERT ... VALUES` statement.
    pub max_insert_rows: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            page_size: 100,
            column_mode: ColumnMode::Throw,
            like_mode: LikeMode::Raw,
            like_escape: None,
            default_order: "created_at".to_string(),
            insert_identifier: false,
            max_insert_rows: 1000,
        }
    }
}

/// Options as read from `TABULA_*` environment variables.
///
/// Values are kept as loaded; [`Options::try_from`] parses the modes and
/// checks ranges.
#[derive(Debug, Clone, FromEnv)]
pub struct EnvOptions {
    /// `TABULA_CHUNK_SIZE`
    #[env(from = "TABULA_CHUNK_SIZE", default = "800")]
    pub chunk_size: usize,
    /// `TABULA_PAGE_SIZE`
    #[env(from = "TABULA_PAGE_SIZE", default = "100")]
    pub page_size: u64,
    /// `TABULA_COLUMN_MODE`: `ignore`, `throw` or `off`.
    #[env(from = "TABULA_COLUMN_MODE", default = "throw")]
    pub column_mode: String,
    /// `TABULA_LIKE_MODE`
    #[env(from = "TABULA_LIKE_MODE", default = "raw")]
    pub like_mode: String,
    /// `TABULA_LIKE_ESCAPE`: empty, or a single character.
    #[env(from = "TABULA_LIKE_ESCAPE", default = "")]
    pub like_escape: String,
    /// `TABULA_DEFAULT_ORDER`
    #[env(from = "TABULA_DEFAULT_ORDER", default = "created_at")]
    pub default_order: String,
    /// `TABULA_INSERT_IDENTIFIER`
    #[env(from = "TABULA_INSERT_IDENTIFIER", default = "false")]
    pub insert_identifier: bool,
    /// `TABULA_MAX_INSERT_ROWS`
    #[env(from = "TABULA_MAX_INSERT_ROWS", default = "1000")]
    pub max_insert_rows: usize,
}

impl TryFrom<EnvOptions> for Options {
    type Error = anyhow::Error;

    fn try_from(env: EnvOptions) -> anyhow::Result<Self> {
        let mut escape = env.like_escape.chars();
        let like_escape = match (escape.next(), escape.next()) {
            (None, _) => None,
            (Some(ch), None) => Some(ch),
            (Some(_), Some(_)) => bail!("TABULA_LIKE_ESCAPE must be a single character"),
        };

        let options = Self {
            chunk_size: env.chunk_size,
            page_size: env.page_size,
            column_mode: env.column_mode.parse().context("TABULA_COLUMN_MODE")?,
            like_mode: env.like_mode.parse().context("TABULA_LIKE_MODE")?,
            like_escape,
            default_order: env.default_order,
            insert_identifier: env.insert_identifier,
            max_insert_rows: env.max_insert_rows,
        };
        options.check()?;
        Ok(options)
    }
}

impl Options {
    /// Load options from `TABULA_*` environment variables, falling back to
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable cannot be parsed or a value is out of
    /// range.
    pub fn from_env() -> anyhow::Result<Self> {
        let env = EnvOptions::from_env().finalize().context("issue loading tabula options")?;
        Self::try_from(env)
    }

    /// Check option ranges.
    ///
    /// # Errors
    ///
    /// Returns an error when a size is zero or the escape character is a
    /// quote.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be at least 1");
        }
        if self.max_insert_rows == 0 {
            bail!("max insert rows must be at least 1");
        }
        if self.like_escape == Some('\'') {
            bail!("LIKE escape character cannot be a single quote");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = Options::default();
        assert_eq!(options.chunk_size, 800);
        assert_eq!(options.page_size, 100);
        assert_eq!(options.column_mode, ColumnMode::Throw);
        assert_eq!(options.default_order, "created_at");
        options.check().unwrap();
    }

    #[test]
    fn check_ranges() {
        let options = Options {
            chunk_size: 0,
            ..Options::default()
        };
        options.check().unwrap_err();

        let options = Options {
            like_escape: Some('\''),
            ..Options::default()
        };
        options.check().unwrap_err();
    }

    fn env() -> EnvOptions {
        EnvOptions {
            chunk_size: 800,
            page_size: 100,
            column_mode: "throw".to_string(),
            like_mode: "raw".to_string(),
            like_escape: String::new(),
            default_order: "created_at".to_string(),
            insert_identifier: false,
            max_insert_rows: 1000,
        }
    }

    #[test]
    fn env_overrides() {
        let options = Options::try_from(EnvOptions {
            chunk_size: 3,
            column_mode: "ignore".to_string(),
            like_mode: "startsWith".to_string(),
            like_escape: "\\".to_string(),
            insert_identifier: true,
            ..env()
        })
        .unwrap();
        assert_eq!(options.chunk_size, 3);
        assert_eq!(options.column_mode, ColumnMode::Ignore);
        assert_eq!(options.like_mode, LikeMode::StartsWith);
        assert_eq!(options.like_escape, Some('\\'));
        assert!(options.insert_identifier);
        assert_eq!(options.max_insert_rows, 1000);

        let options = Options::try_from(env()).unwrap();
        assert_eq!(options.column_mode, ColumnMode::Throw);
        assert_eq!(options.like_escape, None);
    }

    #[test]
    fn env_errors() {
        let err = Options::try_from(EnvOptions {
            column_mode: "strict".to_string(),
            ..env()
        })
        .unwrap_err();
        assert_eq!(format!("{err:#}"), "TABULA_COLUMN_MODE: unknown column mode `strict`");

        let err = Options::try_from(EnvOptions {
            like_mode: "fuzzy".to_string(),
            ..env()
        })
        .unwrap_err();
        assert!(format!("{err:#}").starts_with("TABULA_LIKE_MODE: "));

        let err = Options::try_from(EnvOptions {
            like_escape: "ab".to_string(),
            ..env()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "TABULA_LIKE_ESCAPE must be a single character");

        let err = Options::try_from(EnvOptions {
            chunk_size: 0,
            ..env()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "chunk size must be at least 1");
    }

    #[test]
    fn parse_column_mode() {
        assert_eq!("IGNORE".parse::<ColumnMode>().unwrap(), ColumnMode::Ignore);
        assert_eq!("off".parse::<ColumnMode>().unwrap(), ColumnMode::Off);
        "strict".parse::<ColumnMode>().unwrap_err();
    }
}
