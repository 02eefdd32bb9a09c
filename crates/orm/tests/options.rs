//! Integration tests for loading options from the environment.
//!
//! Everything runs in one test: the variables are process-wide.

#![allow(missing_docs)]

use tabula_orm::{ColumnMode, LikeMode, Options};

const VARS: [&str; 4] =
    ["TABULA_CHUNK_SIZE", "TABULA_COLUMN_MODE", "TABULA_LIKE_MODE", "TABULA_LIKE_ESCAPE"];

fn set(name: &str, value: &str) {
    // SAFETY: no other test in this binary reads or writes the environment.
    unsafe { std::env::set_var(name, value) };
}

#[test]
fn options_from_env() {
    set("TABULA_CHUNK_SIZE", "3");
    set("TABULA_COLUMN_MODE", "ignore");
    set("TABULA_LIKE_MODE", "contains");
    set("TABULA_LIKE_ESCAPE", "\\");

    let options = Options::from_env().unwrap();
    assert_eq!(options.chunk_size, 3);
    assert_eq!(options.column_mode, ColumnMode::Ignore);
    assert_eq!(options.like_mode, LikeMode::Contains);
    assert_eq!(options.like_escape, Some('\\'));
    assert_eq!(options.page_size, 100);

    set("TABULA_COLUMN_MODE", "strict");
    let err = Options::from_env().unwrap_err();
    assert_eq!(format!("{err:#}"), "TABULA_COLUMN_MODE: unknown column mode `strict`");
    set("TABULA_COLUMN_MODE", "off");

    set("TABULA_LIKE_ESCAPE", "ab");
    let err = Options::from_env().unwrap_err();
    assert_eq!(err.to_string(), "TABULA_LIKE_ESCAPE must be a single character");
    set("TABULA_LIKE_ESCAPE", "");

    set("TABULA_CHUNK_SIZE", "many");
    let err = Options::from_env().unwrap_err();
    assert_eq!(err.to_string(), "issue loading tabula options");

    set("TABULA_CHUNK_SIZE", "0");
    let err = Options::from_env().unwrap_err();
    assert_eq!(err.to_string(), "chunk size must be at least 1");

    for name in VARS {
        // SAFETY: as above.
        unsafe { std::env::remove_var(name) };
    }
    let options = Options::from_env().unwrap();
    assert_eq!(options.chunk_size, 800);
    assert_eq!(options.column_mode, ColumnMode::Throw);
}
