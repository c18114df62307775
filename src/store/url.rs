use std::path::PathBuf;

use crate::error::{Error, Result};

/// Where a SQLite database lives, as named by a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

/// Parses a database connection string.
///
/// Accepts `sqlite::memory:`, `sqlite://<path>`, the three- and four-slash forms
/// (`sqlite:///relative.db`, `sqlite:////abs/path.db`), or a bare filesystem path.
pub fn parse_database_url(url: &str) -> Result<DatabaseLocation> {
    let url = url.trim();

    if url.is_empty() {
        return Err(Error::Config("database url cannot be empty".to_string()));
    }

    if matches!(url, ":memory:" | "sqlite::memory:" | "sqlite://:memory:") {
        return Ok(DatabaseLocation::Memory);
    }

    let path = if let Some(rest) = url.strip_prefix("sqlite:///") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if let Some((scheme, _)) = url.split_once("://") {
        return Err(Error::Config(format!(
            "unsupported database scheme '{scheme}', only sqlite is available"
        )));
    } else {
        url
    };

    if path.is_empty() {
        return Err(Error::Config(format!("database url '{url}' has no path")));
    }

    Ok(DatabaseLocation::File(PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_urls() {
        assert_eq!(parse_database_url("sqlite::memory:").unwrap(), DatabaseLocation::Memory);
        assert_eq!(parse_database_url(":memory:").unwrap(), DatabaseLocation::Memory);
    }

    #[test]
    fn test_slash_forms() {
        assert_eq!(
            parse_database_url("sqlite:///blog.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("blog.db"))
        );
        assert_eq!(
            parse_database_url("sqlite:////var/lib/quill/blog.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("/var/lib/quill/blog.db"))
        );
        assert_eq!(
            parse_database_url("sqlite://data/quill.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("data/quill.db"))
        );
    }

    #[test]
    fn test_bare_path() {
        assert_eq!(
            parse_database_url("./quill.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("./quill.db"))
        );
    }

    #[test]
    fn test_rejects_other_schemes() {
        let result = parse_database_url("postgres://localhost/blog");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(parse_database_url("  ").is_err());
        assert!(parse_database_url("sqlite://").is_err());
    }
}
