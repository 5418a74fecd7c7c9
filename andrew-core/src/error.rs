use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used by the serving boundary to
/// pick a status code and by metrics sinks to bucket outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    ParseFailure,
    TemplateFailure,
    Unknown,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: not found")]
    NotFound { path: String },

    #[error("{path}: permission denied")]
    PermissionDenied { path: String },

    #[error("{path}: could not parse document: {reason}")]
    Parse { path: String, reason: String },

    #[error("{path}: template error: {source}")]
    Template {
        path: String,
        #[source]
        source: tera::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("walking {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
}

impl Error {
    /// Classify an io error against the path it was raised for.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound { path },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { path },
            _ => Error::Io { path, source },
        }
    }

    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Error::Parse { .. } => ErrorKind::ParseFailure,
            Error::Template { .. } => ErrorKind::TemplateFailure,
            Error::Walk { source, .. } => match source.io_error().map(io::Error::kind) {
                Some(io::ErrorKind::NotFound) => ErrorKind::NotFound,
                Some(io::ErrorKind::PermissionDenied) => ErrorKind::PermissionDenied,
                _ => ErrorKind::Unknown,
            },
            Error::Io { .. } => ErrorKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_are_classified_by_kind() {
        let missing = Error::io("a.html", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let locked = Error::io("a.html", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(locked.kind(), ErrorKind::PermissionDenied);

        let other = Error::io("a.html", io::Error::other("novel error"));
        assert_eq!(other.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn parse_errors_mention_the_path() {
        let err = Error::parse("blog/post.html", "too deep");
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        assert!(err.to_string().contains("blog/post.html"));
    }
}
