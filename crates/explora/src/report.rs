// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error reporting shared by the widget and the statistics.

use std::error;
use std::fmt;

pub type Report<T> = Result<T, Error>;

/// What went wrong, without the human-readable details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The model has no such field.
    MissingField,
    /// The field holds something that isn't an integer.
    NotAnInteger,
    /// The host binding itself failed.
    Host,
    /// The frame has no such column.
    MissingColumn,
    /// A column doesn't match the frame's row count.
    ColumnLength,
    /// A column holds text where numbers were expected, or the other way around.
    ColumnType,
    /// Not enough spread in the data to compute anything meaningful.
    Degenerate,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn error::Error + 'static>>,
}

impl Error {
    pub fn new<M>(kind: ErrorKind, message: M) -> Self
    where
        M: Into<String>,
    {
        Error {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn host<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Error::new(ErrorKind::Host, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Error::new(
            ErrorKind::MissingField,
            format!("model has no field `{field}`"),
        )
    }

    pub fn missing_column(column: &str) -> Self {
        Error::new(
            ErrorKind::MissingColumn,
            format!("frame has no column `{column}`"),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        Ok(())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source.as_deref()
    }
}

pub trait ErrorExt<T, E> {
    /// Wrap the error as a [`ErrorKind::Host`] error with a context message.
    fn message(self, message: &str) -> Result<T, Error>
    where
        E: error::Error + 'static;

    fn with_message<F, M>(self, f: F) -> Result<T, Error>
    where
        E: error::Error + 'static,
        F: FnOnce() -> M,
        M: Into<String>;
}

impl<T, E> ErrorExt<T, E> for Result<T, E> {
    fn message(self, message: &str) -> Result<T, Error>
    where
        E: error::Error + 'static,
    {
        self.with_message(|| message)
    }

    fn with_message<F, M>(self, f: F) -> Result<T, Error>
    where
        E: error::Error + 'static,
        F: FnOnce() -> M,
        M: Into<String>,
    {
        self.map_err(|err| Error {
            kind: ErrorKind::Host,
            message: f().into(),
            source: Some(Box::new(err)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_source() {
        let res = serde_json::from_str::<i64>("nope");
        let err = res.message("failed to parse options").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Host);
        assert!(err.to_string().starts_with("failed to parse options: "));
        assert!(error::Error::source(&err).is_some());
    }

    #[test]
    fn plain_message() {
        let err = Error::missing_field("value");

        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(err.to_string(), "model has no field `value`");
    }
}
