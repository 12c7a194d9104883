//! Inbound feedback model

use crate::error::{Error, Result};
use serde::Deserialize;

/// One user-submitted feedback report, as posted by the plugin host.
///
/// Every field is optional on the wire. A report is well-formed only when
/// `content`, `name`, `version`, and `dhash` are all present and non-empty;
/// `reporter` and `exception` are optional annotations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feedback {
    /// Message body
    pub content: Option<String>,
    /// Plugin name
    pub name: Option<String>,
    /// Plugin version
    pub version: Option<String>,
    /// Host version hash
    pub dhash: Option<String>,
    /// Contact details, free-form
    pub reporter: Option<String>,
    /// Stack trace attached by the host
    pub exception: Option<String>,
}

/// Borrowed view of a report whose required fields are verified present.
///
/// Obtained through [`Feedback::require_complete`]; the optional fields are
/// normalized so that an empty string reads as absent.
#[derive(Debug, Clone, Copy)]
pub struct CompleteFeedback<'a> {
    pub content: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub dhash: &'a str,
    pub reporter: Option<&'a str>,
    pub exception: Option<&'a str>,
}

impl Feedback {
    /// Validate the required fields and return the borrowed view.
    ///
    /// Fails with [`Error::NoContent`] when any of `content`, `version`,
    /// `name`, or `dhash` is missing or empty.
    pub fn require_complete(&self) -> Result<CompleteFeedback<'_>> {
        fn nonempty(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|v| !v.is_empty())
        }

        match (
            nonempty(&self.content),
            nonempty(&self.version),
            nonempty(&self.name),
            nonempty(&self.dhash),
        ) {
            (Some(content), Some(version), Some(name), Some(dhash)) => Ok(CompleteFeedback {
                content,
                name,
                version,
                dhash,
                reporter: nonempty(&self.reporter),
                exception: nonempty(&self.exception),
            }),
            _ => Err(Error::NoContent),
        }
    }
}
