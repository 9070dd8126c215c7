//! Class-id to label vocabulary that ships with a detection model.

use std::path::Path;
use std::sync::Arc;

use crate::error::Error;

/// COCO vocabulary for the stock YOLOv8 weights.
const BUNDLED_COCO: &str = include_str!("../assets/coco.names");

/// The label every counter in this crate tallies.
pub const PERSON: &str = "person";

/// Immutable lookup table, one label per class id, in model output order.
#[derive(Debug, Clone, PartialEq)]
pub struct Labels(Arc<[String]>);

impl Labels {
    /// Parses a `.names` file body: one label per line, blank lines ignored.
    pub fn parse(src: &str) -> Result<Self, Error> {
        let names = names(src);

        if names.is_empty() {
            return Err(Error::EmptyLabels);
        }

        Ok(Self(names.into()))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn coco() -> Self {
        // the bundled file is never empty
        Self(names(BUNDLED_COCO).into())
    }

    #[inline]
    pub fn get(&self, class: i32) -> Option<&str> {
        usize::try_from(class)
            .ok()
            .and_then(|idx| self.0.get(idx))
            .map(String::as_str)
    }

    pub fn name(&self, class: i32) -> Result<&str, Error> {
        self.get(class).ok_or(Error::UnknownClass(class))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn names(src: &str) -> Vec<String> {
    src.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

impl<S: Into<String>> FromIterator<S> for Labels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect::<Vec<_>>().into())
    }
}
