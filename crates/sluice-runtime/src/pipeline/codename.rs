//! Codename lists.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// The codenames a pipe consumes or produces.
///
/// A single name converts to a one-element list, so `"raw"` and `["raw"]`
/// declare the same thing. Serialized as a list; deserialized from either a
/// string or a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CodenamesRepr", into = "Vec<String>")]
pub struct Codenames(Vec<String>);

impl Codenames {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the names as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the first name that appears more than once.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.0
            .iter()
            .enumerate()
            .find(|(index, name)| self.0[index + 1..].contains(*name))
            .map(|(_, name)| name.as_str())
    }
}

impl Deref for Codenames {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Codenames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_owned()])
    }
}

impl From<String> for Codenames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&String> for Codenames {
    fn from(name: &String) -> Self {
        Self(vec![name.clone()])
    }
}

impl From<Vec<String>> for Codenames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for Codenames {
    fn from(names: Vec<&str>) -> Self {
        names.into_iter().collect()
    }
}

impl From<&[&str]> for Codenames {
    fn from(names: &[&str]) -> Self {
        names.iter().copied().collect()
    }
}

impl<const N: usize> From<[&str; N]> for Codenames {
    fn from(names: [&str; N]) -> Self {
        names.into_iter().collect()
    }
}

impl From<Codenames> for Vec<String> {
    fn from(names: Codenames) -> Self {
        names.0
    }
}

impl<S: Into<String>> FromIterator<S> for Codenames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a Codenames {
    type IntoIter = std::slice::Iter<'a, String>;
    type Item = &'a String;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodenamesRepr {
    One(String),
    Many(Vec<String>),
}

impl From<CodenamesRepr> for Codenames {
    fn from(repr: CodenamesRepr) -> Self {
        match repr {
            CodenamesRepr::One(name) => Self::from(name),
            CodenamesRepr::Many(names) => Self(names),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_name_normalizes_to_list() {
        assert_eq!(Codenames::from("raw"), Codenames::from(["raw"]));
        assert_eq!(Codenames::from("raw").len(), 1);
    }

    #[test]
    fn test_deserialize_string_or_list() {
        let one: Codenames = serde_json::from_str(r#""raw""#).unwrap();
        let many: Codenames = serde_json::from_str(r#"["a", "b"]"#).unwrap();

        assert_eq!(one.as_slice(), ["raw"]);
        assert_eq!(many.as_slice(), ["a", "b"]);
        assert_eq!(serde_json::to_string(&one).unwrap(), r#"["raw"]"#);
    }

    #[test]
    fn test_first_duplicate() {
        assert_eq!(Codenames::from(["a", "b", "a"]).first_duplicate(), Some("a"));
        assert_eq!(Codenames::from(["a", "b"]).first_duplicate(), None);
    }
}
