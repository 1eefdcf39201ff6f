// SPDX-License-Identifier: MIT OR Apache-2.0

//! Position-to-identifier mapping kept in lockstep with the vector index.

use crate::errors::IndexError;

/// Ordered external identifiers; entry `i` names the vector at index position `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    ids: Vec<String>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append identifiers in the same order their vectors were added.
    pub fn append<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
    }

    /// Identifier stored at `position`.
    pub fn resolve(&self, position: usize) -> Result<&str, IndexError> {
        self.ids
            .get(position)
            .map(String::as_str)
            .ok_or(IndexError::OutOfRange {
                position,
                len: self.ids.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl From<Vec<String>> for IdentifierMap {
    fn from(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_follows_append_order() {
        let mut map = IdentifierMap::new();
        map.append(["101", "202"]);
        map.append(vec!["303".to_string()]);

        assert_eq!(map.len(), 3);
        assert_eq!(map.resolve(0).unwrap(), "101");
        assert_eq!(map.resolve(2).unwrap(), "303");
    }

    #[test]
    fn resolve_out_of_range() {
        let map = IdentifierMap::from(vec!["a".to_string()]);
        let err = map.resolve(1).unwrap_err();
        assert!(matches!(
            err,
            IndexError::OutOfRange {
                position: 1,
                len: 1
            }
        ));
    }
}
