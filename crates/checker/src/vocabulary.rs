use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Symmetric table of timbral descriptors that pull in opposite directions
/// (bright/dark, warm/cold, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimbralOpposites {
    opposites: HashMap<String, String>,
}

impl TimbralOpposites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut table = Self::new();
        for (a, b) in pairs {
            table.insert(a.as_ref(), b.as_ref());
        }
        table
    }

    pub fn insert(&mut self, a: &str, b: &str) {
        let (a, b) = (normalize(a), normalize(b));
        self.opposites.insert(a.clone(), b.clone());
        self.opposites.insert(b, a);
    }

    pub fn opposite_of(&self, descriptor: &str) -> Option<&str> {
        self.opposites.get(&normalize(descriptor)).map(String::as_str)
    }

    pub fn are_opposites(&self, a: &str, b: &str) -> bool {
        self.opposite_of(a) == Some(normalize(b).as_str())
    }

    pub fn len(&self) -> usize {
        self.opposites.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.opposites.is_empty()
    }
}

fn normalize(descriptor: &str) -> String {
    descriptor.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposites_are_symmetric_and_case_insensitive() {
        let table = TimbralOpposites::from_pairs([("bright", "dark"), ("warm", "cold")]);
        assert_eq!(table.len(), 2);
        assert!(table.are_opposites("Bright", "dark"));
        assert!(table.are_opposites("dark", "BRIGHT"));
        assert!(!table.are_opposites("bright", "warm"));
        assert_eq!(table.opposite_of("cold"), Some("warm"));
        assert_eq!(table.opposite_of("airy"), None);
    }
}
