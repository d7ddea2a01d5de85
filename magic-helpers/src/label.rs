//! Closed label alphabets.
//!
//! Labels are read as free-form strings but the set of symbols that actually
//! occurs is fixed once the data is loaded. The alphabet keeps those symbols
//! sorted, so a [`Label`] index orders exactly like its symbol.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// Index of a symbol inside a [`LabelAlphabet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Label(u32);

impl Label {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The sorted, de-duplicated set of label symbols seen in a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct LabelAlphabet {
    symbols: Vec<String>,
}

impl LabelAlphabet {
    /// Builds the alphabet from every symbol in `symbols`.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        LabelAlphabet {
            symbols: set.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn label_of(&self, symbol: &str) -> Option<Label> {
        self.symbols
            .binary_search_by(|s| s.as_str().cmp(symbol))
            .ok()
            .map(|i| Label(i as u32))
    }

    pub fn symbol(&self, label: Label) -> Option<&str> {
        self.symbols.get(label.index()).map(String::as_str)
    }

    pub fn contains(&self, label: Label) -> bool {
        label.index() < self.symbols.len()
    }

    /// All labels in symbol order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        (0..self.symbols.len()).map(|i| Label(i as u32))
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_is_sorted_and_deduplicated() {
        let alphabet = LabelAlphabet::from_symbols(["h", "g", "h", "g", "g"]);
        assert_eq!(alphabet.symbols(), &["g".to_string(), "h".to_string()]);
        let g = alphabet.label_of("g").unwrap();
        let h = alphabet.label_of("h").unwrap();
        assert!(g < h);
        assert_eq!(alphabet.symbol(h), Some("h"));
        assert_eq!(alphabet.label_of("x"), None);
    }

    #[test]
    fn test_labels_iterate_in_symbol_order() {
        let alphabet = LabelAlphabet::from_symbols(["b", "c", "a"]);
        let symbols: Vec<_> = alphabet
            .labels()
            .map(|l| alphabet.symbol(l).unwrap())
            .collect();
        assert_eq!(symbols, vec!["a", "b", "c"]);
    }
}
