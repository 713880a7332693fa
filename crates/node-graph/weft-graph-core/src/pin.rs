//! Pin names and per-component pin translation tables.
//!
//! Pins compare exactly; [`PinName::key`] gives the case-folded form used for
//! the case-insensitive fallback. A [`PinTranslation`] maps canonical short
//! codes (`A`, `R`) to descriptive names (`First number`, `Result`) in both
//! directions and is built once per component.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone)]
pub struct PinName {
    raw: Arc<str>,
    key: Arc<str>,
}

impl PinName {
    /// Trim surrounding whitespace and precompute the case-folded key.
    pub fn new(name: &str) -> Self {
        let trimmed = name.trim();
        PinName {
            raw: Arc::from(trimmed),
            key: Arc::from(trimmed.to_lowercase().as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Case-folded spelling.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn eq_ignore_case(&self, other: &str) -> bool {
        &*self.key == other.trim().to_lowercase().as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl PartialEq for PinName {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PinName {}

impl Hash for PinName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // must agree with `str`'s hash for `Borrow<str>` lookups
        (*self.raw).hash(state);
    }
}

impl Borrow<str> for PinName {
    fn borrow(&self) -> &str {
        &self.raw
    }
}

impl fmt::Debug for PinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.raw)
    }
}

impl fmt::Display for PinName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for PinName {
    fn from(s: &str) -> Self {
        PinName::new(s)
    }
}

impl Serialize for PinName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PinName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(PinName::new(&s))
    }
}

/// Look up `pin` in a pin-keyed map: exact spelling first, then case-insensitive.
pub fn get_pin<'a, V>(map: &'a IndexMap<PinName, V>, pin: &str) -> Option<&'a V> {
    if let Some(v) = map.get(pin) {
        return Some(v);
    }
    let key = pin.trim().to_lowercase();
    map.iter().find(|(k, _)| k.key() == key).map(|(_, v)| v)
}

/// Bidirectional canonical <-> descriptive map for one side of a component.
#[derive(Clone, Debug, Default)]
pub struct PinMap {
    descriptive: IndexMap<PinName, PinName>,
    // case-folded spelling (either form) -> canonical
    lookup: HashMap<String, PinName>,
}

impl PinMap {
    pub fn insert(&mut self, canonical: &str, descriptive: &str) {
        let canonical = PinName::new(canonical);
        let descriptive = PinName::new(descriptive);
        self.lookup
            .insert(canonical.key().to_string(), canonical.clone());
        self.lookup
            .insert(descriptive.key().to_string(), canonical.clone());
        self.descriptive.insert(canonical, descriptive);
    }

    /// Canonical code for either spelling of a pin.
    pub fn canonical(&self, name: &str) -> Option<&PinName> {
        self.lookup.get(&name.trim().to_lowercase())
    }

    /// Descriptive name for a canonical code.
    pub fn descriptive(&self, canonical: &str) -> Option<&PinName> {
        self.canonical(canonical)
            .and_then(|c| self.descriptive.get(c.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.descriptive.is_empty()
    }

    pub fn len(&self) -> usize {
        self.descriptive.len()
    }

    /// Canonical codes in declaration order.
    pub fn canonical_names(&self) -> impl Iterator<Item = &PinName> {
        self.descriptive.keys()
    }
}

#[derive(Clone, Debug, Default)]
pub struct PinTranslation {
    pub inputs: PinMap,
    pub outputs: PinMap,
}

impl PinTranslation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, canonical: &str, descriptive: &str) -> Self {
        self.inputs.insert(canonical, descriptive);
        self
    }

    pub fn output(mut self, canonical: &str, descriptive: &str) -> Self {
        self.outputs.insert(canonical, descriptive);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}
