use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definitions::{Bound, ParamName, ParamRole, Population};
use crate::error::{Result, SaxsError};

// ---------------------------------------------------------------------------
// Population record
// ---------------------------------------------------------------------------

/// Number of distinct sub-populations of each scatterer type.
///
/// Serializes as a map such as `{"guinier_porod": 1, "unidentified": 0}`.
/// Types missing from the map count as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Populations {
    counts: BTreeMap<Population, usize>,
}

impl Populations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, population: Population, count: usize) -> Self {
        self.set(population, count);
        self
    }

    pub fn set(&mut self, population: Population, count: usize) {
        self.counts.insert(population, count);
    }

    pub fn count(&self, population: Population) -> usize {
        self.counts.get(&population).copied().unwrap_or(0)
    }

    pub fn is_unidentified(&self) -> bool {
        self.count(Population::Unidentified) > 0
    }

    pub fn has_diffraction_peaks(&self) -> bool {
        self.count(Population::DiffractionPeaks) > 0
    }

    /// Populations with a nonzero count, in declaration order.
    pub fn active(&self) -> impl Iterator<Item = (Population, usize)> + '_ {
        self.counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(p, n)| (*p, *n))
    }

    /// Expected number of values for `name` under this record.
    pub fn expected_len(&self, name: ParamName) -> usize {
        match name.population() {
            None => 1,
            Some(p) => self.count(p),
        }
    }
}

// ---------------------------------------------------------------------------
// Structured records
// ---------------------------------------------------------------------------

/// A record entry: one value, or one value per population instance.
///
/// Two entries are equal when their values are, so `Scalar(x)` equals
/// `List([x])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Scalar(T),
    List(Vec<T>),
}

impl<T> Entry<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Entry::Scalar(v) => std::slice::from_ref(v),
            Entry::List(v) => v,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Entry::Scalar(v) => std::slice::from_mut(v),
            Entry::List(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl<T: PartialEq> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

/// Parameter-keyed record. Values, fixed flags and bounds all share this
/// shape; iteration follows `ParamName` declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamRecord<T> {
    entries: BTreeMap<ParamName, Entry<T>>,
}

/// Parameter values.
pub type Parameters = ParamRecord<f64>;
/// `true` marks a parameter held at its initial value.
pub type FixedFlags = ParamRecord<bool>;
/// Per-parameter optimizer bounds.
pub type Bounds = ParamRecord<Bound>;

impl<T> Default for ParamRecord<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T> ParamRecord<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full-shape record for `populations`: globals as scalars, population
    /// parameters as lists with one value per instance.
    pub fn from_fn(populations: &Populations, f: impl Fn(ParamName) -> T) -> Self {
        let mut record = Self::new();
        for name in ParamName::ALL {
            if name.is_global() {
                record.entries.insert(name, Entry::Scalar(f(name)));
            }
        }
        for (population, count) in populations.active() {
            for &name in population.params() {
                let values = (0..count).map(|_| f(name)).collect();
                record.entries.insert(name, Entry::List(values));
            }
        }
        record
    }

    pub fn insert(&mut self, name: ParamName, entry: Entry<T>) -> &mut Self {
        self.entries.insert(name, entry);
        self
    }

    pub fn set_scalar(&mut self, name: ParamName, value: T) -> &mut Self {
        self.insert(name, Entry::Scalar(value))
    }

    pub fn set_list(&mut self, name: ParamName, values: Vec<T>) -> &mut Self {
        self.insert(name, Entry::List(values))
    }

    pub fn get(&self, name: ParamName) -> Option<&Entry<T>> {
        self.entries.get(&name)
    }

    pub fn get_mut(&mut self, name: ParamName) -> Option<&mut Entry<T>> {
        self.entries.get_mut(&name)
    }

    pub fn remove(&mut self, name: ParamName) -> Option<Entry<T>> {
        self.entries.remove(&name)
    }

    /// Values of `name` as a slice; empty when absent.
    pub fn values(&self, name: ParamName) -> &[T] {
        self.get(name).map(Entry::as_slice).unwrap_or(&[])
    }

    pub fn value(&self, name: ParamName, instance: usize) -> Option<&T> {
        self.values(name).get(instance)
    }

    pub fn contains(&self, name: ParamName) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamName, &Entry<T>)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries belonging to populations that are absent from
    /// `populations`. Callers routinely pass supersets, so this is silent.
    pub fn restrict_to(&mut self, populations: &Populations) {
        self.entries.retain(|name, _| match name.population() {
            None => true,
            Some(p) => populations.count(p) > 0,
        });
    }

    /// Check that every parameter required by `populations` is present with
    /// exactly one value per instance.
    pub fn validate(&self, populations: &Populations) -> Result<()> {
        let required = ParamName::ALL.into_iter().filter(|n| match n.population() {
            None => true,
            Some(p) => populations.count(p) > 0,
        });
        for name in required {
            let entry = self.get(name).ok_or(SaxsError::MissingParameter(name))?;
            let expected = populations.expected_len(name);
            if entry.len() != expected {
                return Err(SaxsError::ShapeMismatch {
                    name,
                    expected,
                    actual: entry.len(),
                });
            }
        }
        Ok(())
    }
}

impl<T: Clone> ParamRecord<T> {
    /// Merge `other` into `self` index by index, up to the shorter length.
    ///
    /// Lists are never replaced wholesale: a one-element update to a
    /// two-instance list only touches the first instance. Keys of `other`
    /// absent from `self` are ignored.
    pub fn update(&mut self, other: &ParamRecord<T>) {
        for (name, new) in other.iter() {
            if let Some(old) = self.entries.get_mut(&name) {
                for (slot, value) in old.as_mut_slice().iter_mut().zip(new.as_slice()) {
                    *slot = value.clone();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default parameter values for `populations`, from the parameter table.
pub fn default_params(populations: &Populations) -> Parameters {
    ParamRecord::from_fn(populations, ParamName::default_value)
}

/// Nothing fixed.
pub fn default_fixed(populations: &Populations) -> FixedFlags {
    ParamRecord::from_fn(populations, |_| false)
}

/// Bounds from the parameter table.
pub fn default_bounds(populations: &Populations) -> Bounds {
    ParamRecord::from_fn(populations, ParamName::default_bound)
}

/// Fix every structural parameter, free every amplitude.
pub fn intensity_only_fixed(populations: &Populations) -> FixedFlags {
    ParamRecord::from_fn(populations, |name| name.role() == ParamRole::Structural)
}

/// Positional merge of `new` into a copy of `old`. See [`ParamRecord::update`].
pub fn update_params<T: Clone>(old: &ParamRecord<T>, new: &ParamRecord<T>) -> ParamRecord<T> {
    let mut merged = old.clone();
    merged.update(new);
    merged
}
