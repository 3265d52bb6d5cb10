use serde::{Deserialize, Serialize};

use crate::definitions::{Bound, ParamName};
use crate::error::Result;
use crate::params::{Bounds, FixedFlags, Parameters, Populations};

/// One scalar slot of the flat optimizer vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatEntry {
    pub name: ParamName,
    /// Population instance, `None` for global parameters.
    pub instance: Option<usize>,
    pub value: f64,
    pub bound: Bound,
    /// `false` when the parameter is fixed.
    pub vary: bool,
}

impl FlatEntry {
    /// `r0_sphere[1]`-style label.
    pub fn label(&self) -> String {
        match self.instance {
            None => self.name.key().to_string(),
            Some(i) => format!("{}[{}]", self.name.key(), i),
        }
    }
}

/// Flat view of a parameter record.
///
/// Layout: globals first (`I0_floor`), then each active population in
/// declaration order, each of its parameters in declaration order, each
/// expanded across the population's instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatParams {
    entries: Vec<FlatEntry>,
}

impl FlatParams {
    /// Flatten `params`, attaching vary flags and bounds.
    ///
    /// All three records must have the full shape for `populations`; entries
    /// for absent populations are ignored.
    pub fn encode(
        populations: &Populations,
        params: &Parameters,
        fixed: &FixedFlags,
        bounds: &Bounds,
    ) -> Result<Self> {
        params.validate(populations)?;
        fixed.validate(populations)?;
        bounds.validate(populations)?;

        let mut entries = Vec::new();
        let mut push = |name: ParamName, instance: Option<usize>| {
            let idx = instance.unwrap_or(0);
            entries.push(FlatEntry {
                name,
                instance,
                value: params.values(name)[idx],
                bound: bounds.values(name)[idx],
                vary: !fixed.values(name)[idx],
            });
        };

        for name in ParamName::ALL.into_iter().filter(|n| n.is_global()) {
            push(name, None);
        }
        for (population, count) in populations.active() {
            for &name in population.params() {
                for i in 0..count {
                    push(name, Some(i));
                }
            }
        }

        Ok(Self { entries })
    }

    /// Rebuild the structured record.
    pub fn decode(&self) -> Parameters {
        let mut params = Parameters::new();
        for entry in &self.entries {
            match entry.instance {
                None => {
                    params.set_scalar(entry.name, entry.value);
                }
                Some(_) => {
                    let mut values = params.values(entry.name).to_vec();
                    values.push(entry.value);
                    params.set_list(entry.name, values);
                }
            }
        }
        params
    }

    pub fn entries(&self) -> &[FlatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn n_free(&self) -> usize {
        self.entries.iter().filter(|e| e.vary).count()
    }

    /// Values of the varying entries, in layout order.
    pub fn free_values(&self) -> Vec<f64> {
        self.entries.iter().filter(|e| e.vary).map(|e| e.value).collect()
    }

    pub fn free_bounds(&self) -> Vec<Bound> {
        self.entries.iter().filter(|e| e.vary).map(|e| e.bound).collect()
    }

    /// Copy with the varying entries replaced by `values`, clamped to their
    /// bounds. Fixed entries keep their values.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from [`FlatParams::n_free`].
    pub fn with_free_values(&self, values: &[f64]) -> Self {
        assert_eq!(values.len(), self.n_free(), "free parameter count mismatch");
        let mut entries = self.entries.clone();
        for (entry, &v) in entries.iter_mut().filter(|e| e.vary).zip(values) {
            entry.value = entry.bound.clamp(v);
        }
        Self { entries }
    }
}
