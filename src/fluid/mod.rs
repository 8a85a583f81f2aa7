//! Fluid-flavored networks: nodes carrying a mixture of constituent species, and composites that
//! insist every member agrees on that mixture.

mod flavor;

use std::fmt;

use itertools::Itertools;

pub use flavor::{FluidFlavor, FluidSuperNetwork};

use crate::{NetworkError, Node};

/// A constituent species of a fluid mixture.
#[allow(clippy::upper_case_acronyms)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FluidType {
    N2,
    O2,
    H2,
    H2O,
    CO2,
    CO,
    He,
    Ar,
    CH4,
    NH3,
    Water,
    Ammonia,
}

impl fmt::Display for FluidType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FluidType::N2 => "GUNNS_N2",
            FluidType::O2 => "GUNNS_O2",
            FluidType::H2 => "GUNNS_H2",
            FluidType::H2O => "GUNNS_H2O",
            FluidType::CO2 => "GUNNS_CO2",
            FluidType::CO => "GUNNS_CO",
            FluidType::He => "GUNNS_HE",
            FluidType::Ar => "GUNNS_AR",
            FluidType::CH4 => "GUNNS_CH4",
            FluidType::NH3 => "GUNNS_NH3",
            FluidType::Water => "GUNNS_WATER",
            FluidType::Ammonia => "GUNNS_AMMONIA",
        };
        f.write_str(name)
    }
}

/// Trace compounds tracked alongside the bulk species, by name.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceCompoundsConfig {
    pub compounds: Vec<String>,
}

/// The mixture every node of a fluid network is built with.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FluidConfig {
    /// Bulk species, in the order mass fractions are stored.
    pub species: Vec<FluidType>,
    pub trace_compounds: Option<TraceCompoundsConfig>,
}

impl FluidConfig {
    pub fn new(species: impl IntoIterator<Item = FluidType>) -> Self {
        Self {
            species: species.into_iter().collect(),
            trace_compounds: None,
        }
    }

    pub fn with_trace_compounds<S: Into<String>>(
        mut self,
        compounds: impl IntoIterator<Item = S>,
    ) -> Self {
        self.trace_compounds = Some(TraceCompoundsConfig {
            compounds: compounds.into_iter().map(Into::into).collect(),
        });
        self
    }

    fn num_trace_compounds(&self) -> usize {
        self.trace_compounds
            .as_ref()
            .map_or(0, |tc| tc.compounds.len())
    }
}

impl fmt::Display for FluidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.species.iter().join(", "))?;
        if let Some(tc) = &self.trace_compounds {
            write!(f, " + trace [{}]", tc.compounds.iter().join(", "))?;
        }
        Ok(())
    }
}

/// A node holding a fluid mixture at a pressure (its potential).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FluidNode {
    name: String,
    pressure: f64,
    config: Option<FluidConfig>,
    mass_fractions: Vec<f64>,
    trace_moles: Vec<f64>,
}

impl FluidNode {
    /// The node's configuration, once configured.
    pub fn config(&self) -> Option<&FluidConfig> {
        self.config.as_ref()
    }

    pub fn mass_fractions(&self) -> &[f64] {
        &self.mass_fractions
    }

    /// Set the mixture's mass fractions, one per configured species. They are normalized to sum
    /// to one.
    pub fn set_mass_fractions(&mut self, fractions: &[f64]) -> Result<(), NetworkError> {
        if fractions.len() != self.mass_fractions.len() {
            return Err(NetworkError::runtime(
                &self.name,
                format!(
                    "expected {} mass fractions, got {}",
                    self.mass_fractions.len(),
                    fractions.len()
                ),
            ));
        }
        let total: f64 = fractions.iter().sum();
        if total <= 0.0 || fractions.iter().any(|&x| x < 0.0) {
            return Err(NetworkError::runtime(
                &self.name,
                "mass fractions must be non-negative with a positive sum",
            ));
        }
        for (slot, x) in self.mass_fractions.iter_mut().zip(fractions) {
            *slot = x / total;
        }
        Ok(())
    }

    /// Moles of each configured trace compound.
    pub fn trace_moles(&self) -> &[f64] {
        &self.trace_moles
    }
}

impl Node for FluidNode {
    type Config = FluidConfig;

    fn initialize(&mut self, name: &str, initial_potential: f64) {
        self.name = name.to_owned();
        self.pressure = initial_potential;
    }

    /// Size the mixture for `config`, all of it the first species.
    fn configure(&mut self, config: &FluidConfig) {
        self.mass_fractions = vec![0.0; config.species.len()];
        if let Some(first) = self.mass_fractions.first_mut() {
            *first = 1.0;
        }
        self.trace_moles = vec![0.0; config.num_trace_compounds()];
        self.config = Some(config.clone());
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn potential(&self) -> f64 {
        self.pressure
    }

    fn set_potential(&mut self, potential: f64) {
        self.pressure = potential;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_sizes_mixture() {
        let config = FluidConfig::new([FluidType::N2, FluidType::O2]).with_trace_compounds(["CH2O"]);
        let mut node = FluidNode::default();
        node.initialize("S.Node_0", 101.325);
        node.configure(&config);

        assert_eq!(node.mass_fractions(), &[1.0, 0.0]);
        assert_eq!(node.trace_moles(), &[0.0]);
        assert_eq!(node.config(), Some(&config));
        assert_eq!(node.potential(), 101.325);
    }

    #[test]
    fn test_set_mass_fractions() {
        let mut node = FluidNode::default();
        node.configure(&FluidConfig::new([FluidType::N2, FluidType::O2]));

        node.set_mass_fractions(&[3.0, 1.0]).unwrap();
        assert_eq!(node.mass_fractions(), &[0.75, 0.25]);
        assert!(node.set_mass_fractions(&[1.0]).is_err());
        assert!(node.set_mass_fractions(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn test_display() {
        let config = FluidConfig::new([FluidType::N2, FluidType::O2]).with_trace_compounds(["CO"]);
        assert_eq!(config.to_string(), "[GUNNS_N2, GUNNS_O2] + trace [CO]");
    }
}
