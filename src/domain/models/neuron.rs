//! Neuron/synapse dynamic routing graph.
//!
//! A supplemental graph layer: neurons hold a clamped activation level,
//! synapses connect them with a weight bounded away from zero so a
//! connection can always recover, and co-activation counts accumulate
//! within a measurement window until a periodic Hebbian batch folds them
//! into the synapse weights.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chrono::{DateTime, Utc};

pub const MIN_SYNAPSE_WEIGHT: f32 = 0.01;
pub const MAX_SYNAPSE_WEIGHT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuronType {
    Sensory,
    Motor,
    Interneuron,
    Modulatory,
}

impl NeuronType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sensory => "sensory",
            Self::Motor => "motor",
            Self::Interneuron => "interneuron",
            Self::Modulatory => "modulatory",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sensory" => Some(Self::Sensory),
            "motor" => Some(Self::Motor),
            "interneuron" => Some(Self::Interneuron),
            "modulatory" => Some(Self::Modulatory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    pub id: Uuid,
    pub name: String,
    pub neuron_type: NeuronType,
    pub activation: f32,
    pub threshold: f32,
    pub bias: f32,
    pub agent_id: Option<Uuid>,
}

impl Neuron {
    pub fn new(name: impl Into<String>, neuron_type: NeuronType, agent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            neuron_type,
            activation: 0.0,
            threshold: 0.5,
            bias: 0.0,
            agent_id,
        }
    }

    /// Activation is always clamped to [0, 1].
    pub fn set_activation(&mut self, activation: f32) {
        self.activation = activation.clamp(0.0, 1.0);
    }

    pub fn is_firing(&self) -> bool {
        self.activation >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynapseState {
    Active,
    Potentiated,
    Depressed,
    Dormant,
}

impl SynapseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Potentiated => "potentiated",
            Self::Depressed => "depressed",
            Self::Dormant => "dormant",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "potentiated" => Some(Self::Potentiated),
            "depressed" => Some(Self::Depressed),
            "dormant" => Some(Self::Dormant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synapse {
    pub source: Uuid,
    pub target: Uuid,
    pub weight: f32,
    pub plasticity: f32,
    pub state: SynapseState,
    pub co_activation_count: u64,
}

impl Synapse {
    pub fn new(source: Uuid, target: Uuid) -> Self {
        Self {
            source,
            target,
            weight: 0.1,
            plasticity: 0.1,
            state: SynapseState::Active,
            co_activation_count: 0,
        }
    }

    /// Long-term potentiation: strengthens the weight toward `MAX_SYNAPSE_WEIGHT`
    /// by a fraction of the remaining headroom, scaled by plasticity.
    pub fn potentiate(&mut self) {
        let delta = (MAX_SYNAPSE_WEIGHT - self.weight) * self.plasticity;
        self.weight = (self.weight + delta).clamp(MIN_SYNAPSE_WEIGHT, MAX_SYNAPSE_WEIGHT);
        self.state = SynapseState::Potentiated;
    }

    /// Depression: weakens the weight toward `MIN_SYNAPSE_WEIGHT`, never past it.
    pub fn depress(&mut self) {
        let delta = (self.weight - MIN_SYNAPSE_WEIGHT) * self.plasticity;
        self.weight = (self.weight - delta).clamp(MIN_SYNAPSE_WEIGHT, MAX_SYNAPSE_WEIGHT);
        self.state = SynapseState::Depressed;
    }
}

/// Co-activation count for an unordered neuron pair within a measurement
/// window. `neuron_a`/`neuron_b` are normalized lexicographically so the
/// same pair is never counted under both orderings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoActivation {
    pub neuron_a: Uuid,
    pub neuron_b: Uuid,
    pub window_started_at: DateTime<Utc>,
    pub count: u64,
}

impl CoActivation {
    /// Order a raw pair so the smaller id is always `.0`.
    pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_is_clamped() {
        let mut neuron = Neuron::new("n1", NeuronType::Sensory, None);
        neuron.set_activation(1.7);
        assert_eq!(neuron.activation, 1.0);
        neuron.set_activation(-0.3);
        assert_eq!(neuron.activation, 0.0);
    }

    #[test]
    fn potentiate_moves_toward_max_and_never_overshoots() {
        let mut synapse = Synapse::new(Uuid::new_v4(), Uuid::new_v4());
        for _ in 0..1000 {
            synapse.potentiate();
        }
        assert!(synapse.weight <= MAX_SYNAPSE_WEIGHT);
        assert!(synapse.weight > 0.9);
        assert_eq!(synapse.state, SynapseState::Potentiated);
    }

    #[test]
    fn depress_moves_toward_min_and_never_undershoots() {
        let mut synapse = Synapse::new(Uuid::new_v4(), Uuid::new_v4());
        synapse.weight = 0.9;
        for _ in 0..1000 {
            synapse.depress();
        }
        assert!(synapse.weight >= MIN_SYNAPSE_WEIGHT);
        assert!(synapse.weight < 0.1);
        assert_eq!(synapse.state, SynapseState::Depressed);
    }

    #[test]
    fn pair_normalization_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(CoActivation::normalize_pair(a, b), CoActivation::normalize_pair(b, a));
    }

    use proptest::prelude::*;
    use test_strategy::proptest;

    #[proptest]
    fn potentiate_stays_within_bounds(
        #[strategy(MIN_SYNAPSE_WEIGHT..=MAX_SYNAPSE_WEIGHT)] weight: f32,
        #[strategy(0.01f32..=1.0)] plasticity: f32,
    ) {
        let mut synapse = Synapse::new(Uuid::new_v4(), Uuid::new_v4());
        synapse.weight = weight;
        synapse.plasticity = plasticity;
        synapse.potentiate();
        prop_assert!(synapse.weight >= MIN_SYNAPSE_WEIGHT);
        prop_assert!(synapse.weight <= MAX_SYNAPSE_WEIGHT);
    }

    #[proptest]
    fn depress_stays_within_bounds(
        #[strategy(MIN_SYNAPSE_WEIGHT..=MAX_SYNAPSE_WEIGHT)] weight: f32,
        #[strategy(0.01f32..=1.0)] plasticity: f32,
    ) {
        let mut synapse = Synapse::new(Uuid::new_v4(), Uuid::new_v4());
        synapse.weight = weight;
        synapse.plasticity = plasticity;
        synapse.depress();
        prop_assert!(synapse.weight >= MIN_SYNAPSE_WEIGHT);
        prop_assert!(synapse.weight <= MAX_SYNAPSE_WEIGHT);
    }

    #[proptest]
    fn activation_clamp_is_always_in_unit_range(#[strategy(-10.0f32..=10.0)] raw: f32) {
        let mut neuron = Neuron::new("n", NeuronType::Sensory, None);
        neuron.set_activation(raw);
        prop_assert!((0.0..=1.0).contains(&neuron.activation));
    }
}
