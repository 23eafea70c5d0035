//! Dynamic routing graph: neuron activations and synapse weights.
//!
//! Co-activations accumulate in a measurement window as neurons fire
//! together; a periodic Hebbian batch folds each accumulated count into
//! its synapse's weight (creating the synapse on first co-activation) and
//! reopens the window.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Neuron, NeuronType, Synapse};
use crate::domain::ports::NeuronRepository;

pub struct RoutingGraphService {
    repository: Arc<dyn NeuronRepository>,
}

impl RoutingGraphService {
    pub fn new(repository: Arc<dyn NeuronRepository>) -> Self {
        Self { repository }
    }

    /// Register a neuron if it doesn't already exist, or update its
    /// activation if it does.
    #[instrument(skip(self))]
    pub async fn activate(&self, id: Uuid, name: &str, neuron_type: NeuronType, activation: f32) -> DomainResult<()> {
        let mut neuron = self
            .repository
            .get_neuron(id)
            .await?
            .unwrap_or_else(|| Neuron {
                id,
                name: name.to_string(),
                neuron_type,
                activation: 0.0,
                threshold: 0.5,
                bias: 0.0,
                agent_id: None,
            });
        neuron.set_activation(activation);
        self.repository.upsert_neuron(&neuron).await
    }

    /// Record that two neurons fired together within the current window.
    #[instrument(skip(self))]
    pub async fn record_activation(&self, neuron_a: Uuid, neuron_b: Uuid) -> DomainResult<()> {
        self.repository.record_co_activation(neuron_a, neuron_b).await?;
        Ok(())
    }

    /// Fold every pending co-activation into its synapse's weight: existing
    /// synapses are potentiated, new ones are created starting from the
    /// default weight. Each processed pair has its window reset.
    #[instrument(skip(self))]
    pub async fn run_hebbian_batch(&self) -> DomainResult<usize> {
        let pending = self.repository.list_co_activations().await?;
        let mut updated = 0;

        for co_activation in &pending {
            let mut synapse = self
                .repository
                .get_synapse(co_activation.neuron_a, co_activation.neuron_b)
                .await?
                .unwrap_or_else(|| Synapse::new(co_activation.neuron_a, co_activation.neuron_b));
            synapse.co_activation_count += co_activation.count;
            synapse.potentiate();
            self.repository.upsert_synapse(&synapse).await?;
            self.repository
                .reset_co_activation(co_activation.neuron_a, co_activation.neuron_b)
                .await?;
            updated += 1;
        }

        if updated > 0 {
            info!(updated, "hebbian batch potentiated synapses");
        }
        Ok(updated)
    }

    /// Depress every synapse that received no co-activation in the last
    /// window (dormant edges decay rather than holding their weight
    /// indefinitely).
    #[instrument(skip(self))]
    pub async fn decay_inactive(&self) -> DomainResult<usize> {
        let active_pairs: Vec<(Uuid, Uuid)> = self
            .repository
            .list_co_activations()
            .await?
            .into_iter()
            .map(|c| (c.neuron_a, c.neuron_b))
            .collect();

        let mut decayed = 0;
        for mut synapse in self.repository.list_synapses().await? {
            if active_pairs.contains(&(synapse.source, synapse.target)) {
                continue;
            }
            synapse.depress();
            self.repository.upsert_synapse(&synapse).await?;
            decayed += 1;
        }
        Ok(decayed)
    }
}
