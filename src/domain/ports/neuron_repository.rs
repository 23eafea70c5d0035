//! Neuron repository port: the dynamic routing graph's storage boundary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CoActivation, Neuron, Synapse};

#[async_trait]
pub trait NeuronRepository: Send + Sync {
    async fn upsert_neuron(&self, neuron: &Neuron) -> DomainResult<()>;
    async fn get_neuron(&self, id: Uuid) -> DomainResult<Option<Neuron>>;
    async fn list_neurons(&self) -> DomainResult<Vec<Neuron>>;

    async fn upsert_synapse(&self, synapse: &Synapse) -> DomainResult<()>;
    async fn get_synapse(&self, source: Uuid, target: Uuid) -> DomainResult<Option<Synapse>>;
    async fn list_synapses(&self) -> DomainResult<Vec<Synapse>>;

    /// Record one co-activation between a neuron pair within the current
    /// measurement window, normalizing pair order. Returns the updated count.
    async fn record_co_activation(&self, neuron_a: Uuid, neuron_b: Uuid) -> DomainResult<CoActivation>;

    async fn list_co_activations(&self) -> DomainResult<Vec<CoActivation>>;

    /// Reset a pair's counter and open a new measurement window, typically
    /// called once its count has been folded into the synapse weight by a
    /// Hebbian batch.
    async fn reset_co_activation(&self, neuron_a: Uuid, neuron_b: Uuid) -> DomainResult<()>;
}
