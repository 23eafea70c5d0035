//! SQLite implementation of the NeuronRepository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CoActivation, Neuron, NeuronType, Synapse, SynapseState};
use crate::domain::ports::NeuronRepository;

#[derive(Clone)]
pub struct SqliteNeuronRepository {
    pool: SqlitePool,
}

impl SqliteNeuronRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NeuronRepository for SqliteNeuronRepository {
    async fn upsert_neuron(&self, neuron: &Neuron) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO neurons (id, name, neuron_type, activation, threshold, bias, agent_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
               name = excluded.name,
               neuron_type = excluded.neuron_type,
               activation = excluded.activation,
               threshold = excluded.threshold,
               bias = excluded.bias,
               agent_id = excluded.agent_id",
        )
        .bind(neuron.id.to_string())
        .bind(&neuron.name)
        .bind(neuron.neuron_type.as_str())
        .bind(neuron.activation)
        .bind(neuron.threshold)
        .bind(neuron.bias)
        .bind(neuron.agent_id.map(|id| id.to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_neuron(&self, id: Uuid) -> DomainResult<Option<Neuron>> {
        let row: Option<NeuronRow> = sqlx::query_as(
            "SELECT id, name, neuron_type, activation, threshold, bias, agent_id FROM neurons WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_neurons(&self) -> DomainResult<Vec<Neuron>> {
        let rows: Vec<NeuronRow> = sqlx::query_as(
            "SELECT id, name, neuron_type, activation, threshold, bias, agent_id FROM neurons ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn upsert_synapse(&self, synapse: &Synapse) -> DomainResult<()> {
        sqlx::query(
            "INSERT INTO synapses (source, target, weight, plasticity, state, co_activation_count)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (source, target) DO UPDATE SET
               weight = excluded.weight,
               plasticity = excluded.plasticity,
               state = excluded.state,
               co_activation_count = excluded.co_activation_count",
        )
        .bind(synapse.source.to_string())
        .bind(synapse.target.to_string())
        .bind(synapse.weight)
        .bind(synapse.plasticity)
        .bind(synapse.state.as_str())
        .bind(synapse.co_activation_count as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_synapse(&self, source: Uuid, target: Uuid) -> DomainResult<Option<Synapse>> {
        let row: Option<SynapseRow> = sqlx::query_as(
            "SELECT source, target, weight, plasticity, state, co_activation_count
             FROM synapses WHERE source = ? AND target = ?",
        )
        .bind(source.to_string())
        .bind(target.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn list_synapses(&self) -> DomainResult<Vec<Synapse>> {
        let rows: Vec<SynapseRow> = sqlx::query_as(
            "SELECT source, target, weight, plasticity, state, co_activation_count FROM synapses",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn record_co_activation(&self, neuron_a: Uuid, neuron_b: Uuid) -> DomainResult<CoActivation> {
        let (a, b) = CoActivation::normalize_pair(neuron_a, neuron_b);
        let row: CoActivationRow = sqlx::query_as(
            "INSERT INTO co_activations (neuron_a, neuron_b, window_started_at, count)
             VALUES (?, ?, ?, 1)
             ON CONFLICT (neuron_a, neuron_b) DO UPDATE SET count = count + 1
             RETURNING neuron_a, neuron_b, window_started_at, count",
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .bind(Utc::now().to_rfc3339())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list_co_activations(&self) -> DomainResult<Vec<CoActivation>> {
        let rows: Vec<CoActivationRow> = sqlx::query_as(
            "SELECT neuron_a, neuron_b, window_started_at, count FROM co_activations WHERE count > 0",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn reset_co_activation(&self, neuron_a: Uuid, neuron_b: Uuid) -> DomainResult<()> {
        let (a, b) = CoActivation::normalize_pair(neuron_a, neuron_b);
        sqlx::query("UPDATE co_activations SET count = 0, window_started_at = ? WHERE neuron_a = ? AND neuron_b = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(a.to_string())
            .bind(b.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct NeuronRow {
    id: String,
    name: String,
    neuron_type: String,
    activation: f64,
    threshold: f64,
    bias: f64,
    agent_id: Option<String>,
}

impl TryFrom<NeuronRow> for Neuron {
    type Error = DomainError;

    fn try_from(row: NeuronRow) -> Result<Self, Self::Error> {
        Ok(Neuron {
            id: super::parse_uuid(&row.id)?,
            name: row.name,
            neuron_type: NeuronType::from_str(&row.neuron_type)
                .ok_or_else(|| DomainError::SerializationError(format!("unknown neuron_type: {}", row.neuron_type)))?,
            activation: row.activation as f32,
            threshold: row.threshold as f32,
            bias: row.bias as f32,
            agent_id: super::parse_optional_uuid(row.agent_id)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SynapseRow {
    source: String,
    target: String,
    weight: f64,
    plasticity: f64,
    state: String,
    co_activation_count: i64,
}

impl TryFrom<SynapseRow> for Synapse {
    type Error = DomainError;

    fn try_from(row: SynapseRow) -> Result<Self, Self::Error> {
        Ok(Synapse {
            source: super::parse_uuid(&row.source)?,
            target: super::parse_uuid(&row.target)?,
            weight: row.weight as f32,
            plasticity: row.plasticity as f32,
            state: SynapseState::from_str(&row.state)
                .ok_or_else(|| DomainError::SerializationError(format!("unknown synapse state: {}", row.state)))?,
            co_activation_count: row.co_activation_count as u64,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CoActivationRow {
    neuron_a: String,
    neuron_b: String,
    window_started_at: String,
    count: i64,
}

impl TryFrom<CoActivationRow> for CoActivation {
    type Error = DomainError;

    fn try_from(row: CoActivationRow) -> Result<Self, Self::Error> {
        Ok(CoActivation {
            neuron_a: super::parse_uuid(&row.neuron_a)?,
            neuron_b: super::parse_uuid(&row.neuron_b)?,
            window_started_at: super::parse_datetime(&row.window_started_at)?,
            count: row.count as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;

    #[tokio::test]
    async fn test_upsert_and_get_neuron() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteNeuronRepository::new(pool);

        let neuron = Neuron::new("planner", NeuronType::Interneuron, None);
        repo.upsert_neuron(&neuron).await.unwrap();

        let fetched = repo.get_neuron(neuron.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "planner");
        assert_eq!(fetched.neuron_type, NeuronType::Interneuron);
    }

    #[tokio::test]
    async fn test_co_activation_counts_regardless_of_argument_order() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteNeuronRepository::new(pool);

        let a = Neuron::new("a", NeuronType::Sensory, None);
        let b = Neuron::new("b", NeuronType::Motor, None);
        repo.upsert_neuron(&a).await.unwrap();
        repo.upsert_neuron(&b).await.unwrap();

        repo.record_co_activation(a.id, b.id).await.unwrap();
        let second = repo.record_co_activation(b.id, a.id).await.unwrap();

        assert_eq!(second.count, 2);
        let all = repo.list_co_activations().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_co_activation_reopens_window() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteNeuronRepository::new(pool);

        let a = Neuron::new("a", NeuronType::Sensory, None);
        let b = Neuron::new("b", NeuronType::Motor, None);
        repo.upsert_neuron(&a).await.unwrap();
        repo.upsert_neuron(&b).await.unwrap();
        repo.record_co_activation(a.id, b.id).await.unwrap();

        repo.reset_co_activation(a.id, b.id).await.unwrap();
        let all = repo.list_co_activations().await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_synapse_bounds_survive_round_trip() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteNeuronRepository::new(pool);

        let a = Neuron::new("a", NeuronType::Sensory, None);
        let b = Neuron::new("b", NeuronType::Motor, None);
        repo.upsert_neuron(&a).await.unwrap();
        repo.upsert_neuron(&b).await.unwrap();

        let mut synapse = Synapse::new(a.id, b.id);
        synapse.potentiate();
        repo.upsert_synapse(&synapse).await.unwrap();

        let fetched = repo.get_synapse(a.id, b.id).await.unwrap().unwrap();
        assert_eq!(fetched.state, SynapseState::Potentiated);
        assert!(fetched.weight > 0.1);
    }
}
