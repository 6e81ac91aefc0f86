//! The mutation-driven population loop.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::evaluator::Evaluator;
use crate::config::EvolveConfig;
use crate::graph::Network;
use crate::methods::{Crossover, Selection};
use crate::stats::{GenerationStats, StatsHistory};

/// A population of network genomes evolving against an external evaluator.
pub struct Population {
    pub input: usize,
    pub output: usize,
    pub config: EvolveConfig,
    /// Current genomes; sorted best-first after each [`evolve`](Self::evolve).
    pub members: Vec<Network>,
    pub generation: usize,
    pub history: StatsHistory,
}

impl Population {
    /// Seed a population of minimal networks.
    pub fn new(input: usize, output: usize, config: EvolveConfig) -> Self {
        let members = (0..config.population.size)
            .map(|_| Network::new(input, output))
            .collect();
        Self {
            input,
            output,
            config,
            members,
            generation: 0,
            history: StatsHistory::new(),
        }
    }

    /// Score every unscored member through the evaluator.
    ///
    /// Results arrive in any order and are matched back to members by
    /// handle. A failed evaluation demotes the genome to the worst possible
    /// fitness instead of aborting the generation.
    pub fn score(&mut self, evaluator: &mut dyn Evaluator) {
        let clear = self.config.population.clear_on_evaluate;
        let mut submitted: HashMap<u64, usize> = HashMap::new();
        for (index, member) in self.members.iter_mut().enumerate() {
            if member.score.is_some() {
                continue;
            }
            if clear {
                member.clear();
            }
            submitted.insert(evaluator.submit(member), index);
        }

        while !submitted.is_empty() {
            let Some((handle, result)) = evaluator.recv() else {
                break;
            };
            let Some(index) = submitted.remove(&handle) else {
                continue;
            };
            match result {
                Ok(fitness) => self.members[index].score = Some(fitness),
                Err(error) => {
                    log::warn!("evaluation of genome {} failed: {}", index, error);
                    self.members[index].score = Some(f64::NEG_INFINITY);
                }
            }
        }
        for (_, index) in submitted {
            log::warn!("genome {} was never evaluated", index);
            self.members[index].score = Some(f64::NEG_INFINITY);
        }
    }

    /// Advance one generation; returns the best fitness among the parents.
    pub fn evolve(&mut self, evaluator: &mut dyn Evaluator) -> f64 {
        self.score(evaluator);
        self.sort_members();
        let best = self
            .members
            .first()
            .and_then(|m| m.score)
            .unwrap_or(f64::NEG_INFINITY);
        self.record_stats();

        let log_every = self.config.logging.log_every;
        if log_every > 0 && self.generation % log_every == 0 {
            log::info!(
                "generation {}: best {:.6}, population {}",
                self.generation,
                best,
                self.members.len()
            );
        }

        let size = self.config.population.size;
        let elitism = self.config.population.elitism.min(self.members.len());
        let mut next: Vec<Network> = Vec::with_capacity(size);
        for member in self.members.iter().take(elitism) {
            next.push(member.clone());
        }
        for _ in 0..self.config.population.provenance {
            if next.len() >= size {
                break;
            }
            next.push(Network::new(self.input, self.output));
        }

        let mut rng = rand::thread_rng();
        while next.len() < size {
            next.push(self.breed(&mut rng));
        }

        // Elites pass through untouched; everything else may mutate.
        let rate = self.config.variation.mutation_rate;
        let amount = self.config.variation.mutation_amount;
        for member in next.iter_mut().skip(elitism) {
            if rng.gen::<f64>() <= rate {
                for _ in 0..amount {
                    if let Some(method) = self.config.variation.mutation.choose(&mut rng) {
                        member.mutate_with(method, &mut rng);
                    }
                }
                member.score = None;
            }
        }

        self.members = next;
        self.generation += 1;
        best
    }

    /// The best member, if the population has been scored and sorted.
    pub fn best(&self) -> Option<&Network> {
        self.members.first()
    }

    fn sort_members(&mut self) {
        self.members.sort_by(|a, b| {
            b.score
                .unwrap_or(f64::NEG_INFINITY)
                .partial_cmp(&a.score.unwrap_or(f64::NEG_INFINITY))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn record_stats(&mut self) {
        let scores: Vec<f64> = self
            .members
            .iter()
            .map(|m| m.score.unwrap_or(f64::NEG_INFINITY))
            .collect();
        let count = scores.len().max(1) as f64;
        let stats = GenerationStats {
            generation: self.generation,
            best: scores.first().copied().unwrap_or(f64::NEG_INFINITY),
            mean: scores.iter().sum::<f64>() / count,
            worst: scores.last().copied().unwrap_or(f64::NEG_INFINITY),
            mean_nodes: self.members.iter().map(|m| m.nodes.len()).sum::<usize>() as f64 / count,
            mean_connections: self.members.iter().map(|m| m.connections.len()).sum::<usize>()
                as f64
                / count,
        };
        self.history.record(stats);
    }

    fn breed<R: Rng>(&self, rng: &mut R) -> Network {
        let parent1 = self.select_parent(rng);
        let parent2 = self.select_parent(rng);
        let method = self
            .config
            .variation
            .crossover
            .choose(rng)
            .copied()
            .unwrap_or(Crossover::Uniform);
        // Same population, same shape; crossover cannot fail here.
        Network::offspring(parent1, parent2, &method).unwrap_or_else(|_| parent1.clone())
    }

    /// Draw a parent from the sorted, scored population.
    fn select_parent<R: Rng>(&self, rng: &mut R) -> &Network {
        let members = &self.members;
        match self.config.selection {
            Selection::Power { power } => {
                let index = (rng.gen::<f64>().powf(power) * members.len() as f64) as usize;
                &members[index.min(members.len() - 1)]
            }
            Selection::FitnessProportionate => {
                let scores: Vec<f64> = members
                    .iter()
                    .map(|m| m.score.unwrap_or(f64::NEG_INFINITY))
                    .collect();
                let minimum = scores.iter().copied().fold(f64::INFINITY, f64::min);
                let shift = if minimum < 0.0 { -minimum } else { 0.0 };
                let total: f64 = scores.iter().map(|s| s + shift).sum();
                if total <= 0.0 {
                    return members
                        .choose(rng)
                        .unwrap_or(&members[0]);
                }
                let mut remaining = rng.gen::<f64>() * total;
                for (member, score) in members.iter().zip(&scores) {
                    let value = score + shift;
                    if remaining < value {
                        return member;
                    }
                    remaining -= value;
                }
                &members[members.len() - 1]
            }
            Selection::Tournament { size, probability } => {
                let size = size.min(members.len()).max(1);
                let mut bracket: Vec<&Network> = members.choose_multiple(rng, size).collect();
                bracket.sort_by(|a, b| {
                    b.score
                        .unwrap_or(f64::NEG_INFINITY)
                        .partial_cmp(&a.score.unwrap_or(f64::NEG_INFINITY))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                for (i, &member) in bracket.iter().enumerate() {
                    if rng.gen::<f64>() < probability || i == size - 1 {
                        return member;
                    }
                }
                bracket[size - 1]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolve::InProcessEvaluator;
    use crate::methods::Cost;

    fn xor_dataset() -> Vec<(Vec<f64>, Vec<f64>)> {
        vec![
            (vec![0.0, 0.0], vec![0.0]),
            (vec![0.0, 1.0], vec![1.0]),
            (vec![1.0, 0.0], vec![1.0]),
            (vec![1.0, 1.0], vec![0.0]),
        ]
    }

    fn small_config() -> EvolveConfig {
        let mut config = EvolveConfig::default();
        config.population.size = 20;
        config.population.elitism = 2;
        config.population.provenance = 1;
        config
    }

    #[test]
    fn test_score_assigns_every_member() {
        let mut population = Population::new(2, 1, small_config());
        let mut evaluator = InProcessEvaluator::new(xor_dataset(), Cost::Mse);
        population.score(&mut evaluator);
        assert!(population.members.iter().all(|m| m.score.is_some()));
    }

    #[test]
    fn test_evolve_keeps_population_shape() {
        let mut population = Population::new(2, 1, small_config());
        let mut evaluator = InProcessEvaluator::new(xor_dataset(), Cost::Mse);
        for _ in 0..3 {
            population.evolve(&mut evaluator);
        }
        assert_eq!(population.generation, 3);
        assert_eq!(population.members.len(), 20);
        assert!(population.members.iter().all(|m| m.is_valid()));
        assert_eq!(population.history.snapshots.len(), 3);
    }

    #[test]
    fn test_elitism_keeps_best_from_regressing() {
        let mut population = Population::new(2, 1, small_config());
        let mut evaluator = InProcessEvaluator::new(xor_dataset(), Cost::Mse);
        let mut previous = f64::NEG_INFINITY;
        for _ in 0..8 {
            let best = population.evolve(&mut evaluator);
            assert!(best >= previous, "best fitness regressed: {} < {}", best, previous);
            previous = best;
        }
    }

    #[test]
    fn test_selection_methods_return_members() {
        for selection in [
            Selection::Power { power: 4.0 },
            Selection::FitnessProportionate,
            Selection::tournament(),
        ] {
            let mut config = small_config();
            config.selection = selection;
            let mut population = Population::new(2, 1, config);
            let mut evaluator = InProcessEvaluator::new(xor_dataset(), Cost::Mse);
            population.score(&mut evaluator);
            population.sort_members();
            let mut rng = rand::thread_rng();
            for _ in 0..20 {
                let parent = population.select_parent(&mut rng);
                assert!(parent.score.is_some());
            }
        }
    }
}
