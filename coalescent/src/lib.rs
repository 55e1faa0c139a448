//! Coalescent -- a compact reference engine for the ms-compatible runner.
//!
//! Replicates are sampled with Hudson's algorithm over discrete loci ([hudson]),
//! cut into local trees ([trees]) and decorated with infinite-sites mutations
//! ([mutations]). Every random number comes from the generator handed in by the
//! caller.
pub mod demography;
pub mod hudson;
pub mod mutations;
pub mod trees;
#[macro_use]
extern crate log;

use definitions::{ConfigError, Engine, EngineError, Replicate, SimulationParameters};
use demography::Demography;
use hudson::EventCounts;
use rand::Rng;

pub struct Coalescent {
    demography: Demography,
    /// Event counters summed over the replicates simulated so far.
    totals: EventCounts,
    replicates: usize,
}

impl Coalescent {
    /// Fails if the population models do not describe a valid history.
    pub fn new(params: &SimulationParameters) -> Result<Self, ConfigError> {
        let demography = Demography::new(&params.population_models)?;
        debug!("Coalescent\t{} epochs", demography.epochs().len());
        Ok(Self {
            demography,
            totals: EventCounts::default(),
            replicates: 0,
        })
    }
    pub fn demography(&self) -> &Demography {
        &self.demography
    }
    pub fn totals(&self) -> &EventCounts {
        &self.totals
    }
    pub fn replicates(&self) -> usize {
        self.replicates
    }
}

impl Engine for Coalescent {
    fn simulate<R: Rng>(
        &mut self,
        params: &SimulationParameters,
        rng: &mut R,
    ) -> Result<Replicate, EngineError> {
        let (sample_size, num_loci) = (params.sample_size, params.num_loci);
        let (ancestry, counts) = hudson::simulate(
            sample_size,
            num_loci,
            params.recombination_rate,
            &self.demography,
            rng,
        )?;
        let trees = trees::local_trees(&ancestry, sample_size, num_loci)?;
        let (mutations, genotypes) =
            mutations::throw_mutations(&trees, params.mutation_rate, num_loci, sample_size, rng)?;
        debug!(
            "STATS\t{}\t{}\t{}\t{}\t{}\t{:.4}",
            counts.coalescences,
            counts.recombinations,
            counts.common_ancestors,
            trees.len().saturating_sub(1),
            mutations.site_count(),
            counts.time
        );
        self.totals += counts;
        self.replicates += 1;
        Ok(Replicate {
            trees,
            mutations,
            genotypes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use definitions::PopulationModel;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    fn mean_tmrca(params: &SimulationParameters, reps: usize, seed: u64) -> f64 {
        let mut engine = Coalescent::new(params).unwrap();
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(seed);
        for _ in 0..reps {
            engine.simulate(params, &mut rng).unwrap();
        }
        assert_eq!(engine.replicates(), reps);
        engine.totals().time / reps as f64
    }
    #[test]
    fn replicates_are_well_formed() {
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(24);
        for &(n, loci, rho, theta) in &[(2, 1, 0.0, 1.0), (10, 1, 0.0, 5.0), (5, 40, 0.2, 3.0)] {
            let mut params = SimulationParameters::new(n, 10);
            params.num_loci = loci;
            params.recombination_rate = rho;
            params.mutation_rate = theta;
            let mut engine = Coalescent::new(&params).unwrap();
            for _ in 0..10 {
                let rep = engine.simulate(&params, &mut rng).unwrap();
                assert!(rep.check(&params).is_ok());
            }
            assert_eq!(engine.replicates(), 10);
            assert!(engine.totals().coalescences >= 10 * (n - 1));
        }
    }
    #[test]
    fn same_stream_same_replicates() {
        let mut params = SimulationParameters::new(6, 3);
        params.num_loci = 20;
        params.recombination_rate = 0.5;
        params.mutation_rate = 2.0;
        let run = |seed: u64| {
            let mut engine = Coalescent::new(&params).unwrap();
            let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(seed);
            (0..3)
                .map(|_| engine.simulate(&params, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(5), run(5));
        assert_ne!(run(5), run(6));
    }
    #[test]
    fn high_recombination_gives_several_trees() {
        let mut params = SimulationParameters::new(2, 20);
        params.num_loci = 10;
        params.recombination_rate = 100.0 / 9.0;
        let mut engine = Coalescent::new(&params).unwrap();
        let mut rng: Xoshiro256PlusPlus = SeedableRng::seed_from_u64(2);
        let reps: Vec<_> = (0..20)
            .map(|_| engine.simulate(&params, &mut rng).unwrap())
            .collect();
        assert!(reps.iter().any(|rep| rep.trees.len() > 1));
        for rep in reps {
            let total: usize = rep.trees.iter().map(|t| t.interval_length).sum();
            assert_eq!(total, 10);
        }
        let mut params = SimulationParameters::new(5, 10);
        params.num_loci = 10;
        let mut engine = Coalescent::new(&params).unwrap();
        for _ in 0..10 {
            assert_eq!(engine.simulate(&params, &mut rng).unwrap().trees.len(), 1);
        }
    }
    #[test]
    fn pairwise_coalescence_time() {
        // E[T_MRCA] of two samples is 1/2 in units of 4N generations.
        let params = SimulationParameters::new(2, 1);
        let mean = mean_tmrca(&params, 4000, 31);
        assert!((mean - 0.5).abs() < 0.05, "{}", mean);
        let mut params = SimulationParameters::new(2, 1);
        params.population_models = vec![PopulationModel::Constant {
            start_time: 0.0,
            size: 0.5,
        }];
        let mean = mean_tmrca(&params, 4000, 31);
        assert!((mean - 0.25).abs() < 0.025, "{}", mean);
    }
    #[test]
    fn growth_shortens_genealogies() {
        let constant = SimulationParameters::new(8, 1);
        let mut growing = SimulationParameters::new(8, 1);
        growing.population_models = vec![PopulationModel::Exponential {
            start_time: 0.0,
            alpha: 10.0,
        }];
        let slow = mean_tmrca(&constant, 500, 3);
        let fast = mean_tmrca(&growing, 500, 3);
        assert!(fast < slow, "{} {}", fast, slow);
    }
    #[test]
    fn invalid_models_are_rejected() {
        let mut params = SimulationParameters::new(4, 1);
        params.population_models = vec![PopulationModel::Constant {
            start_time: 0.0,
            size: -1.0,
        }];
        assert!(Coalescent::new(&params).is_err());
    }
}
