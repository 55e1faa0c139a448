//! Runner -- drives an engine `num_replicates` times and writes the ms stream.
use crate::error::RunError;
use crate::format::ReplicateFormatter;
use crate::seeds;
use definitions::{Engine, SeedTriple, SimulationParameters};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use std::io::Write;

/// The generator every replicate of a run draws from.
pub type RunRng = Xoshiro256PlusPlus;

/// What a finished run resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub seeds: SeedTriple,
    pub derived_seed: u64,
    pub replicates: usize,
}

pub struct SimulationRunner<E: Engine> {
    params: SimulationParameters,
    /// Echoed verbatim as the first line.
    command_line: String,
    engine: E,
}

impl<E: Engine> SimulationRunner<E> {
    /// Fails on out-of-domain parameters, so nothing is ever written for them.
    pub fn new(
        params: SimulationParameters,
        command_line: &str,
        engine: E,
    ) -> Result<Self, RunError> {
        params.validate()?;
        Ok(Self {
            params,
            command_line: command_line.to_string(),
            engine,
        })
    }
    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }
    pub fn engine(&self) -> &E {
        &self.engine
    }
    /// Write the whole stream into `sink`.
    ///
    /// `entropy` is only used when the parameters carry no seeds. The sink is
    /// flushed after every replicate and once more on the way out, whether the run
    /// succeeded or not.
    pub fn run<W: Write, R: Rng>(
        &mut self,
        sink: &mut W,
        entropy: &mut R,
    ) -> Result<RunSummary, RunError> {
        let (derived_seed, seeds) = seeds::derive(self.params.random_seeds.as_deref(), entropy)?;
        info!("SEEDS\t{}\t{}", seeds, derived_seed);
        let mut rng: RunRng = SeedableRng::seed_from_u64(derived_seed);
        let written = self.write_stream(sink, &mut rng, &seeds);
        let flushed = sink.flush();
        match (written, flushed) {
            (Err(why), Err(flush)) => {
                warn!("FLUSH\t{}", flush);
                Err(why)
            }
            (Err(why), Ok(_)) => Err(why),
            (Ok(_), Err(flush)) => Err(RunError::Sink(flush)),
            (Ok(replicates), Ok(_)) => Ok(RunSummary {
                seeds,
                derived_seed,
                replicates,
            }),
        }
    }
    fn write_stream<W: Write>(
        &mut self,
        sink: &mut W,
        rng: &mut RunRng,
        seeds: &SeedTriple,
    ) -> Result<usize, RunError> {
        writeln!(sink, "{}", self.command_line)?;
        writeln!(sink, "{}", seeds)?;
        let formatter = ReplicateFormatter::from_parameters(&self.params);
        for replicate in 1..=self.params.num_replicates {
            debug!("START\tReplicate\t{}", replicate);
            let result = self
                .engine
                .simulate(&self.params, rng)
                .and_then(|rep| rep.check(&self.params).map(|_| rep));
            let rep = match result {
                Ok(rep) => rep,
                Err(source) => {
                    error!("FAILED\tReplicate\t{}\t{}", replicate, source);
                    return Err(RunError::Engine { replicate, source });
                }
            };
            write!(sink, "\n//\n{}", formatter.block(&rep))?;
            sink.flush()?;
            trace!(
                "END\tReplicate\t{}\t{}\t{}",
                replicate,
                rep.trees.len(),
                rep.mutations.site_count()
            );
        }
        Ok(self.params.num_replicates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader;
    use definitions::{EngineError, GenotypeMatrix, MutationBlock, Replicate, Tree, TreeRecord};
    use std::io;
    /// Engine returning a fixed replicate; it records one draw per call and can be told to fail.
    struct ScriptedEngine {
        fail_at: Option<usize>,
        calls: usize,
        draws: Vec<u64>,
        replicate: Replicate,
    }
    impl ScriptedEngine {
        fn new(replicate: Replicate) -> Self {
            Self {
                fail_at: None,
                calls: 0,
                draws: vec![],
                replicate,
            }
        }
    }
    impl Engine for ScriptedEngine {
        fn simulate<R: Rng>(
            &mut self,
            _: &SimulationParameters,
            rng: &mut R,
        ) -> Result<Replicate, EngineError> {
            self.calls += 1;
            self.draws.push(rng.gen());
            if self.fail_at == Some(self.calls) {
                return Err(EngineError::Failed("scripted".to_string()));
            }
            Ok(self.replicate.clone())
        }
    }
    fn two_trees() -> Replicate {
        let mut first = Tree::with_leaves(2);
        first.join(0, 1, 0.4);
        let mut second = Tree::with_leaves(2);
        second.join(1, 0, 0.9);
        Replicate {
            trees: vec![
                TreeRecord {
                    interval_length: 4,
                    tree: first,
                },
                TreeRecord {
                    interval_length: 6,
                    tree: second,
                },
            ],
            mutations: MutationBlock {
                positions: vec![0.25, 0.75],
            },
            genotypes: GenotypeMatrix {
                rows: vec!["10".to_string(), "01".to_string()],
            },
        }
    }
    fn params(num_replicates: usize) -> SimulationParameters {
        let mut params = SimulationParameters::new(2, num_replicates);
        params.num_loci = 10;
        params.print_trees = true;
        params.mutation_rate = 1.0;
        params.random_seeds = Some(vec![1, 2, 3]);
        params
    }
    fn entropy() -> Xoshiro256PlusPlus {
        SeedableRng::seed_from_u64(8)
    }
    /// A sink that accepts `capacity` bytes and then refuses everything.
    struct FailingSink {
        written: Vec<u8>,
        capacity: usize,
    }
    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() + buf.len() > self.capacity {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    #[test]
    fn full_stream() {
        for num_replicates in 1..10 {
            let engine = ScriptedEngine::new(two_trees());
            let mut runner =
                SimulationRunner::new(params(num_replicates), "mspms 2 x", engine).unwrap();
            let mut out: Vec<u8> = vec![];
            let summary = runner.run(&mut out, &mut entropy()).unwrap();
            assert_eq!(summary.replicates, num_replicates);
            assert_eq!(summary.derived_seed, (1 << 32) + (2 << 16) + 3);
            let text = String::from_utf8(out).unwrap();
            assert_eq!(text.matches("//\n").count(), num_replicates);
            let stream = reader::parse(&text).unwrap();
            assert_eq!(stream.command_line, "mspms 2 x");
            assert_eq!(stream.seeds, vec![1, 2, 3]);
            assert_eq!(stream.replicates.len(), num_replicates);
            for block in stream.replicates.iter() {
                assert_eq!(block.total_interval_length(10), Some(10));
                assert_eq!(block.segsites, Some(2));
                assert_eq!(block.positions, vec!["0.250", "0.750"]);
                assert_eq!(block.haplotypes, vec!["10", "01"]);
            }
        }
    }
    #[test]
    fn exact_text() {
        let engine = ScriptedEngine::new(two_trees());
        let mut runner = SimulationRunner::new(params(1), "cmd", engine).unwrap();
        let mut out: Vec<u8> = vec![];
        runner.run(&mut out, &mut entropy()).unwrap();
        let expected = concat!(
            "cmd\n1 2 3\n\n//\n",
            "[4](1:0.400,2:0.400);\n[6](2:0.900,1:0.900);\n",
            "segsites: 2\npositions: 0.250 0.750\n10\n01\n",
        );
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }
    #[test]
    fn one_tree_over_many_loci_is_bracketed() {
        let mut rep = two_trees();
        rep.trees.truncate(1);
        rep.trees[0].interval_length = 10;
        let mut runner = SimulationRunner::new(params(2), "cmd", ScriptedEngine::new(rep)).unwrap();
        let mut out: Vec<u8> = vec![];
        runner.run(&mut out, &mut entropy()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("\n[10](1:0.400,2:0.400);\n").count(), 2);
        let stream = reader::parse(&text).unwrap();
        for block in stream.replicates.iter() {
            assert_eq!(block.total_interval_length(10), Some(10));
        }
    }
    #[test]
    fn one_continuous_stream() {
        let engine = ScriptedEngine::new(two_trees());
        let mut runner = SimulationRunner::new(params(5), "cmd", engine).unwrap();
        let summary = runner.run(&mut io::sink(), &mut entropy()).unwrap();
        let mut rng: RunRng = SeedableRng::seed_from_u64(summary.derived_seed);
        let expected: Vec<u64> = (0..5).map(|_| rng.gen()).collect();
        assert_eq!(runner.engine().draws, expected);
        let engine = ScriptedEngine::new(two_trees());
        let mut again = SimulationRunner::new(params(5), "cmd", engine).unwrap();
        again.run(&mut io::sink(), &mut entropy()).unwrap();
        assert_eq!(again.engine().draws, expected);
    }
    #[test]
    fn drawn_seeds_are_echoed() {
        let mut p = params(2);
        p.random_seeds = None;
        let engine = ScriptedEngine::new(two_trees());
        let mut runner = SimulationRunner::new(p, "cmd", engine).unwrap();
        let mut out: Vec<u8> = vec![];
        let summary = runner.run(&mut out, &mut entropy()).unwrap();
        let stream = reader::parse(&String::from_utf8(out).unwrap()).unwrap();
        let echoed: Vec<i64> = summary.seeds.values().iter().map(|&x| x as i64).collect();
        assert_eq!(stream.seeds, echoed);
        assert!(stream.seeds.iter().all(|&s| (1..=65535).contains(&s)));
    }
    #[test]
    fn engine_failure_stops_the_run() {
        let mut engine = ScriptedEngine::new(two_trees());
        engine.fail_at = Some(3);
        let mut runner = SimulationRunner::new(params(6), "cmd", engine).unwrap();
        let mut out: Vec<u8> = vec![];
        match runner.run(&mut out, &mut entropy()) {
            Err(RunError::Engine { replicate, .. }) => assert_eq!(replicate, 3),
            other => panic!("{:?}", other),
        }
        assert_eq!(runner.engine().calls, 3);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("//\n").count(), 2);
    }
    #[test]
    fn malformed_replicate_is_an_engine_failure() {
        let mut broken = two_trees();
        broken.trees[1].interval_length = 5;
        let engine = ScriptedEngine::new(broken);
        let mut runner = SimulationRunner::new(params(2), "cmd", engine).unwrap();
        let mut out: Vec<u8> = vec![];
        match runner.run(&mut out, &mut entropy()) {
            Err(RunError::Engine { replicate, source }) => {
                assert_eq!(replicate, 1);
                assert!(matches!(source, EngineError::Malformed(_)));
            }
            other => panic!("{:?}", other),
        }
        assert_eq!(runner.engine().calls, 1);
    }
    #[test]
    fn invalid_input_writes_nothing() {
        let mut p = params(1);
        p.sample_size = 1;
        assert!(SimulationRunner::new(p, "cmd", ScriptedEngine::new(two_trees())).is_err());
        let mut p = params(1);
        p.random_seeds = Some(vec![0, 1, 2]);
        assert!(matches!(
            SimulationRunner::new(p, "cmd", ScriptedEngine::new(two_trees())),
            Err(RunError::Config(_))
        ));
    }
    #[test]
    fn sink_failure_is_fatal() {
        let engine = ScriptedEngine::new(two_trees());
        let mut runner = SimulationRunner::new(params(9), "cmd", engine).unwrap();
        let mut sink = FailingSink {
            written: vec![],
            capacity: 100,
        };
        let result = runner.run(&mut sink, &mut entropy());
        assert!(matches!(result, Err(RunError::Sink(_))));
        assert!(runner.engine().calls < 9);
        assert!(sink.written.len() <= 100);
    }
}
