//! Definitions -- A tiny interface between the ms-compatible runner and the engines behind it.
//! The runner only sees [SimulationParameters](SimulationParameters) going in and
//! [Replicate](Replicate) values coming out of an [Engine](Engine). Everything else
//! (how the genealogies are sampled) lives on the other side of the trait.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound of each value in a legacy seed triple (16-bit, signed-positive).
pub const MAX_LEGACY_SEED: i64 = 65535;
/// Lower bound of each value in a legacy seed triple.
pub const MIN_LEGACY_SEED: i64 = 1;

/// Errors detected before any output is produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid random seeds: {0}")]
    InvalidSeed(String),
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Errors reported by an engine (or found in what it returned).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("malformed replicate: {0}")]
    Malformed(String),
    #[error("simulation failed: {0}")]
    Failed(String),
}

/// A demographic event descriptor. The runner passes these through to the engine untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum PopulationModel {
    /// The (relative) population size is `size` from `start_time` onwards.
    Constant { start_time: f64, size: f64 },
    /// The population shrinks backwards in time at rate `alpha` from `start_time` onwards.
    Exponential { start_time: f64, alpha: f64 },
}

impl PopulationModel {
    pub fn start_time(&self) -> f64 {
        match *self {
            PopulationModel::Constant { start_time, .. } => start_time,
            PopulationModel::Exponential { start_time, .. } => start_time,
        }
    }
}

fn default_num_loci() -> usize {
    1
}

fn default_precision() -> usize {
    3
}

/// Configuration of a run. Constructed once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationParameters {
    /// Number of sampled chromosomes. Leaves are labelled 1..=sample_size.
    pub sample_size: usize,
    #[serde(default = "default_num_loci")]
    pub num_loci: usize,
    /// Per-link recombination rate, scaled by 4N.
    #[serde(default)]
    pub recombination_rate: f64,
    pub num_replicates: usize,
    /// Theta (4N mu) over the whole sequence. Zero switches the mutation block off.
    #[serde(default)]
    pub mutation_rate: f64,
    #[serde(default)]
    pub print_trees: bool,
    /// Decimal digits for positions and branch lengths.
    #[serde(default = "default_precision")]
    pub precision: usize,
    #[serde(default)]
    pub population_models: Vec<PopulationModel>,
    /// Legacy seeds as given by the user. `None` means "draw them".
    #[serde(default)]
    pub random_seeds: Option<Vec<i64>>,
}

impl SimulationParameters {
    pub fn new(sample_size: usize, num_replicates: usize) -> Self {
        Self {
            sample_size,
            num_loci: default_num_loci(),
            recombination_rate: 0f64,
            num_replicates,
            mutation_rate: 0f64,
            print_trees: false,
            precision: default_precision(),
            population_models: vec![],
            random_seeds: None,
        }
    }
    /// Check every field against its domain. Seeds are checked by [SeedTriple::new].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_size < 2 {
            return Err(invalid("sample_size", format!("{} < 2", self.sample_size)));
        }
        if self.num_loci < 1 {
            return Err(invalid("num_loci", "must be at least 1".to_string()));
        }
        if self.num_replicates < 1 {
            return Err(invalid("num_replicates", "must be at least 1".to_string()));
        }
        check_rate("recombination_rate", self.recombination_rate)?;
        check_rate("mutation_rate", self.mutation_rate)?;
        if let Some(seeds) = self.random_seeds.as_ref() {
            SeedTriple::new(seeds)?;
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ConfigError {
    ConfigError::InvalidParameter { name, reason }
}

fn check_rate(name: &'static str, rate: f64) -> Result<(), ConfigError> {
    if !rate.is_finite() {
        Err(invalid(name, format!("{} is not finite", rate)))
    } else if rate < 0f64 {
        Err(invalid(name, format!("{} is negative", rate)))
    } else {
        Ok(())
    }
}

/// Three legacy seeds, each in [1, 65535].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeedTriple([u16; 3]);

impl SeedTriple {
    pub fn new(values: &[i64]) -> Result<Self, ConfigError> {
        let (s1, s2, s3) = match *values {
            [s1, s2, s3] => (s1, s2, s3),
            _ => {
                let msg = format!("expected 3 values, got {}", values.len());
                return Err(ConfigError::InvalidSeed(msg));
            }
        };
        let mut triple = [0u16; 3];
        for (slot, value) in triple.iter_mut().zip([s1, s2, s3]) {
            if !(MIN_LEGACY_SEED..=MAX_LEGACY_SEED).contains(&value) {
                let msg = format!("{} is out of [1, 65535]", value);
                return Err(ConfigError::InvalidSeed(msg));
            }
            *slot = value as u16;
        }
        Ok(Self(triple))
    }
    /// Three independent values, each uniform on [1, 65535].
    pub fn random<R: rand::Rng>(rng: &mut R) -> Self {
        let mut draw = || rng.gen_range(1..=u16::MAX);
        Self([draw(), draw(), draw()])
    }
    pub fn values(&self) -> [u16; 3] {
        self.0
    }
}

impl std::fmt::Display for SeedTriple {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let [s1, s2, s3] = self.0;
        write!(f, "{} {} {}", s1, s2, s3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeNode {
    /// Time of the node, in units of 4N generations. Leaves are at zero.
    pub time: f64,
    pub children: Option<(usize, usize)>,
}

/// A rooted binary genealogy. Nodes `0..sample_size` are the leaves (label = index + 1),
/// the rest are internal nodes appended by [Tree::join]. The last node is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    sample_size: usize,
    nodes: Vec<TreeNode>,
}

impl Tree {
    pub fn with_leaves(sample_size: usize) -> Self {
        let leaf = TreeNode {
            time: 0f64,
            children: None,
        };
        Self {
            sample_size,
            nodes: vec![leaf; sample_size],
        }
    }
    /// Add a parent of `left` and `right` at `time`, returning its index.
    pub fn join(&mut self, left: usize, right: usize, time: f64) -> usize {
        self.nodes.push(TreeNode {
            time,
            children: Some((left, right)),
        });
        self.nodes.len() - 1
    }
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }
    pub fn root(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.sample_size
    }
    /// Indices of the leaves below `node`, in increasing order.
    pub fn leaves_below(&self, node: usize) -> Vec<usize> {
        let mut leaves = vec![];
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            match self.nodes[n].children {
                Some((l, r)) => stack.extend([l, r]),
                None => leaves.push(n),
            }
        }
        leaves.sort_unstable();
        leaves
    }
    /// Every non-root node has exactly one parent, which comes later in index and
    /// is not younger in time.
    pub fn check(&self) -> Result<(), EngineError> {
        let n = self.sample_size;
        if self.nodes.len() + 1 != 2 * n {
            let msg = format!("{} nodes for {} leaves", self.nodes.len(), n);
            return Err(EngineError::Malformed(msg));
        }
        let mut has_parent = vec![false; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            match (idx < n, node.children) {
                (true, None) | (false, Some(_)) => {}
                (true, Some(_)) => {
                    return Err(EngineError::Malformed(format!("leaf {} has children", idx + 1)))
                }
                (false, None) => {
                    return Err(EngineError::Malformed(format!("internal node {idx} is empty")))
                }
            }
            if let Some((l, r)) = node.children {
                for child in [l, r] {
                    if idx <= child || has_parent[child] {
                        let msg = format!("node {child} is not a proper child of {idx}");
                        return Err(EngineError::Malformed(msg));
                    }
                    if !(self.nodes[child].time <= node.time) {
                        let msg = format!("node {child} is older than its parent {idx}");
                        return Err(EngineError::Malformed(msg));
                    }
                    has_parent[child] = true;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeRecord {
    /// Number of loci this tree spans.
    pub interval_length: usize,
    pub tree: Tree,
}

/// Segregating sites of a replicate. Positions are strictly increasing in [0, 1).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MutationBlock {
    pub positions: Vec<f64>,
}

impl MutationBlock {
    pub fn site_count(&self) -> usize {
        self.positions.len()
    }
}

/// One row per sample, each a string over {0,1} of length `site_count`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenotypeMatrix {
    pub rows: Vec<String>,
}

/// The output of one engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Replicate {
    pub trees: Vec<TreeRecord>,
    pub mutations: MutationBlock,
    pub genotypes: GenotypeMatrix,
}

impl Replicate {
    /// Check the structural promises an engine makes about a replicate.
    pub fn check(&self, params: &SimulationParameters) -> Result<(), EngineError> {
        let malformed = |msg: String| Err(EngineError::Malformed(msg));
        if self.trees.is_empty() {
            return malformed("no trees".to_string());
        }
        let mut total = 0;
        for record in self.trees.iter() {
            if record.interval_length == 0 {
                return malformed("empty interval".to_string());
            }
            if record.tree.sample_size() != params.sample_size {
                let msg = format!("tree over {} leaves", record.tree.sample_size());
                return malformed(msg);
            }
            record.tree.check()?;
            total += record.interval_length;
        }
        if total != params.num_loci {
            let msg = format!("intervals sum to {} instead of {}", total, params.num_loci);
            return malformed(msg);
        }
        let positions = &self.mutations.positions;
        if positions.iter().any(|&x| !(0f64..1f64).contains(&x)) {
            return malformed("position outside [0,1)".to_string());
        }
        if positions.windows(2).any(|w| !(w[0] < w[1])) {
            return malformed("positions are not strictly increasing".to_string());
        }
        let site_count = self.mutations.site_count();
        if self.genotypes.rows.len() != params.sample_size {
            let msg = format!("{} genotype rows", self.genotypes.rows.len());
            return malformed(msg);
        }
        for row in self.genotypes.rows.iter() {
            if row.len() != site_count || row.bytes().any(|b| b != b'0' && b != b'1') {
                return malformed(format!("bad genotype row `{}`", row));
            }
        }
        Ok(())
    }
}

/// Something that turns parameters and a random stream into replicates.
///
/// The stream is owned by the caller and shared by every invocation in a run, so
/// an engine must draw from `rng` only, never from a generator of its own.
pub trait Engine {
    fn simulate<R: rand::Rng>(
        &mut self,
        params: &SimulationParameters,
        rng: &mut R,
    ) -> Result<Replicate, EngineError>;
}
