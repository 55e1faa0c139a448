//! Mutations -- infinite-sites mutations thrown on the local trees.
use definitions::{EngineError, GenotypeMatrix, MutationBlock, Tree, TreeRecord};
use rand::Rng;
use rand_distr::{Distribution, Poisson};

fn parents(tree: &Tree) -> Vec<Option<usize>> {
    let mut parents = vec![None; tree.nodes().len()];
    for (idx, node) in tree.nodes().iter().enumerate() {
        if let Some((l, r)) = node.children {
            parents[l] = Some(idx);
            parents[r] = Some(idx);
        }
    }
    parents
}

/// A branch of length `t` in a tree over `len` of the `num_loci` loci gets
/// Poisson(mutation_rate * t * len / num_loci) mutations, each at a uniform
/// position inside the tree's interval. Positions are scaled to [0, 1).
pub fn throw_mutations<R: Rng>(
    records: &[TreeRecord],
    mutation_rate: f64,
    num_loci: usize,
    sample_size: usize,
    rng: &mut R,
) -> Result<(MutationBlock, GenotypeMatrix), EngineError> {
    let mut sites: Vec<(f64, Vec<usize>)> = vec![];
    let m = num_loci as f64;
    let mut start = 0;
    for record in records {
        let (a, b) = (start, start + record.interval_length);
        start = b;
        if mutation_rate <= 0f64 {
            continue;
        }
        let scale = mutation_rate * (b - a) as f64 / m;
        let nodes = record.tree.nodes();
        for (node, parent) in parents(&record.tree).into_iter().enumerate() {
            let parent = match parent {
                Some(parent) => parent,
                None => continue,
            };
            let mean = scale * (nodes[parent].time - nodes[node].time);
            if !(0f64 < mean) {
                continue;
            }
            let poisson = Poisson::new(mean).map_err(|e| EngineError::Failed(e.to_string()))?;
            let count: f64 = poisson.sample(rng);
            if count < 1f64 {
                continue;
            }
            let carriers = record.tree.leaves_below(node);
            for _ in 0..count as usize {
                let position = (a as f64 + rng.gen::<f64>() * (b - a) as f64) / m;
                if position < b as f64 / m {
                    sites.push((position, carriers.clone()));
                }
            }
        }
    }
    sites.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal));
    sites.dedup_by(|x, y| x.0 == y.0);
    let mut rows = vec![vec![b'0'; sites.len()]; sample_size];
    for (column, (_, carriers)) in sites.iter().enumerate() {
        for &leaf in carriers.iter() {
            rows[leaf][column] = b'1';
        }
    }
    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(char::from).collect::<String>())
        .collect();
    let positions = sites.into_iter().map(|(position, _)| position).collect();
    Ok((MutationBlock { positions }, GenotypeMatrix { rows }))
}
