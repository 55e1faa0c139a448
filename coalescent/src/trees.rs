//! Local trees -- cut the ancestry into runs of loci that share one genealogy.
use crate::hudson::{Ancestry, Edge};
use definitions::{EngineError, Tree, TreeRecord};
use std::collections::{BTreeSet, HashMap};

/// Sweep the edges from left to right. Adjacent runs with the same set of
/// (parent, child) pairs are reported as one record.
pub fn local_trees(
    ancestry: &Ancestry,
    sample_size: usize,
    num_loci: usize,
) -> Result<Vec<TreeRecord>, EngineError> {
    let mut insertion: Vec<&Edge> = ancestry.edges.iter().collect();
    insertion.sort_by_key(|e| e.left);
    let mut removal: Vec<&Edge> = ancestry.edges.iter().collect();
    removal.sort_by_key(|e| e.right);
    let mut breakpoints: Vec<usize> = ancestry
        .edges
        .iter()
        .flat_map(|e| vec![e.left, e.right])
        .chain(vec![0, num_loci])
        .filter(|&x| x <= num_loci)
        .collect();
    breakpoints.sort_unstable();
    breakpoints.dedup();
    let mut active: BTreeSet<(usize, usize)> = BTreeSet::new();
    let mut runs: Vec<(usize, BTreeSet<(usize, usize)>)> = vec![];
    let (mut ins, mut rem) = (0, 0);
    for w in breakpoints.windows(2) {
        let (x, y) = (w[0], w[1]);
        while rem < removal.len() && removal[rem].right <= x {
            active.remove(&(removal[rem].parent, removal[rem].child));
            rem += 1;
        }
        while ins < insertion.len() && insertion[ins].left <= x {
            active.insert((insertion[ins].parent, insertion[ins].child));
            ins += 1;
        }
        if let Some((length, edges)) = runs.last_mut() {
            if *edges == active {
                *length += y - x;
                continue;
            }
        }
        runs.push((y - x, active.clone()));
    }
    runs.iter()
        .map(|(length, edges)| {
            let tree = build_tree(edges, &ancestry.node_times, sample_size)?;
            Ok(TreeRecord {
                interval_length: *length,
                tree,
            })
        })
        .collect()
}

fn build_tree(
    edges: &BTreeSet<(usize, usize)>,
    node_times: &[f64],
    sample_size: usize,
) -> Result<Tree, EngineError> {
    let mut families: Vec<(usize, Vec<usize>)> = vec![];
    for &(parent, child) in edges.iter() {
        if let Some((p, children)) = families.last_mut() {
            if *p == parent {
                children.push(child);
                continue;
            }
        }
        families.push((parent, vec![child]));
    }
    let mut tree = Tree::with_leaves(sample_size);
    let mut index: HashMap<usize, usize> = (0..sample_size).map(|i| (i, i)).collect();
    // Parents come in increasing order of creation, hence of time.
    for (parent, children) in families {
        let (l, r) = match *children.as_slice() {
            [l, r] => (index.get(&l).copied(), index.get(&r).copied()),
            _ => {
                let msg = format!("node {} has {} children", parent, children.len());
                return Err(EngineError::Failed(msg));
            }
        };
        match (l, r) {
            (Some(l), Some(r)) => {
                let idx = tree.join(l, r, node_times[parent]);
                index.insert(parent, idx);
            }
            _ => {
                let msg = format!("node {} joins an unknown node", parent);
                return Err(EngineError::Failed(msg));
            }
        }
    }
    Ok(tree)
}
