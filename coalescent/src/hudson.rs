//! Hudson's coalescent with recombination over discrete loci.
//!
//! Each lineage carries its ancestral material as sorted, disjoint runs of loci,
//! each run tagged by the node it descends through. Time runs backwards in units of
//! 4N generations: `k` lineages coalesce at rate `k(k-1)/size(t)` and every link
//! (gap between adjacent loci spanned by a lineage) recombines at `recombination_rate`.
//! A locus leaves the simulation as soon as its most recent common ancestor is found,
//! so the loop ends once every locus is resolved.
use crate::demography::Demography;
use definitions::EngineError;
use rand::Rng;
use rand_distr::Exp1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub left: usize,
    pub right: usize,
    pub node: usize,
}

type Lineage = Vec<Segment>;

fn links(lineage: &[Segment]) -> usize {
    match (lineage.first(), lineage.last()) {
        (Some(first), Some(last)) => last.right - first.left - 1,
        _ => 0,
    }
}

/// `parent` is the ancestor of `child` on loci `[left, right)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Edge {
    pub left: usize,
    pub right: usize,
    pub parent: usize,
    pub child: usize,
}

/// Nodes and edges of the whole ancestral history. Nodes `0..sample_size` are the
/// samples, later nodes are appended in order of time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ancestry {
    pub node_times: Vec<f64>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventCounts {
    pub coalescences: usize,
    /// Two lineages met but shared no locus.
    pub common_ancestors: usize,
    pub recombinations: usize,
    pub epoch_changes: usize,
    /// Time of the last event.
    pub time: f64,
}

impl std::ops::AddAssign for EventCounts {
    fn add_assign(&mut self, other: Self) {
        self.coalescences += other.coalescences;
        self.common_ancestors += other.common_ancestors;
        self.recombinations += other.recombinations;
        self.epoch_changes += other.epoch_changes;
        self.time += other.time;
    }
}

pub fn simulate<R: Rng>(
    sample_size: usize,
    num_loci: usize,
    recombination_rate: f64,
    demography: &Demography,
    rng: &mut R,
) -> Result<(Ancestry, EventCounts), EngineError> {
    if sample_size < 2 || num_loci == 0 {
        let msg = format!("{} samples over {} loci", sample_size, num_loci);
        return Err(EngineError::Failed(msg));
    }
    let mut ancestry = Ancestry {
        node_times: vec![0f64; sample_size],
        edges: vec![],
    };
    let mut counts = EventCounts::default();
    let mut lineages: Vec<Lineage> = (0..sample_size)
        .map(|node| {
            vec![Segment {
                left: 0,
                right: num_loci,
                node,
            }]
        })
        .collect();
    let mut pool = LocusPool {
        remaining: vec![sample_size; num_loci],
        unfinished: num_loci,
    };
    let (mut time, mut epoch) = (0f64, 0);
    while pool.unfinished > 0 {
        let k = lineages.len();
        if k < 2 {
            let msg = format!("{} loci unresolved with {} lineage", pool.unfinished, k);
            return Err(EngineError::Failed(msg));
        }
        let total_links: usize = lineages.iter().map(|l| links(l)).sum();
        let rec_rate = recombination_rate * total_links as f64;
        let rec_wait = if 0f64 < rec_rate {
            let unit: f64 = rng.sample(Exp1);
            unit / rec_rate
        } else {
            f64::INFINITY
        };
        let unit: f64 = rng.sample(Exp1);
        let coal_wait = demography.epochs()[epoch].waiting_time(time, (k * (k - 1)) as f64, unit);
        let wait = rec_wait.min(coal_wait);
        let next_start = demography.next_start(epoch);
        if wait.is_nan() || (wait.is_infinite() && next_start.is_infinite()) {
            let msg = format!("waiting time {} at time {} with {} lineages", wait, time, k);
            return Err(EngineError::Failed(msg));
        }
        if next_start <= time + wait {
            // Both processes are memoryless, so the draw is simply discarded.
            time = next_start;
            epoch += 1;
            counts.epoch_changes += 1;
            continue;
        }
        time += wait;
        if rec_wait < coal_wait {
            recombine(&mut lineages, total_links, rng);
            counts.recombinations += 1;
        } else if coalesce(&mut lineages, &mut ancestry, &mut pool, time, rng) {
            counts.coalescences += 1;
        } else {
            counts.common_ancestors += 1;
        }
    }
    counts.time = time;
    Ok((ancestry, counts))
}

/// How many lineages still carry each locus.
struct LocusPool {
    remaining: Vec<usize>,
    unfinished: usize,
}

fn recombine<R: Rng>(lineages: &mut Vec<Lineage>, total_links: usize, rng: &mut R) {
    let mut target = rng.gen_range(0..total_links);
    let idx = lineages.iter().position(|l| {
        let n = links(l);
        if target < n {
            true
        } else {
            target -= n;
            false
        }
    });
    let idx = match idx {
        Some(idx) => idx,
        None => return,
    };
    let lineage = &mut lineages[idx];
    let breakpoint = lineage[0].left + 1 + target;
    let (mut kept, mut right) = (vec![], vec![]);
    for seg in lineage.drain(..) {
        if seg.right <= breakpoint {
            kept.push(seg);
        } else if breakpoint <= seg.left {
            right.push(seg);
        } else {
            kept.push(Segment {
                right: breakpoint,
                ..seg
            });
            right.push(Segment {
                left: breakpoint,
                ..seg
            });
        }
    }
    *lineage = kept;
    lineages.push(right);
}

fn push_segment(lineage: &mut Lineage, left: usize, right: usize, node: usize) {
    if let Some(last) = lineage.last_mut() {
        if last.right == left && last.node == node {
            last.right = right;
            return;
        }
    }
    lineage.push(Segment { left, right, node });
}

/// The segment of `lineage` covering `x`, if any. `cursor` only moves forward.
fn covering(lineage: &[Segment], cursor: &mut usize, x: usize) -> Option<usize> {
    while *cursor < lineage.len() && lineage[*cursor].right <= x {
        *cursor += 1;
    }
    lineage
        .get(*cursor)
        .filter(|seg| seg.left <= x)
        .map(|seg| seg.node)
}

/// Merge two random lineages. Returns false if they shared no locus.
fn coalesce<R: Rng>(
    lineages: &mut Vec<Lineage>,
    ancestry: &mut Ancestry,
    pool: &mut LocusPool,
    time: f64,
    rng: &mut R,
) -> bool {
    let k = lineages.len();
    let i = rng.gen_range(0..k);
    let mut j = rng.gen_range(0..k - 1);
    if i <= j {
        j += 1;
    }
    let (i, j) = (i.min(j), i.max(j));
    let second = lineages.swap_remove(j);
    let first = lineages.swap_remove(i);
    let mut bounds: Vec<usize> = first
        .iter()
        .chain(second.iter())
        .flat_map(|s| vec![s.left, s.right])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();
    let mut parent = None;
    let mut merged: Lineage = vec![];
    let (mut p, mut q) = (0, 0);
    for w in bounds.windows(2) {
        let (x, y) = (w[0], w[1]);
        match (covering(&first, &mut p, x), covering(&second, &mut q, x)) {
            (None, None) => {}
            (Some(node), None) | (None, Some(node)) => push_segment(&mut merged, x, y, node),
            (Some(u), Some(v)) => {
                let parent = *parent.get_or_insert_with(|| {
                    ancestry.node_times.push(time);
                    ancestry.node_times.len() - 1
                });
                for child in [u, v].iter().copied() {
                    ancestry.edges.push(Edge {
                        left: x,
                        right: y,
                        parent,
                        child,
                    });
                }
                for locus in x..y {
                    pool.remaining[locus] -= 1;
                    if pool.remaining[locus] == 1 {
                        pool.unfinished -= 1;
                    } else {
                        push_segment(&mut merged, locus, locus + 1, parent);
                    }
                }
            }
        }
    }
    if !merged.is_empty() {
        lineages.push(merged);
    }
    parent.is_some()
}
