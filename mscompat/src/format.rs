//! Format -- rendering a replicate into its ms text block.
//!
//! A block is everything after the `//` line of a replicate:
//! ```text
//! [interval]tree;            (only when trees are printed; bracketed iff num_loci > 1)
//! segsites: <n>              (only when the mutation rate is positive)
//! positions: <p1> ... <pn>   (or a single blank line when n = 0)
//! <one 0/1 row per sample>
//! ```
//! Branch lengths and positions are printed with exactly `precision` decimals.
//! At precision zero they are rounded to the nearest integer and printed without
//! a decimal point.
use definitions::{Replicate, SimulationParameters, Tree};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicateFormatter {
    precision: usize,
    print_trees: bool,
    mutation_rate: f64,
    num_loci: usize,
}

impl ReplicateFormatter {
    pub fn new(precision: usize, print_trees: bool, mutation_rate: f64, num_loci: usize) -> Self {
        Self {
            precision,
            print_trees,
            mutation_rate,
            num_loci,
        }
    }
    pub fn from_parameters(params: &SimulationParameters) -> Self {
        Self::new(
            params.precision,
            params.print_trees,
            params.mutation_rate,
            params.num_loci,
        )
    }
    /// The text block of `replicate`, newline terminated.
    pub fn format(&self, replicate: &Replicate) -> String {
        self.block(replicate).to_string()
    }
    /// Lazy version of [ReplicateFormatter::format], to be written straight into a sink.
    pub fn block<'a>(&'a self, replicate: &'a Replicate) -> ReplicateBlock<'a> {
        ReplicateBlock {
            formatter: self,
            replicate,
        }
    }
}

pub struct ReplicateBlock<'a> {
    formatter: &'a ReplicateFormatter,
    replicate: &'a Replicate,
}

impl fmt::Display for ReplicateBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let precision = self.formatter.precision;
        let replicate = self.replicate;
        if self.formatter.print_trees {
            // A multi-locus run brackets every tree, even a single one spanning all loci.
            let bracketed = 1 < self.formatter.num_loci;
            for record in replicate.trees.iter() {
                let newick = Newick::new(&record.tree, precision);
                if bracketed {
                    writeln!(f, "[{}]{}", record.interval_length, newick)?;
                } else {
                    writeln!(f, "{}", newick)?;
                }
            }
        }
        if self.formatter.mutation_rate > 0f64 {
            let positions = &replicate.mutations.positions;
            writeln!(f, "segsites: {}", positions.len())?;
            if positions.is_empty() {
                return writeln!(f);
            }
            write!(f, "positions:")?;
            for position in positions {
                write!(f, " {:.*}", precision, position)?;
            }
            writeln!(f)?;
            for row in replicate.genotypes.rows.iter() {
                writeln!(f, "{}", row)?;
            }
        }
        Ok(())
    }
}

/// Newick rendering of a [Tree], terminated by `;`. Leaves are labelled 1..=n.
pub struct Newick<'a> {
    tree: &'a Tree,
    precision: usize,
}

impl<'a> Newick<'a> {
    pub fn new(tree: &'a Tree, precision: usize) -> Self {
        Self { tree, precision }
    }
}

enum Step {
    Open(usize),
    Comma,
    Close(usize),
}

impl fmt::Display for Newick<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let nodes = self.tree.nodes();
        let mut parents = vec![None; nodes.len()];
        for (idx, node) in nodes.iter().enumerate() {
            if let Some((l, r)) = node.children {
                parents[l] = Some(idx);
                parents[r] = Some(idx);
            }
        }
        let branch = |node: usize| parents[node].map(|p: usize| nodes[p].time - nodes[node].time);
        // Explicit stack: caterpillar trees would otherwise recurse n deep.
        let mut stack = vec![Step::Open(self.tree.root())];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => match nodes[node].children {
                    Some((l, r)) => {
                        write!(f, "(")?;
                        stack.push(Step::Close(node));
                        stack.push(Step::Open(r));
                        stack.push(Step::Comma);
                        stack.push(Step::Open(l));
                    }
                    None => {
                        write!(f, "{}", node + 1)?;
                        if let Some(length) = branch(node) {
                            write!(f, ":{:.*}", self.precision, length)?;
                        }
                    }
                },
                Step::Comma => write!(f, ",")?,
                Step::Close(node) => {
                    write!(f, ")")?;
                    if let Some(length) = branch(node) {
                        write!(f, ":{:.*}", self.precision, length)?;
                    }
                }
            }
        }
        write!(f, ";")
    }
}
