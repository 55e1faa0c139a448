//! Reader -- parses an ms stream back, checking its line grammar on the way.
//!
//! It reads positionally, the way legacy consumers do, so anything the writer
//! gets wrong (a missing blank line, a stray `.` in a position) shows up here as
//! a [ParseError] or as a field that does not hold what was expected.
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

fn err<T>(line: usize, message: String) -> Result<T, ParseError> {
    Err(ParseError { line, message })
}

#[derive(Debug, Clone, PartialEq)]
pub struct MsStream {
    pub command_line: String,
    pub seeds: Vec<i64>,
    pub replicates: Vec<MsBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeLine {
    /// `None` for a tree printed without the `[length]` prefix.
    pub interval_length: Option<usize>,
    pub newick: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MsBlock {
    pub trees: Vec<TreeLine>,
    /// `None` when the block has no mutation part at all.
    pub segsites: Option<usize>,
    /// Positions as printed, so their precision can be checked.
    pub positions: Vec<String>,
    pub haplotypes: Vec<String>,
}

impl MsBlock {
    /// Loci covered by the tree lines of a run over `num_loci` loci. An unprefixed
    /// tree covers the single locus of a one-locus run. `None` if a tree of a
    /// multi-locus run lacks its `[length]` prefix.
    pub fn total_interval_length(&self, num_loci: usize) -> Option<usize> {
        self.trees
            .iter()
            .map(|t| match (t.interval_length, num_loci) {
                (Some(length), _) => Some(length),
                (None, 1) => Some(1),
                (None, _) => None,
            })
            .sum()
    }
}

pub fn parse(text: &str) -> Result<MsStream, ParseError> {
    let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l)).peekable();
    let command_line = match lines.next() {
        Some((_, line)) => line.to_string(),
        None => return err(1, "empty stream".to_string()),
    };
    let (no, seed_line) = match lines.next() {
        Some(x) => x,
        None => return err(2, "missing seed line".to_string()),
    };
    let seeds: Vec<i64> = match seed_line.split_whitespace().map(|s| s.parse()).collect() {
        Ok(seeds) => seeds,
        Err(why) => return err(no, format!("bad seed line `{}`: {}", seed_line, why)),
    };
    if seeds.len() != 3 {
        return err(no, format!("{} seeds instead of 3", seeds.len()));
    }
    let mut replicates = vec![];
    while let Some((no, line)) = lines.next() {
        if !line.is_empty() {
            return err(no, format!("expected a blank line, found `{}`", line));
        }
        match lines.next() {
            Some((_, "//")) => {}
            Some((no, line)) => return err(no, format!("expected `//`, found `{}`", line)),
            None => return err(no + 1, "missing `//`".to_string()),
        }
        let mut block = MsBlock::default();
        while let Some(&(no, line)) = lines.peek() {
            let tree = match line.as_bytes().first() {
                Some(b'(') => TreeLine {
                    interval_length: None,
                    newick: line.to_string(),
                },
                Some(b'[') => {
                    let end = match line.find(']') {
                        Some(end) => end,
                        None => return err(no, "unclosed `[`".to_string()),
                    };
                    let length = match line[1..end].parse() {
                        Ok(length) => length,
                        Err(why) => return err(no, format!("bad interval length: {}", why)),
                    };
                    TreeLine {
                        interval_length: Some(length),
                        newick: line[end + 1..].to_string(),
                    }
                }
                _ => break,
            };
            let bracketed = |t: &TreeLine| t.interval_length.is_some();
            if block.trees.last().map_or(false, |last| bracketed(last) != bracketed(&tree)) {
                return err(no, "bracketed and bare trees in one block".to_string());
            }
            block.trees.push(tree);
            lines.next();
        }
        let segsites = match lines.peek() {
            Some(&(no, line)) => line.strip_prefix("segsites: ").map(|n| (no, n)),
            None => None,
        };
        if let Some((no, count)) = segsites {
            lines.next();
            let count: usize = match count.trim().parse() {
                Ok(count) => count,
                Err(why) => return err(no, format!("bad segsites: {}", why)),
            };
            block.segsites = Some(count);
            if count == 0 {
                match lines.next() {
                    Some((_, "")) => {}
                    _ => {
                        let msg = "expected a blank line after `segsites: 0`".to_string();
                        return err(no + 1, msg);
                    }
                }
            } else {
                let positions = match lines.next() {
                    Some((no, line)) => match line.strip_prefix("positions: ") {
                        Some(positions) => positions,
                        None => return err(no, format!("expected positions, found `{}`", line)),
                    },
                    None => return err(no + 1, "missing positions".to_string()),
                };
                block.positions = positions.split_whitespace().map(String::from).collect();
                if block.positions.len() != count {
                    let msg = format!("{} positions for {} sites", block.positions.len(), count);
                    return err(no + 1, msg);
                }
                while let Some(&(_, line)) = lines.peek() {
                    if !line.starts_with('0') && !line.starts_with('1') {
                        break;
                    }
                    block.haplotypes.push(line.to_string());
                    lines.next();
                }
            }
        }
        replicates.push(block);
    }
    Ok(MsStream {
        command_line,
        seeds,
        replicates,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewickSummary {
    /// Leaf labels in order of appearance.
    pub leaves: Vec<usize>,
    /// Branch lengths as printed.
    pub branch_lengths: Vec<String>,
}

/// Leaf labels and branch lengths of a `;`-terminated Newick string.
/// `None` if the string is not balanced or contains anything unexpected.
pub fn newick_summary(newick: &str) -> Option<NewickSummary> {
    let body = newick.strip_suffix(';')?;
    let bytes = body.as_bytes();
    let (mut leaves, mut branch_lengths) = (vec![], vec![]);
    let (mut depth, mut i) = (0i64, 0);
    while i < bytes.len() {
        match bytes[i] {
            b'(' => {
                depth += 1;
                i += 1;
            }
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
                i += 1;
            }
            b',' => i += 1,
            b':' => {
                let start = i + 1;
                i = start;
                while i < bytes.len() && bytes[i] != b',' && bytes[i] != b')' {
                    i += 1;
                }
                branch_lengths.push(body[start..i].to_string());
            }
            b'0'..=b'9' => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                leaves.push(body[start..i].parse().ok()?);
            }
            _ => return None,
        }
    }
    (depth == 0).then(|| NewickSummary {
        leaves,
        branch_lengths,
    })
}
