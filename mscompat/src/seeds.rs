//! Seeds -- the bridge between the legacy seed triple and the generator of a run.
//!
//! ms takes three small integers as its seed. A run here is driven by one
//! generator seeded with a single integer. The mapping between the two is
//! [pack]: each value occupies its own 16-bit lane of the result, so the
//! mapping is injective, order sensitive, and can be inverted by [unpack].
//! Downstream users reproduce runs from echoed triples, so the lane layout must
//! never change.
use definitions::{ConfigError, SeedTriple};
use rand::Rng;

/// Version of the packing implemented by [pack]/[unpack].
pub const PACKING_VERSION: u32 = 1;

const LANE: u32 = 16;
const LANE_MASK: u64 = 0xFFFF;

/// `s1 << 32 | s2 << 16 | s3`. Always positive since every lane is at least 1.
pub fn pack(triple: &SeedTriple) -> u64 {
    let [s1, s2, s3] = triple.values();
    (s1 as u64) << (2 * LANE) | (s2 as u64) << LANE | s3 as u64
}

/// Inverse of [pack].
pub fn unpack(seed: u64) -> Result<SeedTriple, ConfigError> {
    if seed >> (3 * LANE) != 0 {
        let msg = format!("{} does not fit in three 16-bit lanes", seed);
        return Err(ConfigError::InvalidSeed(msg));
    }
    let s1 = (seed >> (2 * LANE)) & LANE_MASK;
    let s2 = (seed >> LANE) & LANE_MASK;
    let s3 = seed & LANE_MASK;
    SeedTriple::new(&[s1 as i64, s2 as i64, s3 as i64])
}

/// Draw three independent values uniformly from [1, 65535].
pub fn draw_triple<R: Rng>(rng: &mut R) -> SeedTriple {
    SeedTriple::random(rng)
}

/// Resolve the seeds of a run: validate the given triple, or draw one from `entropy`
/// when none is given. Returns the derived seed and the triple to echo.
pub fn derive<R: Rng>(
    seeds: Option<&[i64]>,
    entropy: &mut R,
) -> Result<(u64, SeedTriple), ConfigError> {
    let triple = match seeds {
        Some(values) => SeedTriple::new(values)?,
        None => draw_triple(entropy),
    };
    Ok((pack(&triple), triple))
}
