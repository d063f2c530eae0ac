use rand::rngs::StdRng;
use rand::SeedableRng;

/// Generator for one run. A seed makes every shuffle and draw reproducible;
/// without one the run draws from OS entropy and is not repeatable.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            tracing::debug!(seed, "using seeded generator");
            StdRng::seed_from_u64(seed)
        }
        None => {
            tracing::debug!("no seed given, results will not be reproducible");
            StdRng::from_entropy()
        }
    }
}
