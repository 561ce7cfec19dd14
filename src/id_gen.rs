//local shortcuts

//third-party shortcuts
use rand::RngCore;

//standard shortcuts
use std::sync::atomic::{AtomicU64, Ordering};

//-------------------------------------------------------------------------------------------------------------------

/// Generates monotonic, collision-resistant string identifiers.
///
/// Each id is `"<counter>-<random-suffix>"`: the counter guarantees ordering and uniqueness within one process,
/// the random suffix guards against collisions across separate [`IdGenerator`] instances (e.g. after a full
/// restart that resets the counter).
#[derive(Debug)]
pub struct IdGenerator
{
    counter : AtomicU64,
    prefix  : u32,
}

impl IdGenerator
{
    /// Make a new generator with a random per-instance prefix.
    pub fn new() -> Self
    {
        Self{ counter: AtomicU64::new(0), prefix: rand::thread_rng().next_u32() }
    }

    /// Generate the next id.
    pub fn next_id(&self) -> String
    {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{:08x}-{n}", self.prefix)
    }
}

impl Default for IdGenerator
{
    fn default() -> Self
    {
        Self::new()
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn ids_are_monotonic_and_unique()
    {
        let gen = IdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        let c = gen.next_id();
        assert_ne!(a, b);
        assert_ne!(b, c);
        // counters are embedded after the prefix, so lexicographic != numeric ordering,
        // but the suffix digits strictly increase.
        let suffix = |s: &str| s.rsplit('-').next().unwrap().parse::<u64>().unwrap();
        assert!(suffix(&a) < suffix(&b));
        assert!(suffix(&b) < suffix(&c));
    }

    #[test]
    fn separate_generators_rarely_collide()
    {
        let a = IdGenerator::new().next_id();
        let b = IdGenerator::new().next_id();
        assert_ne!(a, b);
    }
}

//-------------------------------------------------------------------------------------------------------------------
