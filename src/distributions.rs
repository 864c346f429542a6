/*!
Defines the target density and the proposal kernel for the magic square search, along
with the traits [`Target`] and [`Proposal`] that connect them to the sampler.

The target is the unnormalized density `f(x) = exp(-lambda * Q(x))` over arrangements
of a square grid, where `Q` is the deviation from [`crate::magic`]. A magic square has
`Q == 0` and therefore maximal density `f == 1`; raising `lambda` makes the search
greedier by punishing deviation increases harder. The proposal exchanges the contents
of two uniformly chosen cells and is symmetric, so its density cancels out of the
Metropolis acceptance ratio.

# Examples

```rust
use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal, Target};

// A magic square sits at the mode of the target density.
let density = MagicSquareDensity::new(0.8).unwrap();
let lo_shu: [u32; 9] = [8, 1, 6, 3, 5, 7, 4, 9, 2];
assert_eq!(density.unnorm_log_prob(&lo_shu), 0.0);

// The proposal returns the current state with two cells exchanged.
let mut proposal = SwapProposal::new().set_seed(42);
let candidate = proposal.sample(&lo_shu);
assert_eq!(candidate.len(), 9);
```
*/

use num_traits::{AsPrimitive, Float, PrimInt};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::magic::deviation;

/// Greediness used by [`MagicSquareDensity::default`].
pub const DEFAULT_LAMBDA: f64 = 0.8;

/// A trait for unnormalized target densities over grid states.
pub trait Target<S, T: Float> {
    /// Returns the log of the unnormalized density for state `theta`.
    fn unnorm_log_prob(&self, theta: &[S]) -> T;
}

/// A trait for generating candidate states in Metropolis-style algorithms.
pub trait Proposal<S, T: Float> {
    /// Samples a new state from q(x' | x).
    fn sample(&mut self, current: &[S]) -> Vec<S>;

    /// Evaluates log q(x' | x).
    fn log_prob(&self, from: &[S], to: &[S]) -> T;

    /// Returns this proposal seeded with `seed`.
    fn set_seed(self, seed: u64) -> Self;
}

/// Error for search parameters that are rejected before any iteration runs.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// The square order must be at least 1.
    #[error("square order must be at least 1")]
    Order,

    /// The iteration budget must allow at least the initial state.
    #[error("iteration budget must be at least 1")]
    IterationBudget,

    /// The greediness `lambda` must be positive.
    #[error("greediness must be positive, got {0}")]
    Lambda(f64),
}

/**
The unnormalized target density `f(x) = exp(-lambda * Q(x))` over square grids.

The log-density is `-lambda * Q(x)`, which is `0` exactly for magic squares and
strictly negative otherwise. The density is generic over the integer cell type.

# Examples

```rust
use magic_mcmc::distributions::{MagicSquareDensity, Target};

let density = MagicSquareDensity::default();
// The identity arrangement of order 3 has deviation 24.
let identity: Vec<u32> = (1..=9).collect();
assert!(density.unnorm_log_prob(&identity) < 0.0);
```
*/
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagicSquareDensity {
    /// Greediness of the search; larger values concentrate the density harder
    /// on low-deviation grids.
    pub lambda: f64,
}

impl MagicSquareDensity {
    /**
    Creates a density with the given greediness.

    # Arguments

    * `lambda` - The greediness; must be positive.

    # Returns

    The density, or [`ConfigurationError::Lambda`] if `lambda` is zero, negative
    or NaN.
    */
    pub fn new(lambda: f64) -> Result<Self, ConfigurationError> {
        if lambda > 0.0 {
            Ok(Self { lambda })
        } else {
            Err(ConfigurationError::Lambda(lambda))
        }
    }
}

impl Default for MagicSquareDensity {
    /// Returns the density with greediness [`DEFAULT_LAMBDA`].
    fn default() -> Self {
        Self {
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl<S> Target<S, f64> for MagicSquareDensity
where
    S: PrimInt + AsPrimitive<i64>,
{
    /// Returns `-lambda * Q(theta)`; states that do not form a square grid get
    /// log-density negative infinity.
    fn unnorm_log_prob(&self, theta: &[S]) -> f64 {
        match deviation(theta) {
            Ok(q) => -self.lambda * q as f64,
            Err(_) => f64::NEG_INFINITY,
        }
    }
}

/**
A proposal that exchanges the contents of two uniformly chosen cells.

Both cell indices are drawn independently with replacement, so the proposal
occasionally picks the same index twice and re-offers the current state. The kernel
is symmetric: `q(x' | x) == q(x | x')` for every pair of states it can connect.

# Examples

```rust
use magic_mcmc::distributions::{Proposal, SwapProposal};

let mut proposal = SwapProposal::new().set_seed(7);
let current = [1u32, 2, 3, 4];
let candidate = proposal.sample(&current);

// The candidate differs from the current state in zero or two positions.
let changed = current.iter().zip(&candidate).filter(|(a, b)| a != b).count();
assert!(changed == 0 || changed == 2);
```
*/
#[derive(Debug, Clone)]
pub struct SwapProposal {
    rng: SmallRng,
}

impl SwapProposal {
    /// Creates a swap proposal with a generator seeded from entropy.
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl Default for SwapProposal {
    fn default() -> Self {
        Self::new()
    }
}

impl Proposal<u32, f64> for SwapProposal {
    fn sample(&mut self, current: &[u32]) -> Vec<u32> {
        let mut candidate = current.to_vec();
        let ix1 = self.rng.gen_range(0..current.len());
        let ix2 = self.rng.gen_range(0..current.len());
        candidate.swap(ix1, ix2);
        candidate
    }

    /// The kernel is symmetric, so a constant suffices for the acceptance ratio.
    fn log_prob(&self, _from: &[u32], _to: &[u32]) -> f64 {
        0.0
    }

    fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}
