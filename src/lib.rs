/*!
# magic-mcmc

A compact Rust library for hunting magic squares with Markov Chain Monte Carlo (MCMC).

The search runs a single Metropolis chain over arrangements of the numbers `1..=n^2`
in an `n` by `n` grid. The target density `f(x) = exp(-lambda * Q(x))` rewards grids
whose row, column and diagonal sums sit close to the magic constant, and the proposal
exchanges two uniformly chosen cells. A run ends as soon as a proposed grid is magic
or the iteration budget runs out, and returns the full trace of visited states.

## Quick Start

```rust
use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
use magic_mcmc::metropolis::Metropolis;

let target = MagicSquareDensity::default();
let proposal = SwapProposal::new().set_seed(42);
let mut sampler = Metropolis::new(target, proposal, 3)?.set_seed(42);

let trace = sampler.run(100_000)?;
if trace.success {
    println!("found a magic square: {:?}", trace.final_state().unwrap());
}
# Ok::<(), Box<dyn std::error::Error>>(())
```

## Modules

- [`magic`]: the deviation evaluator scoring how far a grid is from magic.
- [`distributions`]: the target density, the swap proposal and the trait seams
  between them and the sampler.
- [`metropolis`]: the Metropolis sampler and the recorded [`Trace`](metropolis::Trace).
- [`stats`]: running statistics for monitoring long searches.

Runs are sequential; for parallel search, race independently seeded samplers from
the caller (see `src/main.rs` for a rayon example).
*/

pub mod distributions;
pub mod magic;
pub mod metropolis;
pub mod stats;
