/*!
# Metropolis Sampler

This module implements a Metropolis sampler that searches for magic squares. The chain
walks over arrangements of the numbers `1..=n^2` in an `n` by `n` grid, guided by a
target density `D` implementing [`Target`] and a proposal kernel `Q` implementing
[`Proposal`]. With the default [`MagicSquareDensity`](crate::distributions::MagicSquareDensity)
the chain drifts towards grids with small deviation and a run ends as soon as a
proposed grid is magic or the iteration budget runs out.

## Overview

- **Target Density (`D`)**: Provides the (unnormalized) log-density for grid states.
- **Proposal Kernel (`Q`)**: Generates candidate grids, by default via cell swaps.
- **Trace**: Every run records the visited states, the acceptance probability and
  accept decision of each transition, and whether the search succeeded.
- **Reproducibility**: `set_seed` pins the accept decisions; the proposal is seeded
  separately through [`Proposal::set_seed`].

## Example Usage

```rust
use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
use magic_mcmc::metropolis::Metropolis;

let target = MagicSquareDensity::default();
let proposal = SwapProposal::new().set_seed(42);
let mut sampler = Metropolis::new(target, proposal, 3).unwrap().set_seed(42);

let trace = sampler.run(10_000).unwrap();
println!("visited {} states", trace.len());
if trace.success {
    println!("found a magic square: {:?}", trace.final_state().unwrap());
}
```

See also the documentation for [`Trace`] and the methods below.
*/

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_stats::QuantileExt;
use rand::prelude::*;

use crate::distributions::{ConfigurationError, Proposal, Target};
use crate::magic::deviation;
use crate::stats::SearchTracker;

/**
A Metropolis sampler hunting for magic squares of a fixed order.

The chain starts from the row-major identity arrangement `1, 2, ..., n^2` and evolves
by proposing candidate grids and accepting or rejecting them with the Metropolis
criterion. Because the swap kernel is symmetric, the acceptance probability reduces
to `min(1, f(proposed) / f(current))`.

# Type Parameters

- `D`: The target density type. Must implement [`Target`] over `u32` cells.
- `Q`: The proposal kernel type. Must implement [`Proposal`] over `u32` cells.

# Examples

```rust
use magic_mcmc::distributions::{MagicSquareDensity, SwapProposal};
use magic_mcmc::metropolis::Metropolis;

let sampler = Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 3).unwrap();
assert_eq!(sampler.current_state, (1..=9).collect::<Vec<u32>>());
```
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metropolis<D, Q> {
    /// The target density over grid states.
    pub target: D,
    /// The proposal kernel used to generate candidate grids.
    pub proposal: Q,
    /// The current state of the chain.
    pub current_state: Vec<u32>,
    /// The side length of the square being searched.
    pub order: usize,
    /// The random seed for the accept decisions.
    pub seed: u64,
    /// The random number generator drawing the accept decisions.
    pub rng: SmallRng,
}

impl<D, Q> Metropolis<D, Q>
where
    D: Target<u32, f64>,
    Q: Proposal<u32, f64>,
{
    const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

    /**
    Constructs a sampler for squares of the given order.

    The chain starts from the row-major identity arrangement `1, 2, ..., order^2`
    and draws a fresh seed for its accept decisions.

    # Arguments

    * `target` - The target density over grid states.
    * `proposal` - The proposal kernel generating candidate grids.
    * `order` - The side length of the square; must be at least 1.

    # Returns

    The sampler, or [`ConfigurationError::Order`] if `order` is zero.

    # Examples

    ```rust
    use magic_mcmc::distributions::{MagicSquareDensity, SwapProposal};
    use magic_mcmc::metropolis::Metropolis;

    let sampler = Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 2).unwrap();
    assert_eq!(sampler.current_state, vec![1, 2, 3, 4]);
    assert!(Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 0).is_err());
    ```
    */
    pub fn new(target: D, proposal: Q, order: usize) -> Result<Self, ConfigurationError> {
        if order == 0 {
            return Err(ConfigurationError::Order);
        }
        let n_cells = order * order;
        let current_state = (1..=n_cells as u32).collect();
        let seed = thread_rng().gen::<u64>();
        Ok(Self {
            target,
            proposal,
            current_state,
            order,
            seed,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /**
    Sets the seed for the accept decisions.

    Only the chain's own generator is reseeded; seed the proposal kernel separately
    through [`Proposal::set_seed`] to make a whole run reproducible.

    # Examples

    ```rust
    use magic_mcmc::distributions::{MagicSquareDensity, SwapProposal};
    use magic_mcmc::metropolis::Metropolis;

    let sampler = Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 3)
        .unwrap()
        .set_seed(42);
    assert_eq!(sampler.seed, 42);
    ```
    */
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /**
    Performs one Metropolis update.

    A candidate grid is drawn from the proposal kernel and the acceptance ratio is
    computed in log-space:

    \[
    \log \alpha = \left[\log f(\text{proposed}) + \log q(\text{current} \mid \text{proposed})\right]
                  - \left[\log f(\text{current}) + \log q(\text{proposed} \mid \text{current})\right]
    \]

    The acceptance probability is `p = exp(min(0, log alpha))`. A uniform `u` in
    `[0, 1)` is drawn and the candidate replaces the current state iff `u <= p`, so
    a candidate at least as dense as the current state is always taken.

    The returned [`StepInfo`] also reports whether the *proposed* grid was magic,
    regardless of the accept decision. A magic proposal has maximal density, hence
    `p == 1`, so it is always accepted anyway.

    # Examples

    ```rust
    use magic_mcmc::distributions::{MagicSquareDensity, SwapProposal};
    use magic_mcmc::metropolis::Metropolis;

    let mut sampler =
        Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 3).unwrap();
    let info = sampler.step();
    assert!(info.accept_prob > 0.0 && info.accept_prob <= 1.0);
    ```
    */
    pub fn step(&mut self) -> StepInfo {
        let proposed = self.proposal.sample(&self.current_state);
        let current_lp = self.target.unnorm_log_prob(&self.current_state);
        let proposed_lp = self.target.unnorm_log_prob(&proposed);
        let log_q_forward = self.proposal.log_prob(&self.current_state, &proposed);
        let log_q_backward = self.proposal.log_prob(&proposed, &self.current_state);
        let log_accept_ratio = (proposed_lp + log_q_backward) - (current_lp + log_q_forward);
        let accept_prob = log_accept_ratio.min(0.0).exp();
        let u: f64 = self.rng.gen();
        let accepted = u <= accept_prob;
        let magic_proposal = proposed_lp == 0.0;
        if accepted {
            self.current_state = proposed;
        }
        StepInfo {
            accept_prob,
            accepted,
            magic_proposal,
        }
    }

    /**
    Runs the chain until a magic square is proposed or the budget is exhausted.

    The budget counts recorded states including the initial one, so at most
    `n_steps - 1` transitions are attempted. When a step proposes a magic square the
    run stops immediately and the trace is truncated at that state with
    [`Trace::success`] set.

    # Arguments

    * `n_steps` - The maximum number of recorded states; must be at least 1.

    # Returns

    The recorded [`Trace`], or [`ConfigurationError::IterationBudget`] if `n_steps`
    is zero.

    # Examples

    ```rust
    use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
    use magic_mcmc::metropolis::Metropolis;

    let proposal = SwapProposal::new().set_seed(42);
    let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 3)
        .unwrap()
        .set_seed(42);
    let trace = sampler.run(500).unwrap();
    assert!(trace.len() <= 500);
    assert_eq!(trace.accepted.len(), trace.len() - 1);
    ```
    */
    pub fn run(&mut self, n_steps: usize) -> Result<Trace, ConfigurationError> {
        if n_steps < 1 {
            return Err(ConfigurationError::IterationBudget);
        }
        let mut states = Vec::with_capacity(n_steps);
        states.push(self.current_state.clone());
        let mut accept_probs = Vec::with_capacity(n_steps - 1);
        let mut accepted = Vec::with_capacity(n_steps - 1);
        let mut success = false;

        for _ in 1..n_steps {
            let info = self.step();
            states.push(self.current_state.clone());
            accept_probs.push(info.accept_prob);
            accepted.push(info.accepted);
            if info.magic_proposal {
                success = true;
                break;
            }
        }

        Ok(Trace::from_parts(
            self.order * self.order,
            states,
            accept_probs,
            accepted,
            success,
        ))
    }

    /**
    Like [`Metropolis::run`], but renders a progress bar while the chain runs.

    The bar shows the windowed acceptance rate and the best deviation seen so far,
    refreshed at most twice a second. The recorded trace is identical to what
    [`Metropolis::run`] would produce under the same seeds.

    # Examples

    ```rust
    use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
    use magic_mcmc::metropolis::Metropolis;

    let proposal = SwapProposal::new().set_seed(42);
    let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 3)
        .unwrap()
        .set_seed(42);
    let trace = sampler.run_progress(500).unwrap();
    assert!(trace.len() <= 500);
    ```
    */
    pub fn run_progress(&mut self, n_steps: usize) -> Result<Trace, ConfigurationError> {
        if n_steps < 1 {
            return Err(ConfigurationError::IterationBudget);
        }

        let pb = ProgressBar::new(n_steps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );
        pb.set_prefix("Search");

        let mut tracker = SearchTracker::new(&self.current_state)
            .expect("Expected tracking the initial state to succeed");
        let mut last_update = Instant::now();

        let mut states = Vec::with_capacity(n_steps);
        states.push(self.current_state.clone());
        let mut accept_probs = Vec::with_capacity(n_steps - 1);
        let mut accepted = Vec::with_capacity(n_steps - 1);
        let mut success = false;

        for step_idx in 1..n_steps {
            let info = self.step();
            states.push(self.current_state.clone());
            accept_probs.push(info.accept_prob);
            accepted.push(info.accepted);
            tracker
                .step(&self.current_state, &info)
                .expect("Expected tracking a recorded state to succeed");
            if info.magic_proposal {
                success = true;
                break;
            }

            // Update the progress bar if enough time has passed or this is the last iteration
            if last_update.elapsed() >= Self::UPDATE_INTERVAL || step_idx + 1 == n_steps {
                let stats = tracker.stats();
                pb.set_position(step_idx as u64 + 1);
                pb.set_message(format!(
                    "p(accept)≈{:.2} best(Q)={}",
                    stats.p_accept, stats.best_deviation
                ));
                last_update = Instant::now();
            }
        }
        pb.finish_with_message(if success { "Found one!" } else { "Done!" });

        Ok(Trace::from_parts(
            self.order * self.order,
            states,
            accept_probs,
            accepted,
            success,
        ))
    }
}

/// Outcome of a single Metropolis update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInfo {
    /// Probability with which the candidate was accepted, in `[0, 1]`.
    pub accept_prob: f64,
    /// Whether the candidate replaced the current state.
    pub accepted: bool,
    /// Whether the proposed grid was magic, accepted or not.
    pub magic_proposal: bool,
}

/**
The recorded trajectory of one search run.

`states` holds one row per recorded state, beginning with the initial state.
`accept_probs` and `accepted` describe the transitions between consecutive rows, so
both hold one entry fewer than `states` has rows. `success` is set when a proposed
grid was magic, in which case the trajectory ends at that state.

# Examples

```rust
use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
use magic_mcmc::metropolis::Metropolis;

let proposal = SwapProposal::new().set_seed(1);
let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 3)
    .unwrap()
    .set_seed(1);
let trace = sampler.run(200).unwrap();

let deviations = trace.deviations();
let (best_ix, best_q) = trace.best_deviation().unwrap();
assert_eq!(deviations[best_ix], best_q);
assert_eq!(deviations.len(), trace.len());
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Recorded states, one row per state, in visit order.
    pub states: Array2<u32>,
    /// Acceptance probability of each transition.
    pub accept_probs: Array1<f64>,
    /// Accept decision of each transition.
    pub accepted: Vec<bool>,
    /// Whether a magic square was proposed before the budget ran out.
    pub success: bool,
}

impl Trace {
    fn from_parts(
        n_cells: usize,
        states: Vec<Vec<u32>>,
        accept_probs: Vec<f64>,
        accepted: Vec<bool>,
        success: bool,
    ) -> Self {
        let n_states = states.len();
        let flat: Vec<u32> = states.into_iter().flatten().collect();
        let states = Array2::from_shape_vec((n_states, n_cells), flat)
            .expect("Expected recorded states to form a rectangular array");
        Self {
            states,
            accept_probs: Array1::from_vec(accept_probs),
            accepted,
            success,
        }
    }

    /// Number of recorded states.
    pub fn len(&self) -> usize {
        self.states.nrows()
    }

    /// Whether the trace holds no states at all.
    pub fn is_empty(&self) -> bool {
        self.states.nrows() == 0
    }

    /// The last recorded state, i.e. the found square when [`Trace::success`] is
    /// set. `None` when the trace holds no states.
    pub fn final_state(&self) -> Option<ArrayView1<'_, u32>> {
        if self.is_empty() {
            return None;
        }
        Some(self.states.row(self.states.nrows() - 1))
    }

    /// Deviation of every recorded state, in visit order.
    pub fn deviations(&self) -> Array1<u64> {
        let qs: Vec<u64> = self
            .states
            .rows()
            .into_iter()
            .map(|row| {
                let cells = row
                    .as_slice()
                    .expect("Expected recorded state rows to be contiguous");
                deviation(cells).expect("Expected recorded states to form square grids")
            })
            .collect();
        Array1::from_vec(qs)
    }

    /// Index and value of the smallest recorded deviation, or `None` for an empty
    /// trace. Ties resolve to the earliest state.
    pub fn best_deviation(&self) -> Option<(usize, u64)> {
        let qs = self.deviations();
        let ix = qs.argmin().ok()?;
        Some((ix, qs[ix]))
    }

    /// Fraction of transitions that were accepted; `0.0` for a trace without
    /// transitions.
    pub fn acceptance_rate(&self) -> f64 {
        if self.accepted.is_empty() {
            return 0.0;
        }
        self.accepted.iter().filter(|&&a| a).count() as f64 / self.accepted.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{MagicSquareDensity, SwapProposal};

    #[test]
    fn initial_state_is_the_identity_arrangement() {
        let sampler =
            Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 4).unwrap();
        assert_eq!(sampler.current_state, (1..=16).collect::<Vec<u32>>());
        assert_eq!(sampler.order, 4);
    }

    #[test]
    fn rejects_order_zero() {
        let result = Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 0);
        assert_eq!(result.unwrap_err(), ConfigurationError::Order);
    }

    #[test]
    fn order_one_step_is_certain() {
        // The only possible swap re-offers the lone magic cell.
        let mut sampler =
            Metropolis::new(MagicSquareDensity::default(), SwapProposal::new(), 1).unwrap();
        let info = sampler.step();
        assert_eq!(info.accept_prob, 1.0);
        assert!(info.accepted);
        assert!(info.magic_proposal);
        assert_eq!(sampler.current_state, vec![1]);
    }

    #[test]
    fn set_seed_pins_the_decisions() {
        let run_states = |seed: u64| {
            let proposal = SwapProposal::new().set_seed(seed);
            let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 3)
                .unwrap()
                .set_seed(seed);
            let infos: Vec<StepInfo> = (0..50).map(|_| sampler.step()).collect();
            (infos, sampler.current_state.clone())
        };
        assert_eq!(run_states(7), run_states(7));
    }

    #[test]
    fn trace_counts_stay_aligned() {
        let proposal = SwapProposal::new().set_seed(3);
        let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 3)
            .unwrap()
            .set_seed(3);
        let trace = sampler.run(100).unwrap();
        assert!(!trace.is_empty());
        assert_eq!(trace.accept_probs.len(), trace.len() - 1);
        assert_eq!(trace.accepted.len(), trace.len() - 1);
        assert_eq!(trace.deviations().len(), trace.len());
        let rate = trace.acceptance_rate();
        assert!(
            (0.0..=1.0).contains(&rate),
            "Expected acceptance rate in [0, 1], got {rate}"
        );
    }
}
