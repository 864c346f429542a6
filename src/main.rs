use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
use magic_mcmc::magic::magic_constant;
use magic_mcmc::metropolis::Metropolis;

use rayon::prelude::*;
use std::error::Error;

const ORDER: usize = 3;
const N_STEPS: usize = 200_000;
const N_SEARCHES: u64 = 8;

fn main() -> Result<(), Box<dyn Error>> {
    // Single search with a progress bar.
    let target = MagicSquareDensity::default();
    let proposal = SwapProposal::new().set_seed(42);
    let mut sampler = Metropolis::new(target, proposal, ORDER)?.set_seed(42);
    let trace = sampler.run_progress(N_STEPS)?;

    println!(
        "Visited {} states with acceptance rate {:.2}",
        trace.len(),
        trace.acceptance_rate()
    );
    if let Some((ix, q)) = trace.best_deviation() {
        println!("Best deviation {q} first reached at state {ix}");
    }
    if trace.success {
        println!(
            "Found a magic square with magic constant {}:",
            magic_constant(ORDER)
        );
        if let Some(square) = trace.final_state() {
            print_square(&square.to_vec(), ORDER);
        }
    } else {
        println!("No magic square within {N_STEPS} states");
    }

    // Race independently seeded searches in parallel; each sampler owns its
    // state and generators, so the runs never touch each other.
    let winner: Option<(u64, Vec<u32>)> = (0..N_SEARCHES).into_par_iter().find_map_any(|seed| {
        let proposal = SwapProposal::new().set_seed(seed);
        let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, ORDER)
            .ok()?
            .set_seed(seed);
        let trace = sampler.run(N_STEPS).ok()?;
        let state = trace.final_state()?;
        trace.success.then(|| (seed, state.to_vec()))
    });

    match winner {
        Some((seed, square)) => {
            println!("Parallel race: seed {seed} found");
            print_square(&square, ORDER);
        }
        None => println!("Parallel race: no find within {N_STEPS} states per search"),
    }

    Ok(())
}

fn print_square(cells: &[u32], order: usize) {
    for row in cells.chunks(order) {
        let line: Vec<String> = row.iter().map(|c| format!("{c:>3}")).collect();
        println!("{}", line.join(" "));
    }
}
