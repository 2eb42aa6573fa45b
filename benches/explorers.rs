#[macro_use]
extern crate bencher;

use bencher::Bencher;
use dtleak::explorers::{BisimulationQuotientBuilder, Depth, QuotientExplorer, TraceExplorer};
use dtleak::model::{ExplicitModel, ExplicitModelBuilder};
use dtleak::PriorKnowledge;

/// A secret h sent `depth` times over a noisy channel: at step i, the
/// program outputs bit (i mod 3) of h, flipped with probability 1/4.
///
/// Each secret unfolds into a binary tree, so there are
/// `nsecrets * 2^depth` paths.
fn noisy_rounds(nsecrets: usize, depth: usize) -> ExplicitModel {
    let mut b = ExplicitModelBuilder::new();
    for h in 0..nsecrets {
        let secret = h.to_string();
        let root = b.add_state("start", &secret);
        b.add_initial(root);

        let mut frontier = vec![root];
        for step in 0..depth {
            let bit = (h >> (step % 3)) & 1;
            let mut next = Vec::with_capacity(2 * frontier.len());
            for s in frontier {
                for &(out, p) in &[(bit, 0.75), (1 - bit, 0.25)] {
                    let t = b.add_state(&out.to_string(), &secret);
                    b.add_transition(s, t, p);
                    next.push(t);
                }
            }
            frontier = next;
        }
        for s in frontier {
            b.add_transition(s, s, 1.);
        }
    }
    b.build().expect("failed to build the benchmark model")
}

fn bench_trace_exploration(b: &mut Bencher) {
    let model = noisy_rounds(8, 6);
    let prior = PriorKnowledge::uniform(&model);

    b.iter(|| {
        TraceExplorer::new(&model, &prior).explore(Depth::Unbounded)
    });
}

fn bench_bisimulation(b: &mut Bencher) {
    let model = noisy_rounds(8, 6);

    b.iter(|| {
        let quotient = BisimulationQuotientBuilder::new(&model).build();
        let reachability = QuotientExplorer::new(&quotient).explore();
        reachability.num_paths()
    });
}

benchmark_group!(benches, bench_trace_exploration, bench_bisimulation);
benchmark_main!(benches);
