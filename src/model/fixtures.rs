//! Small models shared by the unit tests.
use crate::model::{ExplicitModel, ExplicitModelBuilder};

/// Adds an absorbing self-loop to each state in `states`.
fn absorb(builder: &mut ExplicitModelBuilder, states: &[usize]) {
    for &s in states {
        builder.add_transition(s, s, 1.);
    }
}

/// Two secrets, each deterministically producing its own output.
pub fn distinct_outputs() -> ExplicitModel {
    let mut b = ExplicitModelBuilder::new();
    let s0 = b.add_state("init", "0");
    let s1 = b.add_state("init", "1");
    let t0 = b.add_state("A", "0");
    let t1 = b.add_state("B", "1");
    b.add_initial(s0);
    b.add_initial(s1);
    b.add_transition(s0, t0, 1.);
    b.add_transition(s1, t1, 1.);
    absorb(&mut b, &[t0, t1]);
    b.build().unwrap()
}

/// Two secrets producing the same output.
pub fn same_output() -> ExplicitModel {
    let mut b = ExplicitModelBuilder::new();
    let s0 = b.add_state("init", "0");
    let s1 = b.add_state("init", "1");
    let t0 = b.add_state("A", "0");
    let t1 = b.add_state("A", "1");
    b.add_initial(s0);
    b.add_initial(s1);
    b.add_transition(s0, t0, 1.);
    b.add_transition(s1, t1, 1.);
    absorb(&mut b, &[t0, t1]);
    b.build().unwrap()
}

/// A secret h in {0, 1, 2, 3}. A fair coin decides whether the program
/// prints "lo" and then the parity of h, or "hi" and then "done".
///
/// Traces: [start, lo, p0] and [start, lo, p1] with probability 1/4 each,
/// [start, hi, done] with probability 1/2.
pub fn layered() -> ExplicitModel {
    let mut b = ExplicitModelBuilder::new();
    let mut finals = vec![];
    let starts = (0..4).map(|h| b.add_state("start", &h.to_string()))
                       .collect::<Vec<_>>();
    for (h, &s) in starts.iter().enumerate() {
        let secret = h.to_string();
        let lo = b.add_state("lo", &secret);
        let hi = b.add_state("hi", &secret);
        let parity = b.add_state(if h % 2 == 0 { "p0" } else { "p1" }, &secret);
        let done = b.add_state("done", &secret);

        b.add_initial(s);
        b.add_transition(s, lo, 0.5);
        b.add_transition(s, hi, 0.5);
        b.add_transition(lo, parity, 1.);
        b.add_transition(hi, done, 1.);
        finals.push(parity);
        finals.push(done);
    }
    absorb(&mut b, &finals);
    b.build().unwrap()
}

/// A secret bit sent over a channel that flips it with probability 1/4.
pub fn noisy_channel() -> ExplicitModel {
    let mut b = ExplicitModelBuilder::new();
    let mut finals = vec![];
    for h in 0..2 {
        let secret = h.to_string();
        let s = b.add_state("start", &secret);
        let kept = b.add_state(&secret, &secret);
        let flipped = b.add_state(&(1 - h).to_string(), &secret);
        b.add_initial(s);
        b.add_transition(s, kept, 0.75);
        b.add_transition(s, flipped, 0.25);
        finals.push(kept);
        finals.push(flipped);
    }
    absorb(&mut b, &finals);
    b.build().unwrap()
}

/// One secret, two different paths producing the same trace and ending in
/// the same terminal state (no self-loop on it).
///
///     i -> a (p=0.4) -> f
///     i -> b (p=0.6) -> f
///
/// where a and b share the public label "m".
pub fn converging_paths() -> ExplicitModel {
    let mut b = ExplicitModelBuilder::new();
    let i = b.add_state("i", "s");
    let a = b.add_state("m", "s");
    let c = b.add_state("m", "s");
    let f = b.add_state("f", "s");
    b.add_initial(i);
    b.add_transition(i, a, 0.4);
    b.add_transition(i, c, 0.6);
    b.add_transition(a, f, 1.);
    b.add_transition(c, f, 1.);
    b.build().unwrap()
}
