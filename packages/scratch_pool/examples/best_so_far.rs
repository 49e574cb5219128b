//! Tracks the best-so-far buffer of several objects across a sequence of steps:
//!
//! * Every step writes one new buffer (here: the step number as a digit) into the scratch slot.
//! * Each object randomly decides whether the new buffer beats the one it holds and, if so,
//!   adopts the scratch slot instead of copying the buffer.
//! * After every step, reading all handles must reproduce the step each object last adopted.
//!
//! Run with `RUST_LOG=scratch_pool=trace` to see slot acquisition, adoption and rotation.

use std::num::NonZero;

use rand::Rng;
use scratch_pool::{ScratchPool, SlotHandle};
use tracing_subscriber::EnvFilter;

const OBJECTS: usize = 4;
const STEPS: u8 = 5;
const ROUNDS: usize = 100;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut rng = rand::rng();

    let mut pool = ScratchPool::new(
        NonZero::new(OBJECTS).expect("object count is non-zero"),
        NonZero::new(1).expect("block size is non-zero"),
    );

    for round in 0..ROUNDS {
        println!("--- round {round} ---");

        let mut handles: Vec<SlotHandle> = (0..OBJECTS)
            .map(|_| pool.acquire().expect("pool is sized for all objects"))
            .collect();

        // The step each object currently considers its best.
        let mut best_steps = [1_u8; OBJECTS];

        for step in 1..=STEPS {
            let digit = b'0' + step;
            pool.write_scratch(&[digit])
                .expect("the extra slot always leaves room for the scratch buffer");

            if step == 1 {
                for handle in &handles {
                    pool.write(handle, &[digit]);
                }
            } else {
                handles = handles
                    .into_iter()
                    .zip(best_steps.iter_mut())
                    .map(|(handle, best_step)| {
                        if rng.random_bool(0.5) {
                            *best_step = step;
                            pool.adopt_primary(handle)
                        } else {
                            handle
                        }
                    })
                    .collect();
            }

            let expected: String = best_steps.iter().map(|&s| char::from(b'0' + s)).collect();
            let observed: String = handles
                .iter()
                .map(|handle| char::from(pool[handle][0]))
                .collect();

            println!("step {step}: {observed} (primary slot {})", pool.primary_index());
            assert_eq!(observed, expected);
        }

        for handle in handles {
            pool.release(handle);
        }
    }

    println!("All {ROUNDS} rounds reproduced the expected best buffers.");
}
