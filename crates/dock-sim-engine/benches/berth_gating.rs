// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dock_sim_core::{
    calendar::EventCalendar,
    kernel::ProcessId,
    queue::{QueueCapacity, QueueDiscipline},
    space::SpaceLength,
};
use dock_sim_engine::{
    berth::{Acquire, Berth},
    config::TerminalConfig,
    sim::Simulation,
};
use dock_sim_model::id::BerthId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

type T = i64;

fn lengths(n: usize, seed: u64) -> Vec<SpaceLength> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| SpaceLength::new(rng.random_range(50..=400)))
        .collect()
}

// Every ship requests, the holders release in arrival order and woken
// waiters retry until the queue is empty.
fn churn(berth: &mut Berth<T>, cal: &mut EventCalendar<T>, lengths: &[SpaceLength]) {
    let mut holders = Vec::with_capacity(lengths.len());
    for (i, &len) in lengths.iter().enumerate() {
        let pid = ProcessId::new(i as u64);
        if let Ok(Acquire::Granted) = berth.take(cal, pid, len) {
            holders.push(pid);
        }
    }
    while let Some(pid) = holders.pop() {
        let _ = berth.release(cal, pid);
        while let Some(activation) = cal.next() {
            let woken = activation.pid();
            if let Ok(Acquire::Granted) = berth.resume(cal, woken) {
                holders.push(woken);
            }
            cal.finish_current();
        }
    }
}

fn bench_berth(c: &mut Criterion) {
    let mut group = c.benchmark_group("berth_gating");
    for &n in &[64usize, 512] {
        let lens = lengths(n, 7);
        for discipline in [QueueDiscipline::Fifo, QueueDiscipline::Random] {
            group.bench_function(format!("churn_{n}_{discipline:?}"), |b| {
                b.iter_batched(
                    || {
                        let berth = Berth::<T>::new(
                            BerthId::new(0),
                            SpaceLength::new(1000),
                            discipline,
                            QueueCapacity::unlimited(),
                            11,
                        )
                        .expect("valid berth");
                        (berth, EventCalendar::<T>::default())
                    },
                    |(mut berth, mut cal)| {
                        churn(&mut berth, &mut cal, &lens);
                        black_box(berth.users())
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_terminal(c: &mut Criterion) {
    let config = TerminalConfig::default();
    c.bench_function("default_terminal_run", |b| {
        b.iter_batched(
            || Simulation::<T>::new(&config).expect("valid terminal"),
            |mut sim| black_box(sim.run().expect("run completes")),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_berth, bench_terminal);
criterion_main!(benches);
