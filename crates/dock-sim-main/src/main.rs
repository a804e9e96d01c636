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

use dock_sim_core::{SimVariable, err::Refusal};
use dock_sim_engine::prelude::*;
use serde::Serialize;
use std::{fs::File, io::BufReader, time::Instant};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Serialize)]
struct RunOutput {
    seed: u64,
    end: f64,
    activations: u64,
    finished_processes: usize,
    elapsed_ms: u128,
    report: TerminalReport,
}

fn load_config(path: Option<String>) -> Result<TerminalConfig, String> {
    let Some(path) = path else {
        info!("no configuration given, using the default terminal");
        return Ok(TerminalConfig::default());
    };
    let file = File::open(&path).map_err(|e| format!("cannot open {path}: {e}"))?;
    let config: TerminalConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("cannot parse {path}: {e}"))?;
    info!(path = %path, "configuration loaded");
    Ok(config)
}

fn run<T: SimVariable>(config: &TerminalConfig) -> Result<RunOutput, SimError> {
    let t0 = Instant::now();
    let mut sim = Simulation::<T>::new(config)?;
    let summary = sim.run()?;
    Ok(RunOutput {
        seed: config.seed,
        end: summary.end.to_f64(),
        activations: summary.activations,
        finished_processes: summary.finished,
        elapsed_ms: t0.elapsed().as_millis(),
        report: sim.report(),
    })
}

fn main() {
    enable_tracing();

    let config = match load_config(std::env::args().nth(1)) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    let output = match run::<i64>(&config) {
        Ok(o) => o,
        Err(e) => {
            error!(kind = ?e.kind(), "{e}");
            std::process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &output).expect("write json report");
    println!();
}
