//! src/main.rs
use anyhow::Context;
use inmem_mapreduce::configuration::{Settings, get_configuration};
use inmem_mapreduce::mappers::WordCounter;
use inmem_mapreduce::reducers::Adder;
use inmem_mapreduce::telemetry;
use inmem_mapreduce::{Pipeline, Stage, StageConfig};
use std::io::{BufRead, Write};

fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().context("Failed to read configuration.")?;

    #[cfg(not(feature = "otlp"))]
    telemetry::init_subscriber(telemetry::get_subscriber(
        &configuration.log_level,
        std::io::stderr,
    ))?;
    #[cfg(feature = "otlp")]
    let provider =
        telemetry::init_tracing("inmem-mapreduce", &configuration.log_level, std::io::stderr)?;

    let outcome = count_words(&configuration);

    #[cfg(feature = "otlp")]
    provider.shutdown().context("Failed to flush spans")?;
    outcome
}

/// Counts the words read from stdin and prints `word<TAB>count` lines.
fn count_words(configuration: &Settings) -> anyhow::Result<()> {
    let lines = std::io::stdin()
        .lock()
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to read input from stdin")?;

    let stage = Stage::new(WordCounter, Adder)
        .with_config(StageConfig::from_settings(&configuration.stage))
        .named("word-count");
    let pipeline = Pipeline::new()
        .stage(stage)
        .with_executor(configuration.executor.executor());

    let output = pipeline.run(lines)?;
    let mut stdout = std::io::stdout().lock();
    for (word, count) in output {
        writeln!(stdout, "{word}\t{count}")?;
    }
    Ok(())
}
