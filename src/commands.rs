use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::grading::MinimumAverage;
use crate::util::write_json_pretty;

pub mod extract;
pub mod recalculate;

fn resolve_minimum(requested: Option<f64>) -> MinimumAverage {
    let minimum = MinimumAverage::or_default(requested);
    if let Some(value) = requested
        && value != minimum.value()
    {
        warn!(
            requested = value,
            applied = minimum.value(),
            "minimum average outside 0-10, using default"
        );
    }
    minimum
}

fn emit_json<T: Serialize>(out: Option<&Path>, value: &T) -> Result<()> {
    match out {
        Some(path) => {
            write_json_pretty(path, value)?;
            info!(path = %path.display(), "wrote output");
        }
        None => {
            let data = serde_json::to_string_pretty(value).context("failed to serialize output")?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{data}").context("failed to write output to stdout")?;
        }
    }
    Ok(())
}
