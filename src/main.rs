//! # Piglet CLI
//!
//! Thin driver around the compiler core. The surface-syntax frontend is a
//! separate component registered through [`piglet`]'s parser seam; this
//! binary owns argument handling, configuration overrides, logging setup
//! and exit codes.
//!
//! ## Usage
//!
//! ```bash
//! # Compile a script for the default backend
//! piglet wordcount.pig --outdir target/
//!
//! # Stream backend with profiling
//! piglet stream.pig --backend flinks --profiling http://collector:8080
//! ```
//!
//! Exit code 0 on success, nonzero with a single-line stderr message on
//! any documented failure.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use piglet::{compile, CompileOptions, CompilerContext, Config};

/// Piglet - a profile-driven dataflow compiler.
#[derive(Debug, Parser)]
#[command(name = "piglet", version, about)]
struct Cli {
    /// Dataflow script to compile
    script: PathBuf,

    /// Target backend (spark, flinks)
    #[arg(long)]
    backend: Option<String>,

    /// Master string handed to the job runner
    #[arg(long)]
    master: Option<String>,

    /// Enable profiling, reporting to the given collector URL
    #[arg(long)]
    profiling: Option<String>,

    /// Emit the artifact but do not submit it
    #[arg(long)]
    compile_only: bool,

    /// Disable parallel execution hints in the emitted code
    #[arg(long)]
    sequential: bool,

    /// Print the final operator graph before emission
    #[arg(long)]
    show_plan: bool,

    /// Suppress job runner console output
    #[arg(long)]
    mute_consumer: bool,

    /// Parameter substitutions applied to the script (k=v)
    #[arg(long = "params", value_name = "K=V")]
    params: Vec<String>,

    /// Directory the artifact is written to
    #[arg(long, default_value = "out")]
    outdir: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(mut config) => {
            if let Some(backend) = &cli.backend {
                config.backend.name = backend.clone();
            }
            if let Some(master) = &cli.master {
                config.backend.master = master.clone();
            }
            if cli.profiling.is_some() {
                config.profiling.enabled = true;
            }
            config
        }
        Err(e) => {
            eprintln!("piglet: configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("piglet: {e}");
            debug!(error = ?e, "compilation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("cannot read script '{}'", cli.script.display()))?;
    let source = substitute_params(&source, &cli.params);
    debug!(
        bytes = source.len(),
        script = %cli.script.display(),
        sequential = cli.sequential,
        mute_consumer = cli.mute_consumer,
        "script read"
    );

    // The surface parser is an external collaborator; a frontend build
    // links one in and registers it here.
    let Some(ops) = piglet_frontend_parse(&source) else {
        return Err(piglet::error::BackendError::FrontendMissing {
            script: cli.script.display().to_string(),
        }
        .into());
    };

    let script_name = cli
        .script
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("piglet_job")
        .to_string();

    let mut ctx = CompilerContext::new(config)?;
    let options = CompileOptions {
        script_name,
        outdir: Some(cli.outdir.clone()),
        show_plan: cli.show_plan,
    };
    let artifact = compile(ops, &mut ctx, &options)?;

    if let Some(path) = &artifact.path {
        println!("{}", path.display());
    }

    if let Some(url) = ctx.config.profiling.webhook_url.clone() {
        let payload = serde_json::json!({
            "job": options.script_name,
            "artifact": artifact.path.as_ref().map(|p| p.display().to_string()),
            "materialized": artifact.materialized.len(),
        });
        tokio::runtime::Runtime::new()?
            .block_on(piglet::profiling::notify_webhook(&url, &payload));
    }

    if cli.compile_only {
        return Ok(());
    }
    // Submission goes through the external backend runner contract; the
    // compile-only path is all this binary performs by itself.
    Ok(())
}

/// `--params k=v` textual substitution: `$k` in the script becomes `v`.
fn substitute_params(source: &str, params: &[String]) -> String {
    let mut out = source.to_string();
    for param in params {
        if let Some((key, value)) = param.split_once('=') {
            out = out.replace(&format!("${key}"), value);
        }
    }
    out
}

/// Frontend seam: resolves to the registered parser in frontend builds.
fn piglet_frontend_parse(_source: &str) -> Option<Vec<piglet::OperatorNode>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_substitution() {
        let source = "A = LOAD '$input'; STORE A INTO '$output';";
        let out = substitute_params(
            source,
            &["input=data.csv".to_string(), "output=results".to_string()],
        );
        assert_eq!(out, "A = LOAD 'data.csv'; STORE A INTO 'results';");
    }

    #[test]
    fn test_unknown_params_left_alone() {
        let source = "LOAD '$input'";
        assert_eq!(substitute_params(source, &[]), source);
    }
}
