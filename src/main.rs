mod cli;
mod printer;

use std::{process::ExitCode, sync::Arc, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use cli::{Command, ParamsArgs, RunArgs};
use plugin_interop::{
    config::Config,
    interpreter::InterpreterType,
    matrix::format::{self, DELIMITER},
    process::NullStatus,
    Matrix, MatrixProcessing, Parameters, ProcessContext,
};
use printer::TextPrinter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    // Load config
    let cfg = Config::load();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_filter()))
        .with_writer(std::io::stderr)
        .init();

    match dispatch(&cfg, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            TextPrinter::error().eprint(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cfg: &Config, command: Command) -> Result<()> {
    match command {
        Command::Run(run) => run_command(cfg, run).await,
        Command::Locate { family, interpreter, json } => {
            locate_command(cfg, family, interpreter, json).await
        }
        Command::Params(params) => params_command(cfg, params).await,
        Command::Preview { input, output, annotations } => {
            let mut m = Matrix::new();
            format::read(&mut m, &input, DELIMITER)?;
            format::write(&m, &output, annotations)?;
            TextPrinter::success().eprint(&format!("Wrote {} to {}", m, output.display()));
            Ok(())
        }
        Command::Families => {
            for ty in InterpreterType::ALL {
                let f = ty.family();
                println!(
                    "{}\t{}\tcommand={}\tlibrary={}\tfilter={}",
                    f.name, f.display_name, f.primary_command, f.helper_library, f.code_filter
                );
            }
            Ok(())
        }
    }
}

async fn run_command(cfg: &Config, run: RunArgs) -> Result<()> {
    let count = run.suppl_tables.unwrap_or(run.suppl_output.len());
    ensure!(
        run.suppl_output.len() == count,
        "{} supplementary tables declared but {} --suppl-output paths given",
        count,
        run.suppl_output.len()
    );

    let step = MatrixProcessing::from_config(run.family.family(), cfg)
        .with_suppl_tables(count)
        .keep_temp_files(run.keep_temp || cfg.keep_temp_files());
    if !step.family().matches_code_file(&run.code_file) {
        TextPrinter::warning().eprint(&format!(
            "Warning: '{}' does not match the {} code filter ({})",
            run.code_file.display(),
            step.family().name,
            step.family().code_filter
        ));
    }

    let mut mdata = Matrix::new();
    format::read(&mut mdata, &run.input, DELIMITER)
        .with_context(|| format!("reading input matrix {}", run.input.display()))?;

    let interpreter = run
        .interpreter
        .clone()
        .unwrap_or_else(|| cfg.interpreter_path(run.family));
    let params = Parameters::new(&run.code_file)
        .with_interpreter(interpreter)
        .with_additional_arguments(run.additional_arguments.clone());

    let status = TextPrinter::status();
    let ctx = ProcessContext::from_config(cfg, Arc::new(move |s: &str| status.eprint(s)))
        .with_timeout(run.timeout.map(Duration::from_secs).or(cfg.timeout()));

    // Ctrl-C cancels the running script
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut suppl = Vec::new();
    if let Err(e) = step.process_data(&mut mdata, &params, &mut suppl, &ctx).await {
        let stage = e.stage();
        return Err(anyhow::Error::new(e).context(format!("{} failed while {}", step.name(), stage)));
    }

    format::write(&mdata, &run.output, run.annotations)
        .with_context(|| format!("writing output matrix {}", run.output.display()))?;
    for (i, (table, path)) in suppl.iter().zip(&run.suppl_output).enumerate() {
        format::write(table, path, run.annotations).with_context(|| {
            format!("writing supplementary table {} to {}", i + 1, path.display())
        })?;
    }
    TextPrinter::success().eprint(&format!("Wrote {} to {}", mdata, run.output.display()));
    Ok(())
}

async fn params_command(cfg: &Config, args: ParamsArgs) -> Result<()> {
    let step = MatrixProcessing::from_config(args.family.family(), cfg).with_suppl_tables(args.suppl_tables);
    let interpreter = args
        .interpreter
        .unwrap_or_else(|| cfg.interpreter_path(args.family));
    let params = Parameters::new(&args.code_file)
        .with_interpreter(interpreter)
        .with_additional_arguments(args.additional_arguments);
    let preview = step.preview_parameters(&params, &ProcessContext::from_config(cfg, Arc::new(NullStatus))).await;
    println!("{}", serde_json::to_string_pretty(&preview)?);
    Ok(())
}

async fn locate_command(
    cfg: &Config,
    family: InterpreterType,
    interpreter: Option<String>,
    json: bool,
) -> Result<()> {
    let locator = MatrixProcessing::from_config(family.family(), cfg).locator();
    let explicit = interpreter.unwrap_or_else(|| cfg.interpreter_path(family));
    match locator.resolve(&explicit).await {
        Some(res) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&res)?);
            } else {
                TextPrinter::success().print(&res.path.display().to_string());
            }
            Ok(())
        }
        None => bail!(
            "no {} interpreter with '{}' found on PATH or in {:?}",
            family,
            family.family().helper_library,
            locator.roots()
        ),
    }
}
