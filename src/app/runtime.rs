use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use offliner_core::{
    DescriptorReaders, Fetcher, RepositoryResolver, ResultAggregator, RunSummary, execute, plan,
};
use tracing::{debug, info, warn};

use crate::app::{config_runtime, exit_handler, progress_manager, terminal};
use crate::{ProcessExit, app_config, output};

pub(crate) async fn run_offliner() -> Result<ProcessExit> {
    let (args, cli_sources) = config_runtime::parse_cli_with_sources();

    let loaded = app_config::load_file_config(args.config.as_deref())?;
    let args = config_runtime::apply_config_defaults(args, &cli_sources, loaded.config.as_ref());

    let default_level = config_runtime::resolve_default_log_level(&args);
    let force_cli_log_level = config_runtime::should_force_cli_log_level(&cli_sources);
    terminal::init_tracing(
        default_level,
        force_cli_log_level,
        terminal::is_no_color_requested(),
    );

    debug!(
        ?args,
        config_path = ?loaded.path,
        config_loaded = loaded.config.is_some(),
        "CLI arguments resolved"
    );
    info!("Offliner starting");

    let config = config_runtime::build_run_config(&args)?;
    let plan = plan(&config, &DescriptorReaders::default()).await?;
    let total = plan.targets.len();

    if args.dry_run {
        let width = output::terminal_width();
        for line in output::render_dry_run_lines(&plan.targets, &RepositoryResolver::new()) {
            println!("{line}");
        }
        for issue in &plan.descriptor_issues {
            eprintln!(
                "{}",
                output::truncate_to_width(
                    &format!("Input issue in {}: {}", issue.location.display(), issue.message),
                    width,
                )
            );
        }
        return Ok(if plan.descriptor_issues.is_empty() {
            ProcessExit::Success
        } else {
            ProcessExit::Partial
        });
    }

    let fetcher: Arc<dyn Fetcher> = Arc::new(config_runtime::build_http_client(&args));
    let aggregator = Arc::new(ResultAggregator::new());

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let use_spinner = terminal::should_use_spinner(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let (progress_handle, progress_stop) =
        progress_manager::spawn_progress_ui(use_spinner, Arc::clone(&aggregator), total);

    let result = execute(
        &config,
        plan,
        fetcher,
        &aggregator,
        Arc::clone(&interrupted),
    )
    .await;

    progress_stop.store(true, Ordering::SeqCst);
    if let Some(handle) = progress_handle {
        let _ = handle.await;
    }
    let summary = result?;

    info!(
        downloaded = summary.downloaded,
        failed = summary.failures.len(),
        retried = summary.retried,
        absent = summary.absent,
        total,
        "Mirror run complete"
    );

    if let Some(report) = args.report.as_deref() {
        write_report(report, &summary)?;
        info!(report = %report.display(), "Wrote run report");
    }

    if !args.quiet {
        for line in
            output::render_completion_lines(&summary, &config.mirror_dir, output::terminal_width())
        {
            println!("{line}");
        }
    }

    if summary.interrupted {
        warn!(
            downloaded = summary.downloaded,
            cancelled = summary.cancelled,
            "Interrupted. Run again to finish the mirror."
        );
    }

    Ok(exit_handler::determine_exit_outcome(&summary))
}

fn write_report(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report '{}'", path.display()))
}
