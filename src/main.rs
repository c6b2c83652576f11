use layercake::cli::commands::{CliArgs, Commands, PlanArgs, ProbeArgs, RenderArgs, VerifyArgs};
use layercake::cli::output::{OutputFormat, OutputFormatter};
use layercake::config::PipelineConfig;
use layercake::fs::RealFileSystem;
use layercake::health::{HealthMonitor, HealthState, HttpProbe, ProbeConfig};
use layercake::pipeline::{BuildContext, PipelineOrchestrator};
use layercake::render::ContainerfileRenderer;
use layercake::resolve::{CachingResolver, UvResolver};
use layercake::verify::VerifyReport;
use layercake::{NAME, VERSION};

use clap::Parser;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Plan(plan_args) => handle_plan(plan_args).await,
        Commands::Render(render_args) => handle_render(render_args).await,
        Commands::Verify(verify_args) => handle_verify(verify_args),
        Commands::Probe(probe_args) => handle_probe(probe_args).await,
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let level = if let Some(level_str) = &args.log_level {
            parse_level(level_str)
        } else if args.verbose {
            Level::DEBUG
        } else if args.quiet {
            Level::ERROR
        } else {
            let level_str = env::var("LAYERCAKE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
            parse_level(&level_str)
        };

        let mut filter = EnvFilter::from_default_env();

        if env::var("RUST_LOG").is_err() {
            filter = filter
                .add_directive(format!("layercake={}", level).parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("reqwest=warn".parse().unwrap());
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    });
}

fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn service_path(path: &Option<PathBuf>) -> PathBuf {
    path.clone()
        .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn configure(
    cpu_index_url: &Option<String>,
    cpu_extra: &Option<String>,
    no_strict_cpu: bool,
) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    if let Some(url) = cpu_index_url {
        config = config.with_cpu_index_url(url.clone());
    }
    if let Some(group) = cpu_extra {
        config = config.with_cpu_extra(group.clone());
    }
    if no_strict_cpu {
        config.strict_cpu = false;
    }
    config
}

async fn plan_image(
    path: &PathBuf,
    config: PipelineConfig,
) -> anyhow::Result<layercake::output::schema::ImageSpec> {
    // Ambiguous variant configuration must fail before any stage work.
    config.variant_mechanism()?;

    let prefix = config.install_prefix.clone();
    let mut context = BuildContext::new(
        path,
        config,
        Arc::new(RealFileSystem::new()),
        Arc::new(CachingResolver::new(UvResolver::new(prefix))),
    );
    PipelineOrchestrator::new().execute(&mut context).await
}

/// Configuration mistakes (e.g. both variant mechanisms requested) exit 2,
/// matching clap's usage-error convention; pipeline failures exit 1.
fn plan_failure_code(e: &anyhow::Error) -> i32 {
    if e.downcast_ref::<layercake::config::ConfigError>().is_some() {
        2
    } else {
        1
    }
}

async fn handle_plan(args: &PlanArgs) -> i32 {
    let path = service_path(&args.service_path);
    let config = configure(&args.cpu_index_url, &args.cpu_extra, args.no_strict_cpu);

    let image = match plan_image(&path, config).await {
        Ok(image) => image,
        Err(e) => {
            error!("Plan failed: {:#}", e);
            return plan_failure_code(&e);
        }
    };

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    match formatter.format(&image) {
        Ok(text) => emit(&text, &args.output),
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}

async fn handle_render(args: &RenderArgs) -> i32 {
    let path = service_path(&args.service_path);
    let config = configure(&args.cpu_index_url, &args.cpu_extra, false);

    let image = match plan_image(&path, config).await {
        Ok(image) => image,
        Err(e) => {
            error!("Plan failed: {:#}", e);
            return plan_failure_code(&e);
        }
    };

    match ContainerfileRenderer::new().render(&image) {
        Ok(containerfile) => emit(&containerfile, &args.output),
        Err(e) => {
            error!("Render failed: {:#}", e);
            1
        }
    }
}

fn handle_verify(args: &VerifyArgs) -> i32 {
    let output = match &args.report_path {
        Some(path) => fs::read_to_string(path),
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        }
    };
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            error!("Failed to read report: {}", e);
            return 1;
        }
    };

    let report = match VerifyReport::parse(&args.package, &output) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    match report.enforce(!args.no_strict_cpu) {
        Ok(()) => {
            info!(
                package = %report.package,
                version = %report.version,
                "CPU-only verification passed"
            );
            0
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    }
}

async fn handle_probe(args: &ProbeArgs) -> i32 {
    let mut config = ProbeConfig::default();
    if let Some(url) = &args.url {
        config.endpoint = url.clone();
    }

    let probe = HttpProbe::new(config.endpoint.clone(), config.timeout);
    let mut monitor = HealthMonitor::new(probe, config);

    let state = if args.once {
        monitor.tick().await
    } else {
        monitor.watch_until_settled().await
    };

    match state {
        HealthState::Healthy => {
            info!("Service is healthy");
            0
        }
        HealthState::Starting => {
            info!("Service is still starting");
            0
        }
        HealthState::Unhealthy => {
            error!("Service is unhealthy");
            1
        }
    }
}

fn emit(text: &str, output: &Option<PathBuf>) -> i32 {
    match output {
        Some(path) => match fs::write(path, text) {
            Ok(()) => {
                info!(file = %path.display(), "Wrote output");
                0
            }
            Err(e) => {
                error!("Failed to write {}: {}", path.display(), e);
                1
            }
        },
        None => {
            println!("{}", text);
            0
        }
    }
}
