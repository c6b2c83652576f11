use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parameterized multi-stage container build pipeline for CPU-only Python ML services
#[derive(Parser, Debug)]
#[command(
    name = "layercake",
    about = "Plan, validate, and render the multi-stage container build for a CPU-only Python ML service",
    version,
    author,
    long_about = "layercake turns a dependency manifest into a validated multi-stage \
                  container build: a builder stage that installs the CPU-only variant \
                  of the ML runtime behind a cache-friendly layer contract, and a slim \
                  runtime stage carrying only the service, its artifacts, and a health \
                  probe client."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Plan the image build from a dependency manifest",
        long_about = "Runs the stage pipeline over a service directory and prints the \
                      resulting image spec.\n\n\
                      Examples:\n  \
                      layercake plan\n  \
                      layercake plan /path/to/service --format yaml\n  \
                      layercake plan --cpu-extra cpu"
    )]
    Plan(PlanArgs),

    #[command(
        about = "Render the Containerfile for a service",
        long_about = "Plans the build and renders the single parameterized multi-stage \
                      Containerfile.\n\n\
                      Examples:\n  \
                      layercake render\n  \
                      layercake render /path/to/service -o Containerfile"
    )]
    Render(RenderArgs),

    #[command(
        about = "Check a captured CPU-only verification report",
        long_about = "Parses the two-line version/accelerator report emitted by the \
                      builder stage's verification layer and enforces the CPU-only \
                      constraint on the host side.\n\n\
                      Examples:\n  \
                      layercake verify build-report.txt\n  \
                      docker logs build | layercake verify --package torch"
    )]
    Verify(VerifyArgs),

    #[command(
        about = "Watch a running service's health endpoint",
        long_about = "Drives the liveness probe against a running service using the \
                      fixed contract values (30s interval, 3s timeout, 3 retries) and \
                      exits once the state settles.\n\n\
                      Examples:\n  \
                      layercake probe\n  \
                      layercake probe --url http://127.0.0.1:8000/health --once"
    )]
    Probe(ProbeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct PlanArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the service directory (defaults to current directory)"
    )]
    pub service_path: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "URL",
        help = "Select the CPU variant via an alternate wheel index"
    )]
    pub cpu_index_url: Option<String>,

    #[arg(
        long,
        value_name = "GROUP",
        help = "Select the CPU variant via an install-mode dependency group"
    )]
    pub cpu_extra: Option<String>,

    #[arg(long, help = "Demote the CPU-only assertion from fatal to a warning")]
    pub no_strict_cpu: bool,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the service directory (defaults to current directory)"
    )]
    pub service_path: Option<PathBuf>,

    #[arg(
        long,
        value_name = "URL",
        help = "Select the CPU variant via an alternate wheel index"
    )]
    pub cpu_index_url: Option<String>,

    #[arg(
        long,
        value_name = "GROUP",
        help = "Select the CPU variant via an install-mode dependency group"
    )]
    pub cpu_extra: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the Containerfile to a file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct VerifyArgs {
    #[arg(
        value_name = "FILE",
        help = "Report file to check (reads stdin when omitted)"
    )]
    pub report_path: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PACKAGE",
        default_value = "torch",
        help = "ML runtime package the report describes"
    )]
    pub package: String,

    #[arg(long, help = "Demote the CPU-only assertion from fatal to a warning")]
    pub no_strict_cpu: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ProbeArgs {
    #[arg(
        long,
        value_name = "URL",
        help = "Health endpoint to probe (defaults to the contract endpoint)"
    )]
    pub url: Option<String>,

    #[arg(long, help = "Probe once immediately instead of watching the interval")]
    pub once: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Human,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_parse() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_plan_with_mechanism_flags() {
        let args = CliArgs::parse_from(["layercake", "plan", "/srv/app", "--cpu-extra", "cpu"]);
        match args.command {
            Commands::Plan(plan) => {
                assert_eq!(plan.service_path, Some(PathBuf::from("/srv/app")));
                assert_eq!(plan.cpu_extra.as_deref(), Some("cpu"));
                assert!(plan.cpu_index_url.is_none());
            }
            other => panic!("expected plan, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_defaults_to_torch_and_stdin() {
        let args = CliArgs::parse_from(["layercake", "verify"]);
        match args.command {
            Commands::Verify(verify) => {
                assert!(verify.report_path.is_none());
                assert_eq!(verify.package, "torch");
                assert!(!verify.no_strict_cpu);
            }
            other => panic!("expected verify, got {:?}", other),
        }
    }

    #[test]
    fn test_probe_once() {
        let args = CliArgs::parse_from(["layercake", "probe", "--once"]);
        match args.command {
            Commands::Probe(probe) => assert!(probe.once),
            other => panic!("expected probe, got {:?}", other),
        }
    }
}
