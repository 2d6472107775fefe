use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use colored::Colorize;
use log::debug;
use similar::{ChangeTag, TextDiff};

use vyos_sample_aws::AwsProvider;
use vyos_sample_core::app::App;
use vyos_sample_core::plan::Plan;
use vyos_sample_core::stack::Stack;
use vyos_sample_stacks::{BuildError, Config, Deployment, OnPremRoute, Stage, build_app};

#[derive(Parser)]
#[command(name = "vyos-sample")]
#[command(about = "VyOS site-to-site VPN sandbox: Tokyo Transit Gateway and Osaka customer gateway", long_about = None)]
struct Cli {
    /// Increase log output (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Environment to build
    #[arg(long, value_enum, default_value_t = EnvArg::All, global = true)]
    env: EnvArg,

    /// Environment configuration file (JSON); needs --env dev or --env prod
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EnvArg {
    Dev,
    Prod,
    All,
}

impl EnvArg {
    fn stages(self) -> Vec<Stage> {
        match self {
            EnvArg::Dev => vec![Stage::Dev],
            EnvArg::Prod => vec![Stage::Prod],
            EnvArg::All => Stage::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the stacks with their account, region and size
    List,
    /// Validate configuration, resources and references
    Validate,
    /// Show each stack's resources as a dependency tree
    Plan {
        /// Only show this stack
        #[arg(long)]
        stack: Option<String>,
    },
    /// Write the cloud assembly (templates and manifest)
    Synth {
        /// Output directory
        #[arg(long, default_value = "cdk.out")]
        out: PathBuf,

        /// Check that the assembly on disk is up-to-date (don't write)
        #[arg(long)]
        check: bool,

        /// Show diff of changed templates
        #[arg(long)]
        diff: bool,

        /// VPN attachment id to route the on-premises network through
        #[arg(long)]
        vpn_attachment: Option<String>,
    },
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let result = match &cli.command {
        Commands::List => run_list(&cli),
        Commands::Validate => run_validate(&cli),
        Commands::Plan { stack } => run_plan(&cli, stack.as_deref()),
        Commands::Synth {
            out,
            check,
            diff,
            vpn_attachment,
        } => run_synth(&cli, out, *check, *diff, vpn_attachment.as_deref()),
        Commands::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "vyos-sample", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn deployments(cli: &Cli, vpn_attachment: Option<&str>) -> Result<Vec<Deployment>> {
    let stages = cli.env.stages();
    if stages.len() > 1 && cli.config.is_some() {
        bail!("--config applies to one environment; pass --env dev or --env prod");
    }
    if stages.len() > 1 && vpn_attachment.is_some() {
        bail!("--vpn-attachment applies to one environment; pass --env dev or --env prod");
    }

    let mut deployments = Vec::with_capacity(stages.len());
    for stage in stages {
        let mut deployment = Deployment::new(stage);
        if let Some(path) = &cli.config {
            let config = Config::load_from_file(path)
                .with_context(|| format!("Failed to load the {} configuration", stage))?;
            debug!("{}: configuration loaded from {}", stage, path.display());
            deployment = deployment.with_config(config);
        }
        if let Some(id) = vpn_attachment {
            deployment = deployment.with_on_prem_route(OnPremRoute::attached(id)?);
        }
        deployments.push(deployment);
    }
    Ok(deployments)
}

fn build(cli: &Cli, vpn_attachment: Option<&str>) -> Result<App> {
    match build_app(&deployments(cli, vpn_attachment)?) {
        Ok(app) => Ok(app),
        Err(BuildError::Config { stage, errors }) => {
            for error in &errors {
                eprintln!("  {} {}", "•".red(), error);
            }
            bail!("{} configuration has {} problem(s)", stage, errors.len())
        }
        Err(e) => Err(e.into()),
    }
}

fn run_list(cli: &Cli) -> Result<()> {
    let app = build(cli, None)?;

    println!("{}", "Stacks:".cyan().bold());
    for stack in app.stacks() {
        println!(
            "  • {} ({}/{})",
            stack.name().bold(),
            stack.env().account,
            stack.env().region
        );
        println!(
            "    {} resources, {} outputs",
            stack.resources().len(),
            stack.outputs().len()
        );
    }
    Ok(())
}

fn run_validate(cli: &Cli) -> Result<()> {
    println!("{}", "Validating...".cyan());

    let app = build(cli, None)?;
    if let Err(errors) = app.validate(&AwsProvider) {
        for error in &errors {
            eprintln!("  {} {}", "•".red(), error);
        }
        bail!("{} error(s) found", errors.len());
    }

    println!(
        "{}",
        format!("✓ {} stacks validated successfully.", app.stacks().len())
            .green()
            .bold()
    );
    for stack in app.stacks() {
        println!("  • {} ({} resources)", stack.name(), stack.resources().len());
    }
    Ok(())
}

fn run_plan(cli: &Cli, only: Option<&str>) -> Result<()> {
    let app = build(cli, None)?;

    let stacks: Vec<&Stack> = match only {
        Some(name) => vec![
            app.stack(name)
                .with_context(|| format!("Unknown stack '{}'", name))?,
        ],
        None => app.stacks().iter().collect(),
    };

    for stack in stacks {
        print_plan(stack);
    }
    Ok(())
}

fn print_plan(stack: &Stack) {
    let plan = Plan::from_stack(stack);
    let graph = stack.dependency_graph();

    println!(
        "{} {} ({}/{})",
        "Stack:".cyan().bold(),
        stack.name().bold(),
        stack.env().account,
        stack.env().region
    );
    println!();

    let mut printed: HashSet<String> = HashSet::new();

    fn print_resource_tree(
        logical_id: &str,
        stack: &Stack,
        graph: &vyos_sample_core::graph::DependencyGraph,
        printed: &mut HashSet<String>,
        depth: usize,
        is_last: bool,
        prefix: &str,
    ) {
        if !printed.insert(logical_id.to_string()) {
            return;
        }
        let Some(resource) = stack.resource(logical_id) else {
            return;
        };

        let connector = if depth == 0 {
            String::new()
        } else if is_last {
            format!("{}└─ ", prefix)
        } else {
            format!("{}├─ ", prefix)
        };
        println!(
            "  {}{} {}.{}",
            connector,
            "+".green().bold(),
            resource.id.resource_type.cyan(),
            logical_id.bold()
        );

        let children: Vec<&String> = graph
            .dependents_of(logical_id)
            .iter()
            .filter(|c| !printed.contains(c.as_str()))
            .collect();
        let child_prefix = if depth == 0 {
            String::new()
        } else if is_last {
            format!("{}   ", prefix)
        } else {
            format!("{}│  ", prefix)
        };
        for (i, child) in children.iter().enumerate() {
            print_resource_tree(
                child,
                stack,
                graph,
                printed,
                depth + 1,
                i + 1 == children.len(),
                &child_prefix,
            );
        }
    }

    for root in graph.root_resources() {
        print_resource_tree(&root, stack, &graph, &mut printed, 0, true, "");
    }
    // anything left sits on a cycle
    for resource in plan.resources() {
        print_resource_tree(resource.logical_id(), stack, &graph, &mut printed, 0, true, "");
    }

    let summary = plan.summary();
    println!();
    for (resource_type, count) in &summary.by_type {
        println!("  {:>3} × {}", count, resource_type);
    }
    println!("{}", summary.to_string().bold());
    println!();
}

fn run_synth(
    cli: &Cli,
    out: &Path,
    check: bool,
    show_diff: bool,
    vpn_attachment: Option<&str>,
) -> Result<()> {
    let app = build(cli, vpn_attachment)?;
    let assembly = app.synth(&AwsProvider)?;
    let stale = assembly.stale_files(out)?;

    if show_diff {
        for (name, rendered) in assembly.rendered_files(out)? {
            if stale.contains(&name) {
                let on_disk = fs::read_to_string(out.join(&name)).unwrap_or_default();
                print_diff(&out.join(&name), &on_disk, &rendered);
            }
        }
    }

    if check {
        if stale.is_empty() {
            println!("{}", "Cloud assembly is up-to-date.".green());
            return Ok(());
        }
        println!("{}", "The following files are out of date:".yellow());
        for name in &stale {
            println!("  {}", out.join(name).display());
        }
        bail!("Cloud assembly in {} is out of date", out.display());
    }

    assembly.write(out)?;
    for stack in assembly.stacks() {
        let marker = if stale.contains(&stack.template_file_name()) {
            "Synthesized:".green()
        } else {
            "Unchanged:".normal()
        };
        println!(
            "{} {}",
            marker,
            out.join(stack.template_file_name()).display()
        );
    }
    println!(
        "{}",
        format!(
            "✓ {} stack(s) written to {}.",
            assembly.stacks().len(),
            out.display()
        )
        .green()
        .bold()
    );
    Ok(())
}

fn print_diff(file: &Path, current: &str, rendered: &str) {
    println!("\n{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(current, rendered);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}
