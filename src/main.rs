use clap::{Parser, Subcommand};
use orgsite::publish::ProgressFn;
use orgsite::theme::ThemeRegistry;
use orgsite::{config, orchestrate, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orgsite")]
#[command(about = "Static site publisher for org-mode, Markdown, and notebook workspaces")]
#[command(long_about = "\
Static site publisher for org-mode, Markdown, and notebook workspaces

A workspace is described by a Jupyter-Book-compatible _config.yml or a native
.org-publish.json, holding one or more named projects:

  workspace/
  ├── _config.yml                  # or .org-publish.json
  ├── _toc.yml                     # optional: declared document order + navigation
  ├── index.org                    # sources: .org, .md, .ipynb
  ├── guide/
  │   ├── setup.md
  │   └── analysis.ipynb
  └── _build/html/                 # published output (configurable)

With a _toc.yml, files publish in declared order and pages get prev/next
navigation. Without one, the base directory is scanned for sources and a
sitemap can be generated instead. Component projects ({\"components\": [..]})
expand to their members and publish those in order.

Run 'orgsite init' to create a starter .org-publish.json.")]
#[command(version)]
struct Cli {
    /// Workspace root directory
    #[arg(long, default_value = ".", global = true)]
    workspace: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish the workspace (or one project) to HTML
    Publish {
        /// Publish only this project
        #[arg(long)]
        project: Option<String>,
        /// Republish everything, ignoring up-to-date outputs
        #[arg(long)]
        force: bool,
        /// Read and convert but write nothing
        #[arg(long)]
        dry_run: bool,
        /// Write a JSON run report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Check the workspace configuration without publishing
    Validate,
    /// Create a starter .org-publish.json
    Init,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Publish {
            project,
            force,
            dry_run,
            report,
        } => {
            let Some(workspace_config) = config::load_workspace_config(&cli.workspace)? else {
                eprintln!(
                    "No _config.yml or .org-publish.json in {}. Run 'orgsite init' first.",
                    cli.workspace.display()
                );
                std::process::exit(1);
            };

            let findings = config::validate_config(&workspace_config);
            if !findings.is_empty() {
                output::print_validation_output(&findings);
                std::process::exit(1);
            }

            let registry = ThemeRegistry::new();
            let options = orchestrate::WorkspaceOptions {
                force,
                dry_run,
                project,
            };
            let progress = |current: usize, total: usize, name: &str| {
                println!("[{}/{}] {}", current, total, name);
            };
            let results = orchestrate::publish_workspace(
                &workspace_config,
                &cli.workspace,
                &registry,
                &options,
                Some(&progress as ProgressFn),
            )?;

            output::print_publish_output(&results);
            if let Some(report_path) = report {
                std::fs::write(&report_path, serde_json::to_string_pretty(&results)?)?;
                println!("Report written to {}", report_path.display());
            }

            if results.iter().any(|r| r.error_count > 0) {
                std::process::exit(1);
            }
        }
        Command::Validate => {
            let Some(workspace_config) = config::load_workspace_config(&cli.workspace)? else {
                eprintln!(
                    "No _config.yml or .org-publish.json in {}. Run 'orgsite init' first.",
                    cli.workspace.display()
                );
                std::process::exit(1);
            };
            let findings = config::validate_config(&workspace_config);
            output::print_validation_output(&findings);
            if !findings.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Init => {
            let json_path = cli.workspace.join(".org-publish.json");
            if json_path.exists() {
                eprintln!("{} already exists", json_path.display());
                std::process::exit(1);
            }
            config::save_config(&config::starter_config(), &cli.workspace)?;
            println!("Created {}", json_path.display());
        }
    }

    Ok(())
}
