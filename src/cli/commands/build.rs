//! Build command: read, run plugins and write the documentation

use super::{InputArgs, validate_config};
use crate::cli::error::CliError;
use crate::cli::output;
use crate::pipeline::{RunOptions, RunReport, run};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Arguments of the build command
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output directory for the generated documentation
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Remove the output directory before writing
    #[arg(long)]
    pub clean: bool,

    /// Also generate an OpenAPI specification per module
    #[arg(long)]
    pub openapi: bool,

    /// Base URL of the published OpenAPI files, used in module links
    #[arg(long, requires = "openapi")]
    pub openapi_link_path: Option<String>,
}

/// Handle the build command
pub async fn handle_build(args: &BuildArgs) -> Result<RunReport, CliError> {
    let mut config = args.input.load_config()?;
    if let Some(output) = &args.output {
        config = config.with_output(output);
    }
    if args.clean {
        config = config.with_clean_output(true);
    }
    if args.openapi {
        config = config.with_openapi(true);
    }
    if let Some(link_path) = &args.openapi_link_path {
        config.openapi.link_path = Some(link_path.clone());
    }
    validate_config(&config)?;

    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        "Building documentation"
    );
    let options = RunOptions::from_config(&config)?;
    let report = run(options).await?;
    println!("{}", output::format_report(&report));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_input(root: &std::path::Path) {
        fs::create_dir_all(root.join("orders")).unwrap();
        fs::write(root.join("index.yaml"), "title: Shop\n").unwrap();
        fs::write(root.join("orders/index.yaml"), "$id: /orders\ntitle: Orders\n").unwrap();
        fs::write(
            root.join("orders/Order.yaml"),
            "$id: /orders/Order.yaml\ntitle: Order\ntype: object\nproperties:\n  number:\n    type: string\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_build_writes_documentation_and_openapi() {
        let temp = tempfile::tempdir().unwrap();
        let input = temp.path().join("in");
        let out = temp.path().join("out");
        write_input(&input);

        let args = BuildArgs {
            input: InputArgs {
                input: Some(input),
                ..InputArgs::default()
            },
            output: Some(out.clone()),
            openapi: true,
            ..BuildArgs::default()
        };
        let report = handle_build(&args).await.unwrap();

        assert_eq!(report.schemas, 1);
        assert!(out.join("README.md").exists());
        assert!(out.join("orders/README.md").exists());
        assert!(out.join("orders/Order.yaml.md").exists());
        assert!(out.join("orders/orders.openapi.yaml").exists());
    }

    #[tokio::test]
    async fn test_build_rejects_same_input_and_output() {
        let temp = tempfile::tempdir().unwrap();
        write_input(temp.path());
        let args = BuildArgs {
            input: InputArgs {
                input: Some(temp.path().to_path_buf()),
                ..InputArgs::default()
            },
            output: Some(temp.path().to_path_buf()),
            ..BuildArgs::default()
        };
        let err = handle_build(&args).await.unwrap_err();
        assert!(err.user_message().starts_with("Configuration error"));
    }
}
