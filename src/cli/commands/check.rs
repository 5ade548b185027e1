//! Check command: read and validate the input without writing anything

use super::{InputArgs, validate_config};
use crate::cli::error::CliError;
use crate::cli::output;
use crate::models::Model;
use crate::pipeline::PipelineError;
use crate::reader::{DefaultReader, ReadError, Reader};
use crate::storage::filesystem::FileSystemStorageBackend;
use clap::Args;

/// Arguments of the check command
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Handle the check command
///
/// Prints every validation error; the command fails when there is at least one.
pub async fn handle_check(args: &CheckArgs) -> Result<Model, CliError> {
    let config = args.input.load_config()?;
    validate_config(&config)?;

    let reader = DefaultReader::new(FileSystemStorageBackend::new(&config.input), "")
        .with_config(config.reader_config()?);
    match reader.read().await {
        Ok(model) => {
            println!("{}", output::format_model_summary(&model));
            Ok(model)
        }
        Err(ReadError::Validation(errors)) => {
            eprintln!("{}", output::format_errors(&errors));
            Err(CliError::Pipeline(PipelineError::Validation(errors)))
        }
        Err(e) => Err(PipelineError::from(e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_check_reports_every_error() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("orders")).unwrap();
        fs::write(root.join("index.yaml"), "title: Shop\n").unwrap();
        fs::write(root.join("orders/index.yaml"), "$id: /orders\ntitle: Orders\n").unwrap();
        fs::write(
            root.join("orders/Order.yaml"),
            "$id: /orders/Order.yaml\ntitle: Order\ntype: object\nproperties:\n  customer:\n    $ref: ../customers/Customer.yaml\n  item:\n    $ref: ./Item.yaml\n",
        )
        .unwrap();

        let args = CheckArgs {
            input: InputArgs {
                input: Some(root.to_path_buf()),
                ..InputArgs::default()
            },
        };
        match handle_check(&args).await {
            Err(CliError::Pipeline(PipelineError::Validation(errors))) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_missing_input_directory() {
        let temp = tempfile::tempdir().unwrap();
        let args = CheckArgs {
            input: InputArgs {
                input: Some(temp.path().join("missing")),
                ..InputArgs::default()
            },
        };
        let err = handle_check(&args).await.unwrap_err();
        assert!(err.user_message().starts_with("Directory not found"));
    }
}
