use std::path::PathBuf;
use crate::cli::commands::ValidateCli;
use crate::errors::ServiceKitError;
use crate::manifest::{manifest_to_yaml, parse_manifest};

pub async fn handle_validate(args: ValidateCli) -> Result<(), ServiceKitError> {
    let path = PathBuf::from(&args.path);
    let manifest = parse_manifest(&path).await?;
    if args.print {
        print!("{}", manifest_to_yaml(&manifest)?);
    } else {
        println!(
            "Service manifest is valid: {} {} ({} heuristics, {} submission params)",
            manifest.name,
            manifest.version,
            manifest.heuristics.len(),
            manifest.submission_params.len()
        );
    }
    Ok(())
}
