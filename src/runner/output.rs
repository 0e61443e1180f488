use std::path::{Path, PathBuf};
use crate::errors::ServiceKitError;
use crate::result::{FileRef, ResultDescriptor};
use tracing::{debug, info};

pub const RESULT_FILE_NAME: &str = "result.json";
pub const EXTRACTED_DIR: &str = "extracted";
pub const SUPPLEMENTARY_DIR: &str = "supplementary";

/// `<input_dir>/<filename>_<service>` when no output directory is given.
pub fn default_output_dir(input_dir: &Path, filename: &str, service_name: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());
    input_dir.join(format!("{}_{}", stem, service_name.to_lowercase()))
}

/// Refuse an output directory that would take the inputs with it when it is
/// replaced: the input directory itself, any of its ancestors, or a path that
/// already exists as something other than a directory.
pub fn check_output_dir(output_dir: &Path, input_dir: &Path) -> Result<(), ServiceKitError> {
    if !output_dir.exists() {
        return Ok(());
    }
    if !output_dir.is_dir() {
        return Err(ServiceKitError::Input(format!(
            "Output path exists and is not a directory: {}",
            output_dir.display()
        )));
    }

    let output = output_dir.canonicalize()?;
    let input = input_dir.canonicalize()?;
    if input.starts_with(&output) {
        return Err(ServiceKitError::Input(format!(
            "Output directory {} would replace the input directory {}",
            output_dir.display(),
            input_dir.display()
        )));
    }
    Ok(())
}

/// Replace `output_dir` with the result and copies of every produced file.
pub async fn write_output(output_dir: &Path, descriptor: &ResultDescriptor) -> Result<(), ServiceKitError> {
    if output_dir.exists() {
        debug!(path = %output_dir.display(), "Replacing existing output directory");
        tokio::fs::remove_dir_all(output_dir).await?;
    }
    tokio::fs::create_dir_all(output_dir).await?;

    copy_files(&output_dir.join(EXTRACTED_DIR), &descriptor.response.extracted).await?;
    copy_files(&output_dir.join(SUPPLEMENTARY_DIR), &descriptor.response.supplementary).await?;

    let result_path = output_dir.join(RESULT_FILE_NAME);
    tokio::fs::write(&result_path, serde_json::to_vec_pretty(descriptor)?).await?;
    info!(path = %result_path.display(), "Result written");
    Ok(())
}

async fn copy_files(dir: &Path, files: &[FileRef]) -> Result<(), ServiceKitError> {
    if files.is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir).await?;
    for file in files {
        let target = dir.join(output_file_name(file));
        tokio::fs::copy(&file.path, &target).await.map_err(|e| {
            ServiceKitError::Service(format!("Cannot copy {} to output: {}", file.path.display(), e))
        })?;
    }
    Ok(())
}

/// Plain names are kept; anything path-like falls back to the digest.
fn output_file_name(file: &FileRef) -> String {
    let plain = !file.name.is_empty()
        && file.name != "."
        && file.name != ".."
        && !file.name.contains(['/', '\\']);
    if plain {
        file.name.clone()
    } else {
        file.sha256.clone()
    }
}
