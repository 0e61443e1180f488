use std::path::PathBuf;
use crate::cli::commands::RunOnceCli;
use crate::config::RuntimeEnv;
use crate::errors::ServiceKitError;
use crate::runner::{parse_override, RunOptions, SingleTaskRunner};
use crate::service::ServiceRegistry;

pub async fn handle_run_once(args: RunOnceCli) -> Result<(), ServiceKitError> {
    let submission_overrides = args
        .submission_params
        .iter()
        .map(|kv| parse_override(kv))
        .collect::<Result<Vec<_>, _>>()?;

    let options = RunOptions {
        service_path: args.service_path,
        input_dir: PathBuf::from(args.input_dir),
        output_dir: args.output.map(PathBuf::from),
        debug: args.debug,
        manifest_path: args.manifest.map(PathBuf::from),
        submission_overrides,
    };

    let runner = SingleTaskRunner::new(ServiceRegistry::with_builtin(), RuntimeEnv::from_env());
    let outcome = runner.run(&options).await?;
    println!("Output directory: {}", outcome.output_dir.display());
    Ok(())
}
