use clap::Parser;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser, Debug)]
#[command(
    name = "run_service_once",
    version,
    long_version = LONG_VERSION,
    about = "Run a single analysis service against one task directory"
)]
pub struct RunOnceCli {
    /// Service to run, as module.ClassName
    #[arg(env = "SERVICE_PATH")]
    pub service_path: String,

    /// Directory holding task.json and the file it names
    pub input_dir: String,

    /// Output directory (default: <input_dir>/<filename>_<service>)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Debug logging and print the result when done
    #[arg(short, long)]
    pub debug: bool,

    /// Service manifest (default: SERVICE_MANIFEST_PATH, then service_manifest.yml)
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// Override a submission parameter (repeatable)
    #[arg(short = 's', long = "submission-param", value_name = "KEY=VALUE")]
    pub submission_params: Vec<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "validate_manifest",
    version,
    long_version = LONG_VERSION,
    about = "Validate a service manifest"
)]
pub struct ValidateCli {
    /// Path to service_manifest.yml
    pub path: String,

    /// Print the normalized manifest
    #[arg(long)]
    pub print: bool,

    /// Debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
