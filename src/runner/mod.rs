//! Run one service against one file and collect what it produced.

pub mod output;
pub mod params;

use chrono::Utc;
use console::style;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use crate::config::RuntimeEnv;
use crate::errors::ServiceKitError;
use crate::manifest::{parse_manifest_file, FileTypeFilter, ServiceManifest};
use crate::result::{Milestones, ResponseInfo, ResultDescriptor, ServiceResult};
use crate::service::{AnalysisService, ServiceContext, ServiceRegistry, ServiceRequest};
use crate::task::{load_task, unpack_task, LoadedTask};
use crate::utils::formatting::format_duration;
use crate::utils::truncation::truncate_output;
use tracing::{debug, info, warn};

pub use output::{check_output_dir, default_output_dir, write_output, RESULT_FILE_NAME};
pub use params::{parse_override, resolve_submission_params};

pub const MANIFEST_FILE_NAME: &str = "service_manifest.yml";
/// Scratch subdirectory handed to the service.
pub const WORKING_DIR_NAME: &str = "working_directory";

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Dotted path of the service, e.g. `result_sample.ResultSample`.
    pub service_path: String,
    pub input_dir: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub debug: bool,
    pub manifest_path: Option<PathBuf>,
    pub submission_overrides: Vec<(String, String)>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub output_dir: PathBuf,
    pub descriptor: ResultDescriptor,
    pub elapsed: Duration,
}

/// Drives a single task through a service: load, start, execute under the
/// manifest timeout, finalize, write, stop.
#[derive(Debug)]
pub struct SingleTaskRunner {
    registry: ServiceRegistry,
    runtime: RuntimeEnv,
}

impl SingleTaskRunner {
    pub fn new(registry: ServiceRegistry, runtime: RuntimeEnv) -> Self {
        Self { registry, runtime }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<RunOutcome, ServiceKitError> {
        let started = Instant::now();
        let task = load_task(&options.input_dir).await?;

        let manifest_path = locate_manifest(options, &self.runtime)?;
        let manifest = Arc::new(parse_manifest_file(&manifest_path, &self.runtime.service_tag).await?);
        info!(service = %manifest.name, version = %manifest.version, "Service manifest loaded");

        let filter = FileTypeFilter::from_manifest(&manifest)?;
        if !filter.matches(&task.file_info.file_type) {
            warn!(
                file_type = %task.file_info.file_type,
                accepts = %manifest.accepts,
                rejects = %manifest.rejects,
                "File type would not be routed to this service"
            );
        }

        let params = resolve_submission_params(
            &manifest,
            &task.descriptor.service_config,
            &options.submission_overrides,
        )?;

        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| default_output_dir(&options.input_dir, &task.descriptor.filename, &manifest.name));
        check_output_dir(&output_dir, &options.input_dir)?;

        let context = ServiceContext::new(manifest.clone(), self.runtime.clone());
        let service = self.registry.instantiate(&options.service_path, &context)?;

        let scratch = std::env::temp_dir().join(format!("al_service_{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&scratch).await?;

        let outcome = self
            .process(service, &manifest, task, params, &scratch, &output_dir, options.debug)
            .await;

        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            debug!(path = %scratch.display(), error = %e, "Could not remove working directory");
        }

        outcome.map(|descriptor| {
            let elapsed = started.elapsed();
            info!(
                output = %output_dir.display(),
                score = descriptor.result.score,
                duration = %format_duration(elapsed.as_millis() as u64),
                "Successfully completed task"
            );
            RunOutcome { output_dir, descriptor, elapsed }
        })
    }

    /// Un-CaRT the target, then start, execute and stop the service. Start
    /// and execute each get the manifest timeout.
    #[allow(clippy::too_many_arguments)]
    async fn process(
        &self,
        service: Box<dyn AnalysisService>,
        manifest: &ServiceManifest,
        task: LoadedTask,
        params: std::collections::BTreeMap<String, serde_json::Value>,
        scratch: &Path,
        output_dir: &Path,
        debug: bool,
    ) -> Result<ResultDescriptor, ServiceKitError> {
        let LoadedTask { descriptor: task, file_path, file_info } = unpack_task(task, scratch).await?;
        let working_dir = scratch.join(WORKING_DIR_NAME);
        tokio::fs::create_dir_all(&working_dir).await?;

        let limit = Duration::from_secs(manifest.timeout);
        let rt = Handle::current();
        let (service, started) = run_bounded(limit, move || {
            let mut service = service;
            let started = rt.block_on(service.start());
            (service, started)
        })
        .await?
        .ok_or_else(|| {
            ServiceKitError::Timeout(format!(
                "Service '{}' did not start within {}s",
                manifest.name, manifest.timeout
            ))
        })?;
        started.map_err(as_service_error)?;
        let mut service: Arc<dyn AnalysisService> = Arc::from(service);

        info!(sid = %task.sid, "Starting task");
        let request = ServiceRequest::new(task, file_path, file_info, params, working_dir);

        let service_started = Utc::now();
        let rt = Handle::current();
        let running = Arc::clone(&service);
        let executed = run_bounded(limit, move || {
            let mut request = request;
            let executed = rt.block_on(running.execute(&mut request));
            (request, executed)
        })
        .await;
        let service_completed = Utc::now();

        match Arc::get_mut(&mut service) {
            Some(service) => {
                if let Err(e) = service.stop().await {
                    warn!(error = %e, "Service failed to stop cleanly");
                }
            }
            None => warn!("Service is still running, not stopping it"),
        }

        let (request, executed) = executed?.ok_or_else(|| {
            ServiceKitError::Timeout(format!(
                "Service '{}' did not complete within {}s",
                manifest.name, manifest.timeout
            ))
        })?;
        executed.map_err(as_service_error)?;

        let produced = request.into_parts();
        let result = produced.result.unwrap_or_else(|| {
            warn!("Service did not set a result, reporting an empty one");
            ServiceResult::new()
        });
        let body = result.finalize(&manifest.heuristics)?;

        let created = Utc::now();
        let descriptor = ResultDescriptor {
            created,
            expiry_ts: produced.task.expiry_after(created)?,
            archive_ts: None,
            sha256: produced.file_info.sha256,
            file_type: produced.file_info.file_type,
            size: produced.file_info.size,
            drop_file: produced.drop_file,
            response: ResponseInfo {
                service_name: manifest.name.clone(),
                service_version: manifest.version.clone(),
                service_tool_version: service.tool_version().or_else(|| manifest.tool_version.clone()),
                service_context: produced.service_context,
                milestones: Milestones { service_started, service_completed },
                extracted: produced.extracted,
                supplementary: produced.supplementary,
            },
            result: body,
        };

        write_output(output_dir, &descriptor).await?;

        if debug {
            print_result(&manifest.name, &descriptor)?;
        }

        Ok(descriptor)
    }
}

/// Run `work` on the blocking pool so a service that never yields still
/// loses to the timer. `None` means the limit elapsed; the work is abandoned.
async fn run_bounded<T, F>(limit: Duration, work: F) -> Result<Option<T>, ServiceKitError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(value)) => Ok(Some(value)),
        Ok(Err(e)) => Err(ServiceKitError::Service(format!("Service panicked: {}", e))),
        Err(_) => Ok(None),
    }
}

/// Explicit path, then `SERVICE_MANIFEST_PATH`, then the input directory,
/// then the current directory.
pub fn locate_manifest(options: &RunOptions, runtime: &RuntimeEnv) -> Result<PathBuf, ServiceKitError> {
    if let Some(path) = options.manifest_path.as_ref().or(runtime.service_manifest_path.as_ref()) {
        return Ok(path.clone());
    }

    let candidates = [
        options.input_dir.join(MANIFEST_FILE_NAME),
        std::env::current_dir()?.join(MANIFEST_FILE_NAME),
    ];
    candidates
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| {
            ServiceKitError::Input(format!(
                "No {} found in {} or the current directory",
                MANIFEST_FILE_NAME,
                options.input_dir.display()
            ))
        })
}

fn as_service_error(error: ServiceKitError) -> ServiceKitError {
    match error {
        ServiceKitError::Service(_) | ServiceKitError::Timeout(_) => error,
        other => ServiceKitError::Service(other.to_string()),
    }
}

fn print_result(service_name: &str, descriptor: &ResultDescriptor) -> Result<(), ServiceKitError> {
    let header = format!("{:-^60}", format!("{}-RESULT", service_name.to_uppercase()));
    println!("{}", style(header).cyan().bold());
    println!("{}", truncate_output(&serde_json::to_string_pretty(&descriptor.result)?));
    println!(
        "{} {}  {} {}  {} {}",
        style("score:").bold(),
        descriptor.result.score,
        style("extracted:").bold(),
        descriptor.response.extracted.len(),
        style("supplementary:").bold(),
        descriptor.response.supplementary.len()
    );
    Ok(())
}
