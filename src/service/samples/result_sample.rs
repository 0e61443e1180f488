use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use crate::errors::ServiceKitError;
use crate::result::{BodyFormat, Heuristic, ResultSection, ServiceResult};
use crate::service::{AnalysisService, ServiceContext, ServiceRequest};
use tracing::debug;

const SAMPLE_HOSTS: [(&str, &str); 2] = [
    ("malware.example.com", "203.0.113.10"),
    ("c2.example.net", "198.51.100.7"),
];
const MEMORY_DUMP_BYTES: usize = 256;

/// Produces one of every kind of result section so a report renderer can be
/// checked against known output. Output depends only on the input file.
#[derive(Debug)]
pub struct ResultSample {
    tool_version: Option<String>,
}

impl ResultSample {
    pub fn new(context: &ServiceContext) -> Self {
        Self {
            tool_version: context.manifest.tool_version.clone(),
        }
    }

    fn text_section() -> Result<ResultSection, ServiceKitError> {
        let mut section = ResultSection::new("Example of a default section");
        section.add_line("You can add lines to your section one at a time.");
        section.add_lines(&["Or several at once", "from a list of strings."]);
        section.add_tag("attribution.implant", "ResultSample");

        let mut heuristic = Heuristic::with_signature(3, "sig_one");
        for attack_id in ["S0096", "T1005", "G0032"] {
            heuristic.add_attack_id(attack_id);
        }
        heuristic.add_signature_id("sig_two", Some(20), 2);
        heuristic.add_signature_id("sig_two", Some(20), 3);
        heuristic.add_signature_id("sig_three", None, 1);
        heuristic.add_signature_id("sig_three", None, 1);
        heuristic.add_signature_id("sig_four", Some(0), 1);
        section.set_heuristic(heuristic)?;

        section.add_subsection(ResultSection::new(
            "Example of sub-section without a body added later in processing",
        ));
        Ok(section)
    }

    fn url_section() -> Result<ResultSection, ServiceKitError> {
        let (first_host, _) = SAMPLE_HOSTS[0];
        let mut section = ResultSection::new("Example of a simple url section");
        section.set_body(
            serde_json::to_string(&json!({"name": "Sample landing page", "url": format!("https://{}/", first_host)}))?,
            BodyFormat::Url,
        );
        section.add_tag("network.static.domain", first_host);

        let mut heuristic = Heuristic::new(4);
        heuristic.increment_frequency(SAMPLE_HOSTS.len() as u32 - 1);
        section.set_heuristic(heuristic)?;

        for (host, ip) in SAMPLE_HOSTS {
            let mut host_section = ResultSection::new(format!("Host: {}", host));
            host_section.add_tag("network.static.domain", host);
            let mut ip_section = ResultSection::new(format!("{} resolves to {}", host, ip));
            ip_section.add_tag("network.static.ip", ip);
            host_section.add_subsection(ip_section);
            section.add_subsection(host_section);
        }
        Ok(section)
    }

    fn memory_dump_section(data: &[u8]) -> ResultSection {
        let mut section = ResultSection::new("Example of a memory dump section");
        section.set_body(hex_dump(&data[..data.len().min(MEMORY_DUMP_BYTES)]), BodyFormat::MemoryDump);
        section
    }

    fn key_value_section(request: &ServiceRequest) -> Result<ResultSection, ServiceKitError> {
        let items = BTreeMap::from([
            ("file_name".to_string(), json!(request.file_name())),
            ("file_type".to_string(), json!(request.file_type())),
            ("sha256".to_string(), json!(request.sha256())),
            ("size".to_string(), json!(request.file_size())),
            ("deep_scan".to_string(), json!(request.deep_scan())),
        ]);
        let mut section = ResultSection::new("Example of a KEY_VALUE section");
        section.set_key_values(&items)?;
        Ok(section)
    }

    fn json_section(request: &ServiceRequest) -> Result<ResultSection, ServiceKitError> {
        let mut section = ResultSection::new("Example of a JSON section");
        section.set_json(&json!({ "sid": request.sid(), "params": request.params() }))?;
        Ok(section)
    }

    async fn write_files(&self, request: &mut ServiceRequest) -> Result<(), ServiceKitError> {
        let workdir = request.working_directory().to_path_buf();

        let text_path = workdir.join("file.txt");
        let content = format!("Extracted by ResultSample from {}\n", request.sha256());
        tokio::fs::write(&text_path, content).await?;
        request.add_extracted(&text_path, "file.txt", "Extracted by some magic!").await?;

        // Empty output is dropped by the request.
        let empty_path = workdir.join("empty.txt");
        tokio::fs::write(&empty_path, b"").await?;
        request.add_extracted(&empty_path, "empty.txt", "Extracted empty resulting file").await?;

        let urls: Vec<Value> = SAMPLE_HOSTS
            .iter()
            .map(|(host, ip)| json!({"url": format!("https://{}/", host), "ip": ip}))
            .collect();
        let urls_path = workdir.join("urls.json");
        tokio::fs::write(&urls_path, serde_json::to_vec_pretty(&urls)?).await?;
        request.add_supplementary(&urls_path, "urls.json", "These are urls as a JSON file").await?;
        Ok(())
    }
}

#[async_trait]
impl AnalysisService for ResultSample {
    async fn execute(&self, request: &mut ServiceRequest) -> Result<(), ServiceKitError> {
        let data = request.read_file().await?;
        debug!(size = data.len(), "Generating sample result");

        let mut result = ServiceResult::new();
        result.add_section(Self::text_section()?);
        result.add_section(Self::url_section()?);

        // Untitled sections never reach the report, nor do their children.
        let mut invalid = ResultSection::new("");
        invalid.add_subsection(ResultSection::new("I won't make it to the report because my parent is invalid"));
        result.add_section(invalid);

        result.add_section(Self::memory_dump_section(&data));
        result.add_section(Self::key_value_section(request)?);
        result.add_section(Self::json_section(request)?);

        let mut collapse = ResultSection::new("Example of auto-collapse section");
        collapse.set_heuristic(Heuristic::new(2))?;
        collapse.add_line("This section is collapsed when rendered.");
        collapse.set_auto_collapse(true);
        result.add_section(collapse);

        let extract = request
            .get_param("extract_files")
            .ok()
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if extract {
            self.write_files(request).await?;
        }

        request.set_service_context("ResultSample run");
        request.set_result(result);
        Ok(())
    }

    fn tool_version(&self) -> Option<String> {
        self.tool_version.clone()
    }
}

fn hex_dump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
            let ascii: String = chunk
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            format!("{:08x}: {:<47}  {}", row * 16, hex.join(" "), ascii)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
