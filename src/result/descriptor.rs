use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use super::section::BodyFormat;

/// Everything a single run produced, serialized as `result.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDescriptor {
    pub created: DateTime<Utc>,
    pub expiry_ts: DateTime<Utc>,
    pub archive_ts: Option<DateTime<Utc>>,
    pub sha256: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub drop_file: bool,
    pub response: ResponseInfo,
    pub result: ResultBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub service_name: String,
    pub service_version: String,
    pub service_tool_version: Option<String>,
    pub service_context: Option<String>,
    pub milestones: Milestones,
    pub extracted: Vec<FileRef>,
    pub supplementary: Vec<FileRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestones {
    pub service_started: DateTime<Utc>,
    pub service_completed: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBody {
    pub score: i32,
    pub sections: Vec<FlatSection>,
}

impl ResultBody {
    /// Ids of every heuristic raised, in section order.
    pub fn heuristic_ids(&self) -> Vec<u32> {
        self.sections
            .iter()
            .filter_map(|s| s.heuristic.as_ref().map(|h| h.heur_id))
            .collect()
    }
}

/// A section after finalization; nesting is expressed through `depth`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatSection {
    pub title_text: String,
    pub body: Option<String>,
    pub body_format: BodyFormat,
    pub depth: u32,
    pub heuristic: Option<ResolvedHeuristic>,
    pub tags: BTreeMap<String, Vec<String>>,
    pub auto_collapse: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedHeuristic {
    pub heur_id: u32,
    pub name: String,
    pub score: i32,
    pub attack_ids: Vec<String>,
    pub signatures: BTreeMap<String, u32>,
    pub frequency: u32,
    pub score_map: BTreeMap<String, i32>,
}

/// An extracted or supplementary file. The local path is only meaningful
/// while the run is in progress and is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    pub sha256: String,
    pub description: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub is_section_image: bool,
    pub allow_dynamic_recursion: bool,
    pub parent_relation: String,
}
