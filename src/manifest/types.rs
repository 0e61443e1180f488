use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Declarative description of a service, as read from `service_manifest.yml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_accepts")]
    pub accepts: String,
    #[serde(default = "default_rejects")]
    pub rejects: String,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "default_true")]
    pub file_required: bool,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub disable_cache: bool,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub uses_tags: bool,
    #[serde(default)]
    pub uses_metadata: bool,
    #[serde(default)]
    pub uses_temp_submission_data: bool,
    #[serde(default)]
    pub licence_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    /// Service-specific settings. Values are opaque to this crate.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    #[serde(default)]
    pub submission_params: Vec<SubmissionParam>,
    #[serde(default)]
    pub heuristics: Vec<HeuristicDefinition>,
    pub docker_config: DockerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_config: Option<UpdateConfig>,
}

fn default_accepts() -> String {
    ".*".to_string()
}

fn default_rejects() -> String {
    "empty|metadata/.*".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    60
}

impl ServiceManifest {
    pub fn heuristic(&self, heur_id: u32) -> Option<&HeuristicDefinition> {
        self.heuristics.iter().find(|h| h.heur_id == heur_id)
    }

    pub fn submission_param(&self, name: &str) -> Option<&SubmissionParam> {
        self.submission_params.iter().find(|p| p.name == name)
    }

    /// Submission parameters as the service sees them before any override.
    pub fn default_submission_values(&self) -> BTreeMap<String, Value> {
        self.submission_params
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }
}

/// Point in the analysis pipeline at which the service runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Filter,
    Extract,
    #[default]
    Core,
    Secondary,
    Post,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filter => "FILTER",
            Self::Extract => "EXTRACT",
            Self::Core => "CORE",
            Self::Secondary => "SECONDARY",
            Self::Post => "POST",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Category {
    Antivirus,
    #[serde(rename = "Dynamic Analysis")]
    DynamicAnalysis,
    External,
    Extraction,
    Filtering,
    #[serde(rename = "Internet Connected")]
    InternetConnected,
    Networking,
    #[default]
    #[serde(rename = "Static Analysis")]
    StaticAnalysis,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Antivirus => "Antivirus",
            Self::DynamicAnalysis => "Dynamic Analysis",
            Self::External => "External",
            Self::Extraction => "Extraction",
            Self::Filtering => "Filtering",
            Self::InternetConnected => "Internet Connected",
            Self::Networking => "Networking",
            Self::StaticAnalysis => "Static Analysis",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-adjustable input to the service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubmissionParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub default: Value,
    pub value: Value,
    /// Allowed choices when `type` is `list`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<Vec<String>>,
    #[serde(default)]
    pub hide: bool,
}

impl SubmissionParam {
    /// Whether `candidate` is an acceptable value for this parameter.
    pub fn accepts(&self, candidate: &Value) -> bool {
        match self.param_type {
            ParamType::Bool => candidate.is_boolean(),
            ParamType::Int => candidate.is_i64() || candidate.is_u64(),
            ParamType::Str => candidate.is_string(),
            ParamType::List => match (candidate.as_str(), &self.list) {
                (Some(choice), Some(choices)) => choices.iter().any(|c| c == choice),
                _ => false,
            },
        }
    }

    /// Convert a raw command-line string into a value of the declared type.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        let value = match self.param_type {
            ParamType::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Value::Bool(true),
                "false" | "0" | "no" => Value::Bool(false),
                _ => return None,
            },
            ParamType::Int => Value::from(raw.trim().parse::<i64>().ok()?),
            ParamType::Str | ParamType::List => Value::String(raw.to_string()),
        };
        self.accepts(&value).then_some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Int,
    Str,
    List,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "str",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, scored rule the service may trigger.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HeuristicDefinition {
    pub heur_id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_filetype")]
    pub filetype: String,
    pub score: i32,
    /// Accepts a single id or a list in the manifest; always a list once parsed.
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub attack_id: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub signature_score_map: BTreeMap<String, i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<i32>,
}

fn default_filetype() -> String {
    "*".to_string()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(id)) if id.is_empty() => Vec::new(),
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DockerConfig {
    pub image: String,
    #[serde(default = "default_cpu_cores")]
    pub cpu_cores: f64,
    #[serde(default = "default_ram_mb")]
    pub ram_mb: u32,
    #[serde(default = "default_ram_mb_min")]
    pub ram_mb_min: u32,
    #[serde(default)]
    pub allow_internet_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<EnvironmentVariable>,
}

fn default_cpu_cores() -> f64 {
    1.0
}

fn default_ram_mb() -> u32 {
    512
}

fn default_ram_mb_min() -> u32 {
    256
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnvironmentVariable {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpdateConfig {
    pub method: UpdateMethod,
    #[serde(default)]
    pub sources: Vec<UpdateSource>,
    pub update_interval_seconds: u64,
    #[serde(default)]
    pub generates_signatures: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_options: Option<DockerConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    Run,
    Build,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpdateSource {
    pub uri: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_deserialize() {
        let parsed: Stage = serde_json::from_str("\"SECONDARY\"").unwrap();
        assert_eq!(parsed, Stage::Secondary);
    }

    #[test]
    fn test_stage_rejects_lowercase() {
        assert!(serde_json::from_str::<Stage>("\"core\"").is_err());
    }

    #[test]
    fn test_stage_default_is_core() {
        assert_eq!(Stage::default(), Stage::Core);
        assert_eq!(Stage::default().to_string(), "CORE");
    }

    #[test]
    fn test_category_with_space_roundtrip() {
        let json = serde_json::to_string(&Category::DynamicAnalysis).unwrap();
        assert_eq!(json, "\"Dynamic Analysis\"");
        let parsed: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Category::DynamicAnalysis);
    }

    #[test]
    fn test_attack_id_single_string_becomes_list() {
        let heur: HeuristicDefinition = serde_yaml::from_str(
            "heur_id: 1\nname: Packed\nscore: 100\nattack_id: T1027",
        )
        .unwrap();
        assert_eq!(heur.attack_id, vec!["T1027".to_string()]);
        assert_eq!(heur.filetype, "*");
    }

    #[test]
    fn test_attack_id_list_kept() {
        let heur: HeuristicDefinition = serde_yaml::from_str(
            "heur_id: 2\nname: Dropper\nscore: 10\nattack_id: [T1105, T1204]",
        )
        .unwrap();
        assert_eq!(heur.attack_id.len(), 2);
    }

    #[test]
    fn test_attack_id_missing_is_empty() {
        let heur: HeuristicDefinition =
            serde_yaml::from_str("heur_id: 3\nname: Plain\nscore: 0").unwrap();
        assert!(heur.attack_id.is_empty());
    }

    fn list_param() -> SubmissionParam {
        SubmissionParam {
            name: "mode".into(),
            param_type: ParamType::List,
            default: json!("fast"),
            value: json!("fast"),
            list: Some(vec!["fast".into(), "deep".into()]),
            hide: false,
        }
    }

    #[test]
    fn test_list_param_accepts_only_choices() {
        let param = list_param();
        assert!(param.accepts(&json!("deep")));
        assert!(!param.accepts(&json!("slow")));
        assert!(!param.accepts(&json!(1)));
    }

    #[test]
    fn test_coerce_bool_and_int() {
        let flag = SubmissionParam {
            name: "extract".into(),
            param_type: ParamType::Bool,
            default: json!(false),
            value: json!(false),
            list: None,
            hide: false,
        };
        assert_eq!(flag.coerce("true"), Some(json!(true)));
        assert_eq!(flag.coerce("maybe"), None);

        let depth = SubmissionParam { param_type: ParamType::Int, default: json!(1), value: json!(1), ..flag };
        assert_eq!(depth.coerce(" 5 "), Some(json!(5)));
        assert_eq!(depth.coerce("five"), None);
    }

    #[test]
    fn test_coerce_list_rejects_unknown_choice() {
        assert_eq!(list_param().coerce("deep"), Some(json!("deep")));
        assert_eq!(list_param().coerce("slow"), None);
    }

    #[test]
    fn test_update_method_lowercase() {
        let parsed: UpdateMethod = serde_json::from_str("\"build\"").unwrap();
        assert_eq!(parsed, UpdateMethod::Build);
    }
}
