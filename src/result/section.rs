use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use crate::errors::ServiceKitError;
use crate::manifest::HeuristicDefinition;
use super::descriptor::{FlatSection, ResultBody};
use super::heuristic::Heuristic;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BodyFormat {
    #[default]
    Text,
    MemoryDump,
    GraphData,
    Url,
    Json,
    KeyValue,
    OrderedKeyValue,
    Table,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSection {
    title_text: String,
    body: Option<String>,
    body_format: BodyFormat,
    heuristic: Option<Heuristic>,
    tags: BTreeMap<String, Vec<String>>,
    subsections: Vec<ResultSection>,
    auto_collapse: bool,
}

impl ResultSection {
    pub fn new(title_text: impl Into<String>) -> Self {
        Self {
            title_text: title_text.into(),
            body: None,
            body_format: BodyFormat::Text,
            heuristic: None,
            tags: BTreeMap::new(),
            subsections: Vec::new(),
            auto_collapse: false,
        }
    }

    pub fn title_text(&self) -> &str {
        &self.title_text
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn body_format(&self) -> BodyFormat {
        self.body_format
    }

    pub fn heuristic(&self) -> Option<&Heuristic> {
        self.heuristic.as_ref()
    }

    pub fn heuristic_mut(&mut self) -> Option<&mut Heuristic> {
        self.heuristic.as_mut()
    }

    pub fn tags(&self) -> &BTreeMap<String, Vec<String>> {
        &self.tags
    }

    pub fn subsections(&self) -> &[ResultSection] {
        &self.subsections
    }

    pub fn set_body(&mut self, body: impl Into<String>, body_format: BodyFormat) {
        self.body = Some(body.into());
        self.body_format = body_format;
    }

    pub fn set_json(&mut self, value: &Value) -> Result<(), ServiceKitError> {
        self.set_body(serde_json::to_string(value)?, BodyFormat::Json);
        Ok(())
    }

    pub fn set_key_values(&mut self, items: &BTreeMap<String, Value>) -> Result<(), ServiceKitError> {
        self.set_body(serde_json::to_string(items)?, BodyFormat::KeyValue);
        Ok(())
    }

    /// Append one line of text to the body.
    pub fn add_line(&mut self, text: &str) {
        match &mut self.body {
            Some(body) if !body.is_empty() => {
                body.push('\n');
                body.push_str(text);
            }
            _ => self.body = Some(text.to_string()),
        }
    }

    pub fn add_lines<S: AsRef<str>>(&mut self, lines: &[S]) {
        let segment = lines.iter().map(|l| l.as_ref()).collect::<Vec<_>>().join("\n");
        match &mut self.body {
            Some(body) => {
                body.push('\n');
                body.push_str(&segment);
            }
            None => self.body = Some(segment),
        }
    }

    /// Tag the section. Empty values are ignored and duplicates collapse.
    pub fn add_tag(&mut self, tag_type: &str, value: &str) {
        if tag_type.is_empty() || value.is_empty() {
            return;
        }
        let values = self.tags.entry(tag_type.to_string()).or_default();
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }

    /// Attach a heuristic. A section carries at most one.
    pub fn set_heuristic(&mut self, heuristic: Heuristic) -> Result<(), ServiceKitError> {
        if let Some(current) = &self.heuristic {
            return Err(ServiceKitError::Service(format!(
                "The service is trying to set the heuristic twice, this is not allowed. [Current: {}, New: {}]",
                current.heur_id(),
                heuristic.heur_id()
            )));
        }
        self.heuristic = Some(heuristic);
        Ok(())
    }

    pub fn clear_heuristic(&mut self) {
        self.heuristic = None;
    }

    pub fn add_subsection(&mut self, subsection: ResultSection) {
        self.subsections.push(subsection);
    }

    pub fn add_subsection_on_top(&mut self, subsection: ResultSection) {
        self.subsections.insert(0, subsection);
    }

    pub fn set_auto_collapse(&mut self, auto_collapse: bool) {
        self.auto_collapse = auto_collapse;
    }

    /// Flatten depth-first into `out`. Sections without a title are dropped
    /// together with their subsections.
    fn flatten_into(
        self,
        depth: u32,
        heuristics: &[HeuristicDefinition],
        out: &mut Vec<FlatSection>,
    ) -> Result<(), ServiceKitError> {
        if self.title_text.trim().is_empty() {
            error!(depth, "Failed to finalize section, title is empty");
            return Ok(());
        }

        let heuristic = match &self.heuristic {
            Some(heur) => {
                let definition = heuristics
                    .iter()
                    .find(|d| d.heur_id == heur.heur_id())
                    .ok_or_else(|| ServiceKitError::Service(format!(
                        "Invalid heuristic. A heuristic with ID: {}, must be added to the service manifest before using it.",
                        heur.heur_id()
                    )))?;
                Some(heur.resolve(definition))
            }
            None => None,
        };

        out.push(FlatSection {
            title_text: self.title_text,
            body: self.body.filter(|b| !b.is_empty()),
            body_format: self.body_format,
            depth,
            heuristic,
            tags: self.tags,
            auto_collapse: self.auto_collapse,
        });

        for subsection in self.subsections {
            subsection.flatten_into(depth + 1, heuristics, out)?;
        }
        Ok(())
    }
}

/// The sections a service builds while processing one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceResult {
    sections: Vec<ResultSection>,
}

impl ServiceResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[ResultSection] {
        &self.sections
    }

    pub fn add_section(&mut self, section: ResultSection) {
        self.sections.push(section);
    }

    pub fn add_section_on_top(&mut self, section: ResultSection) {
        self.sections.insert(0, section);
    }

    /// Flatten sections, resolve heuristics against the manifest and total
    /// the score. An id missing from the manifest fails the run.
    pub fn finalize(self, heuristics: &[HeuristicDefinition]) -> Result<ResultBody, ServiceKitError> {
        let mut sections = Vec::new();
        for section in self.sections {
            section.flatten_into(0, heuristics, &mut sections)?;
        }

        let score = sections
            .iter()
            .filter_map(|s| s.heuristic.as_ref())
            .map(|h| h.score)
            .fold(0i32, i32::saturating_add);

        Ok(ResultBody { score, sections })
    }
}
