use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use crate::manifest::HeuristicDefinition;
use super::descriptor::ResolvedHeuristic;
use tracing::warn;

/// ATT&CK technique, software and group identifiers.
static ATTACK_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(T\d{4}(\.\d{3})?|S\d{4}|G\d{4})$").expect("valid attack id pattern")
});

/// A heuristic hit raised by a service. Only the id is known to the service;
/// name and base score come from the manifest when the result is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heuristic {
    heur_id: u32,
    attack_ids: Vec<String>,
    signatures: BTreeMap<String, u32>,
    frequency: u32,
    score_map: BTreeMap<String, i32>,
}

impl Heuristic {
    pub fn new(heur_id: u32) -> Self {
        Self {
            heur_id,
            attack_ids: Vec::new(),
            signatures: BTreeMap::new(),
            frequency: 1,
            score_map: BTreeMap::new(),
        }
    }

    /// A hit attributed to a named signature. Signatures drive the score, so
    /// the signature-less frequency starts at zero.
    pub fn with_signature(heur_id: u32, signature: &str) -> Self {
        let mut heuristic = Self::new(heur_id);
        heuristic.frequency = 0;
        heuristic.signatures.insert(signature.to_string(), 1);
        heuristic
    }

    pub fn heur_id(&self) -> u32 {
        self.heur_id
    }

    pub fn attack_ids(&self) -> &[String] {
        &self.attack_ids
    }

    pub fn signatures(&self) -> &BTreeMap<String, u32> {
        &self.signatures
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn add_attack_id(&mut self, attack_id: &str) {
        if !ATTACK_ID_PATTERN.is_match(attack_id) {
            warn!(heur_id = self.heur_id, attack_id, "Invalid attack_id, ignoring it");
            return;
        }
        if !self.attack_ids.iter().any(|a| a == attack_id) {
            self.attack_ids.push(attack_id.to_string());
        }
    }

    /// Record `frequency` more hits of `signature`. A score given here is
    /// used unless the manifest maps the signature itself.
    pub fn add_signature_id(&mut self, signature: &str, score: Option<i32>, frequency: u32) {
        let count = self.signatures.entry(signature.to_string()).or_insert(0);
        *count = count.saturating_add(frequency);
        if let Some(score) = score {
            self.score_map.insert(signature.to_string(), score);
        }
    }

    pub fn increment_frequency(&mut self, frequency: u32) {
        self.frequency = self.frequency.saturating_add(frequency);
    }

    /// Score against the manifest definition. Per signature, the score is
    /// taken from the manifest `signature_score_map`, then the service-given
    /// score, then the heuristic's base score. Saturates instead of
    /// overflowing; a `max_score` of zero means no cap.
    pub fn score(&self, definition: &HeuristicDefinition) -> i32 {
        let score = if self.signatures.is_empty() {
            definition.score.saturating_mul(as_multiplier(self.frequency.max(1)))
        } else {
            self.signatures
                .iter()
                .map(|(name, freq)| {
                    let sig_score = definition
                        .signature_score_map
                        .get(name)
                        .or_else(|| self.score_map.get(name))
                        .copied()
                        .unwrap_or(definition.score);
                    sig_score.saturating_mul(as_multiplier(*freq))
                })
                .fold(0i32, i32::saturating_add)
        };

        match definition.max_score {
            Some(max) if max != 0 => score.min(max),
            _ => score,
        }
    }

    pub fn resolve(&self, definition: &HeuristicDefinition) -> ResolvedHeuristic {
        let attack_ids = if self.attack_ids.is_empty() {
            definition.attack_id.clone()
        } else {
            self.attack_ids.clone()
        };

        ResolvedHeuristic {
            heur_id: self.heur_id,
            name: definition.name.clone(),
            score: self.score(definition),
            attack_ids,
            signatures: self.signatures.clone(),
            frequency: self.frequency,
            score_map: self.score_map.clone(),
        }
    }
}

fn as_multiplier(frequency: u32) -> i32 {
    i32::try_from(frequency).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(score: i32) -> HeuristicDefinition {
        HeuristicDefinition {
            heur_id: 3,
            name: "Sample heuristic".into(),
            description: String::new(),
            filetype: "*".into(),
            score,
            attack_id: vec!["T1005".into()],
            signature_score_map: BTreeMap::from([
                ("sig_three".to_string(), 30),
                ("sig_four".to_string(), 40),
            ]),
            max_score: None,
        }
    }

    #[test]
    fn test_plain_hit_uses_base_score() {
        let heur = Heuristic::new(3);
        assert_eq!(heur.score(&definition(10)), 10);
    }

    #[test]
    fn test_frequency_multiplies_base_score() {
        let mut heur = Heuristic::new(3);
        heur.increment_frequency(2);
        assert_eq!(heur.frequency(), 3);
        assert_eq!(heur.score(&definition(10)), 30);
    }

    #[test]
    fn test_signature_score_precedence() {
        // sig_one: base score, sig_two: service score, sig_three/four: manifest map wins
        let mut heur = Heuristic::with_signature(3, "sig_one");
        heur.add_signature_id("sig_two", Some(20), 2);
        heur.add_signature_id("sig_two", Some(20), 3);
        heur.add_signature_id("sig_three", None, 1);
        heur.add_signature_id("sig_three", None, 1);
        heur.add_signature_id("sig_four", Some(0), 1);

        assert_eq!(heur.signatures()["sig_two"], 5);
        assert_eq!(heur.signatures()["sig_three"], 2);
        assert_eq!(heur.score(&definition(10)), 10 + 5 * 20 + 2 * 30 + 40);
    }

    #[test]
    fn test_max_score_caps() {
        let mut def = definition(500);
        def.max_score = Some(750);
        let mut heur = Heuristic::new(3);
        heur.increment_frequency(4);
        assert_eq!(heur.score(&def), 750);
    }

    #[test]
    fn test_zero_max_score_means_uncapped() {
        let mut def = definition(500);
        def.max_score = Some(0);
        let mut heur = Heuristic::new(3);
        heur.increment_frequency(4);
        assert_eq!(heur.score(&def), 2500);
    }

    #[test]
    fn test_huge_frequency_saturates() {
        let mut heur = Heuristic::new(3);
        heur.increment_frequency(u32::MAX);
        assert_eq!(heur.frequency(), u32::MAX);
        assert_eq!(heur.score(&definition(1000)), i32::MAX);

        let mut def = definition(1000);
        def.max_score = Some(750);
        assert_eq!(heur.score(&def), 750);

        let mut negative = Heuristic::new(3);
        negative.increment_frequency(u32::MAX);
        assert_eq!(negative.score(&definition(-1000)), i32::MIN);
    }

    #[test]
    fn test_signature_scores_saturate() {
        let mut heur = Heuristic::with_signature(3, "sig_three");
        heur.add_signature_id("sig_three", None, u32::MAX);
        heur.add_signature_id("sig_four", None, u32::MAX);
        assert_eq!(heur.signatures()["sig_three"], u32::MAX);
        assert_eq!(heur.score(&definition(10)), i32::MAX);
    }

    #[test]
    fn test_attack_ids_validated_and_deduplicated() {
        let mut heur = Heuristic::new(3);
        heur.add_attack_id("T1066");
        heur.add_attack_id("T1066");
        heur.add_attack_id("T1055.012");
        heur.add_attack_id("not-an-id");
        assert_eq!(heur.attack_ids(), ["T1066".to_string(), "T1055.012".to_string()]);
    }

    #[test]
    fn test_resolve_falls_back_to_manifest_attack_ids() {
        let resolved = Heuristic::new(3).resolve(&definition(10));
        assert_eq!(resolved.attack_ids, vec!["T1005".to_string()]);
        assert_eq!(resolved.name, "Sample heuristic");
        assert_eq!(resolved.score, 10);
    }

    #[test]
    fn test_resolve_prefers_service_attack_ids() {
        let mut heur = Heuristic::new(3);
        heur.add_attack_id("S0001");
        assert_eq!(heur.resolve(&definition(10)).attack_ids, vec!["S0001".to_string()]);
    }
}
