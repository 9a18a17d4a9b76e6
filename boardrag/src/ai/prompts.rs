//! Review prompt and design-summary query
//!
//! The review prompt takes retrieved rule text as `{context}` and the
//! board statistics from [`design_query`] as `{question}`.

use serde::{Deserialize, Serialize};

use crate::extract::BoardSummary;

pub const CONTEXT_VAR: &str = "context";
pub const QUESTION_VAR: &str = "question";

pub const REVIEW_PROMPT: &str = r#"
You are a senior hardware engineer. Answer strictly on the basis of the design rules below.

Design rules:
{context}

Design data:
{question}

Requirements:
- Answer only from the content above
- If unsure, answer "Cannot determine"
- List the problems clearly, one per line
"#;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PromptError {
    #[error("Template does not use declared variable {{{0}}}")]
    UnusedVariable(String),
    #[error("No value supplied for {{{0}}}")]
    MissingValue(String),
}

/// A template with `{name}` placeholders for a fixed set of variables.
///
/// Braces that do not enclose a declared variable are copied through.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: Vec<String>,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>, variables: &[&str]) -> Result<Self, PromptError> {
        let template = template.into();
        for var in variables {
            if !template.contains(&format!("{{{}}}", var)) {
                return Err(PromptError::UnusedVariable(var.to_string()));
            }
        }
        Ok(Self {
            template,
            variables: variables.iter().map(|v| v.to_string()).collect(),
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Substitute every placeholder in a single pass, so braces inside the
    /// supplied values are never expanded.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, PromptError> {
        for var in &self.variables {
            if !values.iter().any(|(k, _)| k == var) {
                return Err(PromptError::MissingValue(var.clone()));
            }
        }

        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let name = &after[..close];
                self.variables
                    .iter()
                    .any(|v| v == name)
                    .then(|| values.iter().find(|(k, _)| *k == name))
                    .flatten()
                    .map(|(_, v)| (*v, close))
            });
            match value {
                Some((v, close)) => {
                    out.push_str(v);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

pub fn review_prompt() -> PromptTemplate {
    PromptTemplate {
        template: REVIEW_PROMPT.to_string(),
        variables: vec![CONTEXT_VAR.to_string(), QUESTION_VAR.to_string()],
    }
}

/// Scalar statistics the review query is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignStats {
    /// 0 when the board has no traces.
    pub min_track_width_mm: f64,
    pub component_count: usize,
    pub track_count: usize,
    pub via_count: usize,
    pub net_count: usize,
}

impl DesignStats {
    pub fn from_summary(summary: &BoardSummary) -> Self {
        Self {
            min_track_width_mm: summary.min_track_width_mm().unwrap_or(0.0),
            component_count: summary.components.len(),
            track_count: summary.tracks.len(),
            via_count: summary.vias.len(),
            net_count: summary.nets.len(),
        }
    }
}

pub fn design_query(stats: &DesignStats) -> String {
    format!(
        r#"
Current PCB design summary:
- Minimum track width: {:.3} mm
- Component count: {}
- Track count: {}

Check against the company design rules:
1. Are the track widths compliant?
2. Is there a risk of missing decoupling capacitors?
3. Any other potential issues?

List the findings one by one and cite the relevant rule clauses.
"#,
        stats.min_track_width_mm, stats.component_count, stats.track_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ComponentRecord, TrackRecord};

    #[test]
    fn test_render_substitutes_once() {
        let prompt = review_prompt();
        let out = prompt
            .render(&[("context", "Rule {question} 4.1"), ("question", "Is 0.1 mm ok?")])
            .unwrap();
        assert!(out.contains("Rule {question} 4.1"));
        assert!(out.contains("Design data:\nIs 0.1 mm ok?"));
        assert!(!out.contains("{context}"));
    }

    #[test]
    fn test_unknown_braces_are_kept() {
        let t = PromptTemplate::new("json: {\"a\": 1} {x} {", &["x"]).unwrap();
        assert_eq!(t.render(&[("x", "y")]).unwrap(), "json: {\"a\": 1} y {");
    }

    #[test]
    fn test_template_errors() {
        assert_eq!(
            PromptTemplate::new("no vars", &["context"]).unwrap_err(),
            PromptError::UnusedVariable("context".into())
        );
        let t = PromptTemplate::new("{a}{b}", &["a", "b"]).unwrap();
        assert_eq!(
            t.render(&[("a", "1")]).unwrap_err(),
            PromptError::MissingValue("b".into())
        );
    }

    #[test]
    fn test_review_prompt_declares_both_variables() {
        let prompt = review_prompt();
        assert_eq!(prompt.variables(), ["context", "question"]);
        assert!(REVIEW_PROMPT.contains("{context}"));
        assert!(REVIEW_PROMPT.contains("{question}"));
    }

    #[test]
    fn test_stats_and_query() {
        let summary = BoardSummary {
            tracks: vec![
                TrackRecord { width_mm: 0.25, net: "GND".into() },
                TrackRecord { width_mm: 0.127, net: "SDA".into() },
            ],
            vias: vec![],
            components: vec![ComponentRecord {
                reference: "R1".into(),
                value: "10k".into(),
                x_mm: 0.0,
                y_mm: 0.0,
            }],
            nets: vec!["GND".into(), "SDA".into()],
        };
        let stats = DesignStats::from_summary(&summary);
        assert_eq!(stats.min_track_width_mm, 0.127);
        assert_eq!(stats.net_count, 2);

        let query = design_query(&stats);
        assert!(query.contains("Minimum track width: 0.127 mm"));
        assert!(query.contains("Component count: 1"));
        assert!(query.contains("Track count: 2"));
    }

    #[test]
    fn test_zero_tracks_gives_zero_width() {
        let stats = DesignStats::from_summary(&BoardSummary::default());
        assert_eq!(stats.min_track_width_mm, 0.0);
        assert!(design_query(&stats).contains("Minimum track width: 0.000 mm"));
    }
}
