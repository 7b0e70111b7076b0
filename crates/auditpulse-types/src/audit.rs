//! Audit job resources.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle of an audit job. Only the backend moves it forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AuditStatus {
    /// Completed and failed audits never change again; nothing should poll them.
    pub fn is_terminal(self) -> bool {
        matches!(self, AuditStatus::Completed | AuditStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Pending => "pending",
            AuditStatus::Running => "running",
            AuditStatus::Completed => "completed",
            AuditStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit summary as listed by `/audits/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    pub status: AuditStatus,
    pub output_language: String,
    #[serde(
        default,
        deserialize_with = "score",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_score: Option<u8>,
    #[serde(
        default,
        deserialize_with = "score",
        skip_serializing_if = "Option::is_none"
    )]
    pub technical_score: Option<u8>,
    #[serde(
        default,
        deserialize_with = "score",
        skip_serializing_if = "Option::is_none"
    )]
    pub on_page_score: Option<u8>,
    #[serde(
        default,
        deserialize_with = "score",
        skip_serializing_if = "Option::is_none"
    )]
    pub performance_score: Option<u8>,
    #[serde(
        default,
        deserialize_with = "score",
        skip_serializing_if = "Option::is_none"
    )]
    pub mobile_score: Option<u8>,
    #[serde(
        default,
        deserialize_with = "score",
        skip_serializing_if = "Option::is_none"
    )]
    pub security_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Audit {
    /// Heading shown for an audit: the client name when given, else the URL.
    pub fn title(&self) -> &str {
        self.client_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.url)
    }

    pub fn is_in_progress(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Section scores in display order, keyed by their string-table label.
    ///
    /// Empty unless the audit completed with an overall score.
    pub fn score_summary(&self) -> Vec<(&'static str, u8)> {
        let Some(overall) = self.completed_score() else {
            return Vec::new();
        };
        let sections = [
            ("audit.sections.technical", self.technical_score),
            ("audit.sections.on_page", self.on_page_score),
            ("audit.sections.performance", self.performance_score),
            ("audit.sections.mobile", self.mobile_score),
            ("audit.sections.security", self.security_score),
        ];
        std::iter::once(("audit.score", overall))
            .chain(
                sections
                    .into_iter()
                    .filter_map(|(label, score)| score.map(|s| (label, s))),
            )
            .collect()
    }

    /// Overall score, only meaningful once the audit completed.
    pub fn completed_score(&self) -> Option<u8> {
        match self.status {
            AuditStatus::Completed => self.overall_score,
            _ => None,
        }
    }
}

/// Full audit as returned by `/audits/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDetail {
    #[serde(flatten)]
    pub audit: Audit,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_results: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_recommendations: Option<AiRecommendations>,
}

impl std::ops::Deref for AuditDetail {
    type Target = Audit;

    fn deref(&self) -> &Audit {
        &self.audit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::High => "high",
            Level::Medium => "medium",
            Level::Low => "low",
        }
    }
}

/// AI-generated guidance attached to a completed audit.
///
/// Every part is optional and decoded on its own: a part whose shape doesn't
/// match is dropped without failing the rest of the audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiRecommendations {
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub executive_summary: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub priority_recommendations: Option<Vec<PriorityRecommendation>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub quick_wins: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub keyword_table: Option<Vec<KeywordRow>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content_recommendations: Option<Vec<String>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub weekly_action_plan: Option<Vec<WeeklyAction>>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub long_term_strategy: Option<String>,
    #[serde(deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub section_narratives: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityRecommendation {
    pub title: String,
    pub description: String,
    pub impact: Level,
    pub effort: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_volume: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAction {
    pub week: u32,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Scores arrive as JSON numbers, integral or not; they are rounded into 0..=100.
fn score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 100.0) as u8))
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Body for `POST /audits/`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAuditData {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    pub output_language: String,
}

impl CreateAuditData {
    /// Blank optional fields are omitted rather than sent as empty strings.
    pub fn new(
        url: impl Into<String>,
        client_name: Option<String>,
        client_email: Option<String>,
        output_language: impl Into<String>,
    ) -> Self {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            url: url.into().trim().to_string(),
            client_name: non_blank(client_name),
            client_email: non_blank(client_email),
            output_language: output_language.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail_json(status: &str) -> String {
        format!(
            r#"{{
                "id": "a1",
                "url": "example.com",
                "status": "{status}",
                "output_language": "en",
                "overall_score": 87,
                "technical_score": 90,
                "mobile_score": 70,
                "created_at": "2025-03-01T10:00:00Z",
                "ai_recommendations": {{
                    "executive_summary": "Solid basics.",
                    "priority_recommendations": [
                        {{"title": "Compress images", "description": "Use WebP", "impact": "high", "effort": "low"}}
                    ],
                    "weekly_action_plan": [{{"week": 1, "tasks": ["Fix titles"]}}]
                }}
            }}"#
        )
    }

    #[test]
    fn test_status_terminality() {
        assert!(!AuditStatus::Pending.is_terminal());
        assert!(!AuditStatus::Running.is_terminal());
        assert!(AuditStatus::Completed.is_terminal());
        assert!(AuditStatus::Failed.is_terminal());
    }

    #[test]
    fn test_detail_flattens_audit_fields() {
        let detail: AuditDetail = serde_json::from_str(&detail_json("completed")).unwrap();
        assert_eq!(detail.id, "a1");
        assert_eq!(detail.status, AuditStatus::Completed);
        let ai = detail.ai_recommendations.as_ref().unwrap();
        assert_eq!(ai.executive_summary.as_deref(), Some("Solid basics."));
        assert!(ai.quick_wins.is_none());
        let recs = ai.priority_recommendations.as_ref().unwrap();
        assert_eq!(recs[0].impact, Level::High);
        assert_eq!(ai.weekly_action_plan.as_ref().unwrap()[0].tasks, vec!["Fix titles"]);
    }

    #[test]
    fn test_score_summary_only_for_completed() {
        let completed: AuditDetail = serde_json::from_str(&detail_json("completed")).unwrap();
        assert_eq!(
            completed.score_summary(),
            vec![
                ("audit.score", 87),
                ("audit.sections.technical", 90),
                ("audit.sections.mobile", 70),
            ]
        );

        let running: AuditDetail = serde_json::from_str(&detail_json("running")).unwrap();
        assert!(running.score_summary().is_empty());
        assert!(running.completed_score().is_none());
    }

    #[test]
    fn test_fractional_scores_are_rounded() {
        let json = r#"{
            "id": "a1",
            "url": "example.com",
            "status": "completed",
            "output_language": "en",
            "overall_score": 87.0,
            "technical_score": 72.6,
            "security_score": null,
            "created_at": "2025-03-01T10:00:00Z"
        }"#;
        let detail: AuditDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.completed_score(), Some(87));
        assert_eq!(detail.technical_score, Some(73));
        assert_eq!(detail.security_score, None);
    }

    #[test]
    fn test_mismatched_recommendation_parts_are_dropped() {
        let json = r#"{
            "id": "a1",
            "url": "example.com",
            "status": "completed",
            "output_language": "en",
            "overall_score": 87,
            "created_at": "2025-03-01T10:00:00Z",
            "ai_recommendations": {
                "executive_summary": "Solid basics.",
                "quick_wins": [{"title": "Add alt text"}],
                "priority_recommendations": [
                    {"title": "Compress images", "description": "Use WebP", "impact": "critical", "effort": "low"}
                ],
                "long_term_strategy": "Build topical authority."
            }
        }"#;
        let detail: AuditDetail = serde_json::from_str(json).unwrap();
        let ai = detail.ai_recommendations.as_ref().unwrap();
        assert_eq!(ai.executive_summary.as_deref(), Some("Solid basics."));
        assert!(ai.quick_wins.is_none());
        assert!(ai.priority_recommendations.is_none());
        assert_eq!(ai.long_term_strategy.as_deref(), Some("Build topical authority."));

        let odd = json.replace(
            r#""ai_recommendations": {"#,
            r#""raw_results": [1, 2], "ai_recommendations": "pending", "extra": {"#,
        );
        let detail: AuditDetail = serde_json::from_str(&odd).unwrap();
        assert!(detail.raw_results.is_none());
        assert!(detail.ai_recommendations.is_none());
        assert_eq!(detail.status, AuditStatus::Completed);
    }

    #[test]
    fn test_create_audit_omits_blank_optionals() {
        let data = CreateAuditData::new(" example.com ", Some(String::new()), None, "en");
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            serde_json::json!({"url": "example.com", "output_language": "en"})
        );
    }

    #[test]
    fn test_title_prefers_client_name() {
        let mut detail: AuditDetail = serde_json::from_str(&detail_json("pending")).unwrap();
        assert_eq!(detail.title(), "example.com");
        detail.audit.client_name = Some("Acme".to_string());
        assert_eq!(detail.title(), "Acme");
    }
}
