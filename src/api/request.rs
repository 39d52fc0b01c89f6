//! Request bodies sent by the streaming client

use serde::{Deserialize, Serialize};

/// Parameters for streaming exercise generation from source text.
///
/// Unset optional fields are still sent: `title` as `null`, `keyPoints` as
/// `[]` and `analysis` as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFromTextParams {
    pub content: String,
    pub title: Option<String>,
    pub question_type: String,
    pub difficulty: String,
    pub count: u32,
    /// Key points from the analysis step
    #[serde(default)]
    pub key_points: Vec<String>,
    /// Analysis summary or the user's stated intent
    #[serde(default)]
    pub analysis: String,
}

impl GenerateFromTextParams {
    pub fn new(
        content: impl Into<String>,
        question_type: impl Into<String>,
        difficulty: impl Into<String>,
        count: u32,
    ) -> Self {
        Self {
            content: content.into(),
            title: None,
            question_type: question_type.into(),
            difficulty: difficulty.into(),
            count,
            key_points: Vec::new(),
            analysis: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_key_points(mut self, key_points: Vec<String>) -> Self {
        self.key_points = key_points;
        self
    }

    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.analysis = analysis.into();
        self
    }
}

/// Parameters for the pre-generation analysis call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeParams {
    pub content: String,
    pub question_type: String,
    pub difficulty: String,
    pub count: u32,
}

impl AnalyzeParams {
    pub fn new(
        content: impl Into<String>,
        question_type: impl Into<String>,
        difficulty: impl Into<String>,
        count: u32,
    ) -> Self {
        Self {
            content: content.into(),
            question_type: question_type.into(),
            difficulty: difficulty.into(),
            count,
        }
    }

    /// Carry the same settings into a generation request
    pub fn into_generate(self) -> GenerateFromTextParams {
        GenerateFromTextParams::new(self.content, self.question_type, self.difficulty, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_fields_are_sent_empty() {
        let params = GenerateFromTextParams::new("text", "single_choice", "easy", 3);
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({
                "content": "text",
                "title": null,
                "questionType": "single_choice",
                "difficulty": "easy",
                "count": 3,
                "keyPoints": [],
                "analysis": ""
            })
        );
    }

    #[test]
    fn test_builder_fields() {
        let params = AnalyzeParams::new("text", "fill_blank", "hard", 5)
            .into_generate()
            .with_title("Week 3")
            .with_key_points(vec!["recursion".into()])
            .with_analysis("focus on base cases");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["title"], "Week 3");
        assert_eq!(value["questionType"], "fill_blank");
        assert_eq!(value["keyPoints"], json!(["recursion"]));
        assert_eq!(value["analysis"], "focus on base cases");
    }
}
