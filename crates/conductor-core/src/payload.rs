use serde::{Deserialize, Deserializer, Serialize};

/// The input of a single task submitted to an agent.
///
/// `task` is the only required field. Image references and the evaluation
/// hint are passed through to the agent capability untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Task text handed to the agent.
    pub task: String,
    /// A single image reference (path or URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    /// Multiple image references. `null` reads as none.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub imgs: Vec<String>,
    /// Optional expected answer, used by evaluation harnesses.
    #[serde(
        default,
        alias = "correctAnswer",
        skip_serializing_if = "Option::is_none"
    )]
    pub correct_answer: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl TaskPayload {
    /// Creates a payload carrying only task text.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            img: None,
            imgs: Vec::new(),
            correct_answer: None,
        }
    }

    /// Attaches a single image reference.
    pub fn with_img(mut self, img: impl Into<String>) -> Self {
        self.img = Some(img.into());
        self
    }

    /// Attaches several image references.
    pub fn with_imgs(mut self, imgs: Vec<String>) -> Self {
        self.imgs = imgs;
        self
    }

    /// Attaches an expected-answer hint.
    pub fn with_correct_answer(mut self, answer: impl Into<String>) -> Self {
        self.correct_answer = Some(answer.into());
        self
    }

    /// All image references, the single `img` first.
    pub fn images(&self) -> Vec<&str> {
        self.img
            .iter()
            .chain(self.imgs.iter())
            .map(String::as_str)
            .collect()
    }
}
