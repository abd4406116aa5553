use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// A record is missing a required key, or a value has the wrong shape.
    ///
    /// `context` names the record (`document`, `event Events/20001/...`) so the
    /// user knows where to look before re-uploading.
    #[error("malformed document ({context}): {message}")]
    MalformedDocument { context: String, message: String },
}

impl ModelError {
    pub fn malformed(context: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedDocument {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
