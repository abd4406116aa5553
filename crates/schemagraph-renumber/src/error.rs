use schemagraph_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenumberError>;

#[derive(Debug, Error)]
pub enum RenumberError {
    /// Two different records would end up with the same canonical id.
    #[error("duplicated new @id `{new}` (from `{old}`)")]
    DuplicateId { old: String, new: String },

    /// A nested record kept its old id, so the rewrite cannot be told apart.
    #[error("renumbering left `{0}` unchanged")]
    UnchangedId(String),

    #[error("invalid id pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to render document: {0}")]
    Render(#[from] serde_json::Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}
