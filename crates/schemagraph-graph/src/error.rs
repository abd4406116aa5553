use schemagraph_model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Model(#[from] ModelError),

    /// A mutation or query named an id with no matching record.
    #[error("unknown {kind} `{id}`")]
    UnknownReference { kind: &'static str, id: String },

    /// A query or edit arrived before any document was loaded.
    #[error("no schema document is loaded")]
    EmptyGraphState,
}

impl GraphError {
    pub fn unknown(kind: &'static str, id: impl Into<String>) -> Self {
        Self::UnknownReference {
            kind,
            id: id.into(),
        }
    }
}
