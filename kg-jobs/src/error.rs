use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobError>;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(String),

    #[error("job {job_id} is {status}, expected {expected}")]
    InvalidTransition {
        job_id: String,
        status: String,
        expected: String,
    },

    #[error(transparent)]
    Content(#[from] kg_content::ContentError),

    #[error(transparent)]
    Ingest(#[from] kg_ingest::IngestError),

    #[error(transparent)]
    Graph(#[from] kg_graph::GraphError),
}
