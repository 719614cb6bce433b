use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Embed(#[from] kg_embed::EmbedError),

    #[error(transparent)]
    Vector(#[from] kg_vector::VectorError),
}
