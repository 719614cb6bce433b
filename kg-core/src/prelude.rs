//! Common imports for the knowledge graph core types.

pub use crate::edges::{SemanticEdge, StructuralEdge};
pub use crate::error::{CoreError, ErrorKind, HasErrorKind, Result};
pub use crate::ids::{concept_id_from_label, new_instance_id, new_job_id, source_id};
pub use crate::types::{Concept, DocumentMeta, Instance, Source, SourceType, VocabType};
