//! Content Hash Dedup (C11): decide whether `(content_hash, ontology)` has
//! already been ingested, or is in flight, before a new job is created
//! (§4.10).

use kg_graph::InMemoryGraphStore;

use crate::model::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateSource {
    Graph,
    Jobs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateCheck {
    pub duplicate: bool,
    pub source: Option<DuplicateSource>,
}

const ACTIVE_FOR_DEDUP: [crate::model::JobStatus; 3] = [
    crate::model::JobStatus::AwaitingApproval,
    crate::model::JobStatus::Approved,
    crate::model::JobStatus::Processing,
];

/// §4.10 steps 1-3: graph first (already-ingested documents), then active
/// jobs (in-flight submissions for the same key). `pending` is
/// deliberately excluded — it hasn't been analyzed yet and is expected to
/// transition to `awaiting_approval` almost immediately; racing it here
/// would just be noise.
#[must_use]
pub fn check_duplicate<'a>(
    graph: &InMemoryGraphStore,
    active_jobs: impl Iterator<Item = &'a JobRecord>,
    content_hash: &str,
    ontology: &str,
) -> DuplicateCheck {
    if graph.find_document(content_hash, ontology).is_some() {
        return DuplicateCheck {
            duplicate: true,
            source: Some(DuplicateSource::Graph),
        };
    }

    let in_flight = active_jobs.filter(|j| j.content_hash == content_hash && j.ontology == ontology).any(|j| {
        ACTIVE_FOR_DEDUP.contains(&j.status)
    });
    if in_flight {
        return DuplicateCheck {
            duplicate: true,
            source: Some(DuplicateSource::Jobs),
        };
    }

    DuplicateCheck {
        duplicate: false,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobRecord, JobStatus};
    use chrono::Utc;
    use kg_core::types::DocumentMeta;

    fn job(content_hash: &str, ontology: &str, status: JobStatus) -> JobRecord {
        let mut j = JobRecord::new(
            "job_1".into(),
            content_hash.into(),
            ontology.into(),
            "doc.txt".into(),
            false,
            false,
            Utc::now(),
        );
        j.status = status;
        j
    }

    #[test]
    fn not_duplicate_when_neither_graph_nor_jobs_have_it() {
        let graph = InMemoryGraphStore::new();
        let result = check_duplicate(&graph, std::iter::empty(), "hash1", "biology");
        assert!(!result.duplicate);
    }

    #[test]
    fn duplicate_when_graph_already_has_the_document() {
        let graph = InMemoryGraphStore::new();
        graph
            .transaction(|tx| {
                tx.upsert_document(DocumentMeta::new(
                    "hash1".into(),
                    "biology".into(),
                    "doc.txt".into(),
                    "job_0".into(),
                ));
                Ok(())
            })
            .unwrap();
        let result = check_duplicate(&graph, std::iter::empty(), "hash1", "biology");
        assert_eq!(result, DuplicateCheck { duplicate: true, source: Some(DuplicateSource::Graph) });
    }

    #[test]
    fn duplicate_when_an_active_job_already_holds_the_key() {
        let graph = InMemoryGraphStore::new();
        let jobs = vec![job("hash1", "biology", JobStatus::Approved)];
        let result = check_duplicate(&graph, jobs.iter(), "hash1", "biology");
        assert_eq!(result, DuplicateCheck { duplicate: true, source: Some(DuplicateSource::Jobs) });
    }

    #[test]
    fn pending_jobs_do_not_count_as_duplicates() {
        let graph = InMemoryGraphStore::new();
        let jobs = vec![job("hash1", "biology", JobStatus::Pending)];
        let result = check_duplicate(&graph, jobs.iter(), "hash1", "biology");
        assert!(!result.duplicate);
    }
}
