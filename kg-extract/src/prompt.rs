//! Prompt construction, including the escalating-strictness retry prompt
//! (§4.2: "retries up to R times with an escalating-strictness prompt").

use crate::schema::RecentConcept;

pub fn build_prompt(chunk_text: &str, recent_concepts: &[RecentConcept], attempt: u32) -> String {
    let context = if recent_concepts.is_empty() {
        "(none yet)".to_string()
    } else {
        recent_concepts
            .iter()
            .map(|c| format!("- {} ({}): {}", c.label, c.concept_id, c.search_terms.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let strictness = strictness_notice(attempt);

    format!(
        "Extract concepts, relationships, and evidence from the passage below.\n\
         Respond with a single JSON object matching exactly this shape:\n\
         {{\"concepts\":[{{\"local_id\":str,\"label\":str,\"search_terms\":[str],\"quote_ids\":[str]}}],\n\
         \"relationships\":[{{\"from\":str,\"to\":str,\"type\":str,\"confidence\":number}}],\n\
         \"evidence\":[{{\"quote_id\":str,\"quote\":str,\"concept_local_id\":str}}]}}\n\
         {strictness}\n\n\
         Known concepts already in the graph (reuse their concept_id in `from`/`to` when a \
         relationship refers to one of them):\n{context}\n\n\
         Passage:\n{chunk_text}"
    )
}

fn strictness_notice(attempt: u32) -> &'static str {
    match attempt {
        0 => "",
        1 => "Your previous response did not parse as valid JSON. Return ONLY the JSON object, no prose, no code fences.",
        _ => "Your previous responses were rejected. Return ONLY minified JSON matching the shape exactly, \
              with no trailing commas, no comments, and every field present even if empty.",
    }
}
