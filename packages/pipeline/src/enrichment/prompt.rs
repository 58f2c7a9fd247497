use crate::enrichment::types::EntryDraft;

const SYSTEM_ENRICHMENT: &str = include_str!("../../prompts/system_enrichment.txt");

/// Build the system prompt for enrichment.
pub fn build_system_prompt() -> &'static str {
    SYSTEM_ENRICHMENT
}

/// Build the user prompt for one entry.
pub fn build_enrichment_prompt(draft: &EntryDraft) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("# {}\n", draft.canonical_citation));
    prompt.push_str(&format!("- Title: {}\n", draft.title));
    prompt.push_str(&format!("- Type: {}\n", draft.entry_type));
    prompt.push_str(&format!("- Subtype: {}\n\n", draft.subtype));

    prompt.push_str("## Text\n\n");
    prompt.push_str(draft.text.trim());
    prompt.push_str("\n\n");

    prompt.push_str(
        "Return ONLY a single JSON object with the keys `summary`, `tags`, \
         `jurisprudence`, `related_laws`, `elements`, `penalties` and `defenses`. \
         No markdown fences or explanations.",
    );

    prompt
}

/// Build a follow-up prompt after an unparseable answer.
pub fn build_fix_prompt(error: &str) -> String {
    format!(
        "The previous answer could not be read as a JSON object ({error}). \
         Return ONLY the corrected JSON object."
    )
}
