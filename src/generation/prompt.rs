use crate::rag::ScoredPassage;

/// Truncates to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Joins passage texts, each cut to `max_chars`, separated by blank lines.
pub fn build_context(passages: &[ScoredPassage], max_chars: usize) -> String {
    passages
        .iter()
        .map(|p| truncate_chars(&p.passage.text, max_chars))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn qa_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an assistant helping summarize AI policies for schools worldwide.\n\
         Use the following context from policy documents to answer the question.\n\
         Context:\n{context}\n\
         Question: {question}\n\
         Instructions:\n\
         - If the context directly answers, provide a clear, concise answer.\n\
         - If the answer is not explicit, summarize the closest relevant information.\n\
         - Always mention which schools/countries the policies came from.\n\
         - Prefer content whose country or school matches the query terms.\n\
         - Don't just say 'I don't know'. If unsure, explain what is available and missing, \
         and cite the nearest relevant country/school found.\n"
    )
}

pub struct PolicyPromptFields<'a> {
    pub school: &'a str,
    pub country: &'a str,
    pub level: &'a str,
    pub requirements: Option<&'a str>,
    pub scope: &'a [String],
}

pub fn policy_prompt(fields: &PolicyPromptFields<'_>, context: &str) -> String {
    let requirements = fields
        .requirements
        .filter(|r| !r.trim().is_empty())
        .unwrap_or("None specified");
    format!(
        "You are a legislator and an expert in drafting responsible AI policies for schools.\n\n\
         Details:\n\
         - School/Organization: {school}\n\
         - Country: {country}\n\
         - Level: {level}\n\
         - Requirements: {requirements}\n\
         - Scope: {scope}\n\n\
         Context from similar policies (authoritative sources):\n\
         {context}\n\n\
         Task:\n\
         1. Draft a comprehensive AI policy **grounded strictly in the provided context**. \
         Every major policy statement must be supported by the retrieved context. \
         Do not invent new rules or policies that are not in the context.\n\n\
         2. If important requirements are missing from the context, acknowledge the gap explicitly \
         and mark them under a section called 'Additional Recommendations'. These should be clearly \
         separated from the context-grounded policy.\n\n\
         3. Present the final output in **structured markdown** with clear sections\n\
         Make the policy clear, practical, and written in professional, legislative style.",
        school = fields.school,
        country = fields.country,
        level = fields.level,
        scope = fields.scope.join(", "),
    )
}
