//! Prompt composition for each generating state.
//!
//! Each function interpolates exactly the session fields its state is
//! allowed to see. The wording is not load-bearing; the controller treats
//! whatever comes back as opaque text.

/// Template state: structured template for a document type.
pub fn template_prompt(document_type: &str) -> String {
    format!(
        "You are a document template generator. Create a detailed template for the \
         following document type:\n{document_type}\n\n\
         Provide a structured template with clear sections and placeholders."
    )
}

/// Gather-info state: questions the user must answer to fill the template.
pub fn gather_info_prompt(template: &str) -> String {
    format!(
        "Based on the following template, work out what information is needed and \
         ask the user specific questions to fill it in.\n\n\
         Template:\n{template}\n\n\
         List the specific information needed from the user."
    )
}

/// Draft state: full document from the template and the user's answers.
pub fn draft_prompt(template: &str, user_info: &str) -> String {
    format!(
        "Generate a complete document based on the template and the information \
         provided.\n\n\
         Template:\n{template}\n\n\
         User Information:\n{user_info}\n\n\
         Produce a polished, professional document that incorporates all of the \
         provided information."
    )
}

/// Request-feedback state: ask the user what to change.
pub fn feedback_request_prompt(document: &str) -> String {
    format!(
        "Review the following document and ask the user for specific feedback.\n\n\
         Document:\n{document}\n\n\
         Ask the user which aspects they would like to improve or modify."
    )
}

/// Revise state: rewrite the document with feedback, keeping the original
/// requirements.
pub fn revise_prompt(document: &str, feedback: &str) -> String {
    format!(
        "Revise the document based on the user's feedback while keeping the \
         original requirements.\n\n\
         Original Document:\n{document}\n\n\
         User Feedback:\n{feedback}\n\n\
         Provide an improved version that incorporates the feedback."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_prompt_mentions_document_type() {
        let prompt = template_prompt("invoice");
        assert!(prompt.contains("invoice"));
        assert!(prompt.contains("template"));
    }

    #[test]
    fn test_draft_prompt_includes_template_and_answers() {
        let prompt = draft_prompt("TEMPLATE-T", "Client: Acme, Amount: $500");
        assert!(prompt.contains("TEMPLATE-T"));
        assert!(prompt.contains("Client: Acme, Amount: $500"));
    }

    #[test]
    fn test_revise_prompt_orders_document_before_feedback() {
        let prompt = revise_prompt("DOC-1", "make it more formal");
        let doc_at = prompt.find("DOC-1").unwrap();
        let feedback_at = prompt.find("make it more formal").unwrap();
        assert!(doc_at < feedback_at);
    }

    #[test]
    fn test_single_field_prompts() {
        assert!(gather_info_prompt("T").contains("Template:\nT"));
        assert!(feedback_request_prompt("D").contains("Document:\nD"));
    }
}
