// LLM prompt templates for the returns pipeline.
// Placeholders use `{name}`; literal braces must be doubled (see prompt::PromptTemplate).

/// Stage 1 template.
/// Variables: {email}, {format_instructions}
pub const EXTRACTION_TEMPLATE: &str = "\
Extract the case details from the following customer email.

Email: {email}

{format_instructions}";

/// Stage 2 template.
/// Variables: {issue_summary}, {return_guidelines}, {format_instructions}
pub const DECISION_TEMPLATE: &str = "\
Decide whether the following return request is accepted under the return guidelines.

Problem summary: {issue_summary}

Return guidelines:
{return_guidelines}

{format_instructions}";

/// System prompt for the reply stage. The reply is free text, not schema-parsed.
pub const REPLY_SYSTEM: &str = "You are a customer service agent. \
    Write only the body of the email reply, starting with a subject line. \
    Do not add commentary before or after the email.";

/// Stage 3 template.
/// Variables: {company_name}, {client_name}, {order_number}, {issue_summary},
///            {accept_decision}, {accept_reason_detail}, {unknown_marker}, {no_invention}
pub const REPLY_TEMPLATE: &str = "\
You are a customer service agent at {company_name}.
You must write a formal email in reply to a customer who requested the return of a product.

Case context:
- Customer name: {client_name}
- Order number: {order_number}
- Problem summary: {issue_summary}
- Is the return accepted?: {accept_decision}
- Reason for the decision: {accept_reason_detail}

Write a professional, courteous and objective message.
If a value above is '{unknown_marker}', do not mention it and do not use a placeholder for it.
{no_invention}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PromptTemplate;

    #[test]
    fn test_templates_parse_with_expected_placeholders() {
        assert_eq!(
            PromptTemplate::new(EXTRACTION_TEMPLATE).unwrap().placeholders(),
            vec!["email", "format_instructions"]
        );
        assert_eq!(
            PromptTemplate::new(DECISION_TEMPLATE).unwrap().placeholders(),
            vec!["issue_summary", "return_guidelines", "format_instructions"]
        );
        assert_eq!(
            PromptTemplate::new(REPLY_TEMPLATE).unwrap().placeholders(),
            vec![
                "company_name",
                "client_name",
                "order_number",
                "issue_summary",
                "accept_decision",
                "accept_reason_detail",
                "unknown_marker",
                "no_invention"
            ]
        );
    }
}
