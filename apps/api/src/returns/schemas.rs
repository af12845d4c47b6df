//! Output contracts for the two schema-bound stages.

use crate::schema::{define, group, SchemaError, SchemaSet};

pub const EMAIL_NAME: &str = "email_name";
pub const ORDER_NUMBER: &str = "order_number";
pub const PURCHASE_DATE: &str = "purchase_date";
pub const ISSUE_SUMMARY: &str = "issue_summary";

pub const ACCEPT_REASON: &str = "accept_reason";
pub const ACCEPT_REASON_DETAIL: &str = "accept_reason_detail";

/// Stage 1: facts pulled out of the raw customer email.
pub fn extraction_schema() -> Result<SchemaSet, SchemaError> {
    group([
        define(
            EMAIL_NAME,
            "What is the first and last name of the person who sent the email? \
             If it is not present, answer 'Unknown'.",
        ),
        define(
            ORDER_NUMBER,
            "What order number does the email refer to? \
             Extract it exactly as written, for example '#D347-STELLA'. \
             If it cannot be found, answer 'Unknown'.",
        ),
        define(
            PURCHASE_DATE,
            "When was the product purchased? \
             If it is mentioned (such as 'two weeks ago', 'on Monday', '12-04-2025'), \
             extract exactly what it says. If it is not mentioned, answer 'Unknown'.",
        ),
        define(
            ISSUE_SUMMARY,
            "Summarise objectively and clearly the reason for the return described \
             in the email. Use one or two clear sentences.",
        ),
    ])
}

/// Stage 2: acceptance decision against the return policy.
pub fn decision_schema() -> Result<SchemaSet, SchemaError> {
    group([
        define(
            ACCEPT_REASON,
            "Based on the problem description, is this a valid reason to accept the return? \
             Answer True or False according to the return guidelines.",
        ),
        define(
            ACCEPT_REASON_DETAIL,
            "Explain why the request does or does not comply with the return policy. \
             For example: 'It was damaged in transit, which is not covered by the warranty' \
             or 'The product was delivered with a factory defect'.",
        ),
    ])
}
