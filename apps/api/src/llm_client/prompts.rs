// Shared prompt constants for every stage that talks to the generation service.
// Stage-specific templates live next to the stage (see returns::prompts).

/// System prompt for schema-bound stages: answer only in the requested shape.
pub const STRUCTURED_OUTPUT_SYSTEM: &str = "You are a precise customer-service analyst. \
    Follow the output format instructions exactly. \
    Do NOT include any text outside the requested block. \
    Do NOT invent information that is not in the input; \
    use the declared marker for anything that is missing.";

/// Closing instruction appended to every free-text drafting prompt.
pub const NO_INVENTION_INSTRUCTION: &str =
    "Do not invent information that has not been provided to you.";
