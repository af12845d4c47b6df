//! The fixed return policy the decision stage judges against.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Built-in policy text. Overridable with `RETURNS_POLICY_FILE`.
pub const DEFAULT_RETURN_POLICY: &str = "\
Reasons to ACCEPT a return request:
- Confirmed manufacturing defect: the product shows internal or functional faults \
that cannot be attributed to transport or misuse.
- Supply error: the wrong components were delivered in terms of model, quantity or \
specification compared with the original order.
- Incomplete product or items missing from the factory: technical documentation, \
required parts or the original packaging were missing from the origin.

Reasons to REJECT a return request:
- Damage caused during transport: if transport was not insured or contracted directly \
by the company, no responsibility is accepted for damage that occurred during shipping.
- Improper handling by the customer: incorrect installation, modifications or \
inappropriate use of the component.
- Return deadline exceeded: the request is submitted outside the period set by the \
return policy (for example, 14 calendar days).";

/// Loads the policy from `path`, or returns the built-in policy when `path` is `None`.
pub fn load_policy(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(DEFAULT_RETURN_POLICY.to_string());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read return policy from {}", path.display()))?;

    if text.trim().is_empty() {
        bail!("Return policy file {} is empty", path.display());
    }

    Ok(text.trim().to_string())
}
