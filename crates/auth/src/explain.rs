// ─────────────────────────────────────────────────────────────────────────────
// Visibility Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

use serde::Serialize;

use crate::{Capabilities, Feature, Role, can_show};

/// Detailed explanation of a visibility decision.
///
/// Answers "why is this page hidden for me?" without changing the decision:
/// `explain(..).granted` always equals `can_show(..)` for the same inputs.
#[derive(Debug, Clone, Serialize)]
pub struct VisibilityExplanation {
    pub feature: Feature,
    pub granted: bool,

    /// Human-readable reason for the decision.
    pub reason: String,

    pub role: Option<Role>,
    pub admitted_roles: Vec<Role>,
    pub required_capability: Option<&'static str>,
    pub capabilities_loaded: bool,

    /// If denied, this explains what was missing.
    pub denial: Option<Denial>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Denial {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoPrincipal,
    RoleNotPermitted,
    CapabilitiesUnavailable,
    MissingCapability,
}

pub fn explain(
    role: Option<Role>,
    capabilities: Option<&Capabilities>,
    feature: Feature,
) -> VisibilityExplanation {
    let gate = feature.gate();
    let admitted_roles: Vec<Role> = gate.roles().iter().collect();
    let required = gate.capability();
    let granted = can_show(role, capabilities, feature);

    let (reason, denial) = match (role, granted) {
        (None, _) => (
            "No authenticated principal".to_string(),
            Some(Denial {
                kind: DenialKind::NoPrincipal,
                message: "Session has no valid token or role".to_string(),
                suggestions: vec!["Sign in again".to_string()],
            }),
        ),
        (Some(role), true) if gate.roles().contains(role) => {
            (format!("Role '{role}' is admitted by the {feature} gate"), None)
        }
        (Some(_), true) => (
            format!(
                "Capability '{}' is granted",
                required.map(|c| c.key()).unwrap_or_default()
            ),
            None,
        ),
        (Some(role), false) => match (required, capabilities) {
            (None, _) => (
                format!("Role '{role}' is not admitted by the {feature} gate"),
                Some(Denial {
                    kind: DenialKind::RoleNotPermitted,
                    message: format!("{feature} is restricted to: {}", join_roles(&admitted_roles)),
                    suggestions: vec![format!(
                        "Sign in with one of: {}",
                        join_roles(&admitted_roles)
                    )],
                }),
            ),
            (Some(capability), None) => (
                format!("Capabilities for role '{role}' are not loaded"),
                Some(Denial {
                    kind: DenialKind::CapabilitiesUnavailable,
                    message: "Capability set is loading, failed to load, or not applicable to this role"
                        .to_string(),
                    suggestions: vec![
                        "Wait for capabilities to finish loading, or refetch".to_string(),
                        format!("Ask the tenant owner to grant '{}'", capability.key()),
                    ],
                }),
            ),
            (Some(capability), Some(_)) => (
                format!("Capability '{}' is not granted", capability.key()),
                Some(Denial {
                    kind: DenialKind::MissingCapability,
                    message: format!("Missing required capability: '{}'", capability.key()),
                    suggestions: vec![format!(
                        "Ask the tenant owner to grant '{}'",
                        capability.key()
                    )],
                }),
            ),
        },
    };

    VisibilityExplanation {
        feature,
        granted,
        reason,
        role,
        admitted_roles,
        required_capability: required.map(|c| c.key()),
        capabilities_loaded: capabilities.is_some(),
        denial,
    }
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
