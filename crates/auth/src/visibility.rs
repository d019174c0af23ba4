//! Feature catalog and the visibility evaluator.
//!
//! Every navigable feature declares exactly one [`Gate`]. Evaluation is a
//! pure function of `(role, capabilities, feature)`:
//!
//! 1. no principal → hidden;
//! 2. role in the gate's role set → shown, capabilities are not consulted;
//! 3. otherwise the gate's capability flag must be present and `true`.
//!
//! A missing capability set (still loading, or the fetch failed) denies.
//! Capabilities only add visibility for non-privileged roles; they never
//! restrict a role that the gate already admits.

use serde::{Deserialize, Serialize};

use crate::{Capabilities, Capability, Limit, Role, RoleSet};

/// Predicate a feature must satisfy to be shown.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Shown to the listed roles only.
    Roles(RoleSet),
    /// Shown to the listed roles, or to anyone holding the capability.
    RolesOrCapability(RoleSet, Capability),
}

impl Gate {
    pub fn roles(&self) -> RoleSet {
        match self {
            Gate::Roles(roles) | Gate::RolesOrCapability(roles, _) => *roles,
        }
    }

    pub fn capability(&self) -> Option<Capability> {
        match self {
            Gate::Roles(_) => None,
            Gate::RolesOrCapability(_, capability) => Some(*capability),
        }
    }

    pub fn admits(&self, role: Option<Role>, capabilities: Option<&Capabilities>) -> bool {
        let Some(role) = role else {
            return false;
        };
        if self.roles().contains(role) {
            return true;
        }
        match (self.capability(), capabilities) {
            (Some(capability), Some(caps)) => caps.granted(capability),
            _ => false,
        }
    }
}

/// Navigable features and gated actions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    Dashboard,
    Clients,
    Companies,
    Users,
    Customers,
    Vendors,
    Products,
    Inventory,
    Transactions,
    Invoices,
    Reports,
    Settings,
    UpdateCompany,
    SendInvoiceEmail,
    SendInvoiceWhatsapp,
}

impl Feature {
    /// Catalog order; also the navigation menu order.
    pub const ALL: [Feature; 15] = [
        Feature::Dashboard,
        Feature::Clients,
        Feature::Companies,
        Feature::Users,
        Feature::Customers,
        Feature::Vendors,
        Feature::Products,
        Feature::Inventory,
        Feature::Transactions,
        Feature::Invoices,
        Feature::Reports,
        Feature::Settings,
        Feature::UpdateCompany,
        Feature::SendInvoiceEmail,
        Feature::SendInvoiceWhatsapp,
    ];

    pub fn gate(&self) -> Gate {
        use Gate::{Roles, RolesOrCapability};

        match self {
            Feature::Dashboard
            | Feature::Transactions
            | Feature::Invoices
            | Feature::Reports
            | Feature::Settings => Roles(RoleSet::ALL),
            Feature::Clients => Roles(RoleSet::of(&[Role::Master])),
            // Company visibility names admin explicitly; master is not bypassed here.
            Feature::Companies => {
                RolesOrCapability(RoleSet::of(&[Role::Admin]), Capability::CreateCompanies)
            }
            Feature::Users => RolesOrCapability(RoleSet::BYPASS, Capability::CreateUsers),
            Feature::Customers => RolesOrCapability(RoleSet::BYPASS, Capability::CreateCustomers),
            Feature::Vendors => RolesOrCapability(RoleSet::BYPASS, Capability::CreateVendors),
            Feature::Products => RolesOrCapability(RoleSet::BYPASS, Capability::CreateProducts),
            Feature::Inventory => RolesOrCapability(RoleSet::BYPASS, Capability::CreateInventory),
            Feature::UpdateCompany => {
                RolesOrCapability(RoleSet::BYPASS, Capability::UpdateCompanies)
            }
            Feature::SendInvoiceEmail => {
                RolesOrCapability(RoleSet::BYPASS, Capability::SendInvoiceEmail)
            }
            Feature::SendInvoiceWhatsapp => {
                RolesOrCapability(RoleSet::BYPASS, Capability::SendInvoiceWhatsapp)
            }
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Feature::Dashboard => "Dashboard",
            Feature::Clients => "Clients",
            Feature::Companies => "Companies",
            Feature::Users => "Users",
            Feature::Customers => "Customers",
            Feature::Vendors => "Vendors",
            Feature::Products => "Products",
            Feature::Inventory => "Inventory",
            Feature::Transactions => "Transactions",
            Feature::Invoices => "Invoices",
            Feature::Reports => "Reports",
            Feature::Settings => "Settings",
            Feature::UpdateCompany => "UpdateCompany",
            Feature::SendInvoiceEmail => "SendInvoiceEmail",
            Feature::SendInvoiceWhatsapp => "SendInvoiceWhatsapp",
        }
    }

    /// Route of the page, or `None` for in-page actions.
    pub fn route(&self) -> Option<&'static str> {
        match self {
            Feature::Dashboard => Some("/dashboard"),
            Feature::Clients => Some("/clients"),
            Feature::Companies => Some("/companies"),
            Feature::Users => Some("/users"),
            Feature::Customers => Some("/customers"),
            Feature::Vendors => Some("/vendors"),
            Feature::Products => Some("/products"),
            Feature::Inventory => Some("/inventory"),
            Feature::Transactions => Some("/transactions"),
            Feature::Invoices => Some("/invoices"),
            Feature::Reports => Some("/reports"),
            Feature::Settings => Some("/settings"),
            Feature::UpdateCompany | Feature::SendInvoiceEmail | Feature::SendInvoiceWhatsapp => {
                None
            }
        }
    }

    pub fn is_navigable(&self) -> bool {
        self.route().is_some()
    }

    pub fn from_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Match a route path, ignoring a trailing slash.
    pub fn from_route(path: &str) -> Option<Feature> {
        let path = match path.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => path,
        };
        Feature::ALL.into_iter().find(|f| f.route() == Some(path))
    }
}

impl core::fmt::Display for Feature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

/// Decide whether `feature` is visible.
pub fn can_show(role: Option<Role>, capabilities: Option<&Capabilities>, feature: Feature) -> bool {
    feature.gate().admits(role, capabilities)
}

/// Like [`can_show`], keyed by feature name. Unknown keys are hidden.
pub fn can_show_key(role: Option<Role>, capabilities: Option<&Capabilities>, key: &str) -> bool {
    Feature::from_key(key).is_some_and(|feature| can_show(role, capabilities, feature))
}

/// Navigable features visible to the principal, in menu order.
pub fn visible_features(role: Option<Role>, capabilities: Option<&Capabilities>) -> Vec<Feature> {
    Feature::ALL
        .into_iter()
        .filter(|f| f.is_navigable() && can_show(role, capabilities, *f))
        .collect()
}

/// Whether one more record may be created under a quota.
///
/// Capability-exempt roles are never limited; everyone else needs a loaded
/// capability set with `current` strictly below the limit.
pub fn can_create_within_limit(
    role: Option<Role>,
    capabilities: Option<&Capabilities>,
    limit: Limit,
    current: u32,
) -> bool {
    match (role, capabilities) {
        (None, _) => false,
        (Some(role), _) if role.is_capability_exempt() => true,
        (Some(_), Some(caps)) => current < caps.limit(limit),
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    fn arb_feature() -> impl Strategy<Value = Feature> {
        prop::sample::select(Feature::ALL.to_vec())
    }

    fn arb_capabilities() -> impl Strategy<Value = Capabilities> {
        (prop::collection::vec(any::<bool>(), 9), 0u32..10, 0u32..10, 0u32..10).prop_map(
            |(flags, companies, users, inventories)| {
                let mut caps = Capabilities::default()
                    .with_limit(Limit::MaxCompanies, companies)
                    .with_limit(Limit::MaxUsers, users)
                    .with_limit(Limit::MaxInventories, inventories);
                for (capability, on) in Capability::ALL.into_iter().zip(flags) {
                    if on {
                        caps = caps.with(capability);
                    }
                }
                caps
            },
        )
    }

    #[test]
    fn viewer_alias_without_capability_cannot_see_users() {
        let role = Role::normalize("Viewer");
        assert_eq!(role, Some(Role::User));
        let caps = Capabilities::default();
        assert!(!can_show(role, Some(&caps), Feature::Users));
    }

    #[test]
    fn admin_sees_users_without_capabilities() {
        assert!(can_show(Some(Role::Admin), None, Feature::Users));
    }

    #[test]
    fn customer_capability_grants_only_its_feature() {
        let caps = Capabilities::default().with(Capability::CreateInventory);
        assert!(can_show(Some(Role::Customer), Some(&caps), Feature::Inventory));
        assert!(!can_show(Some(Role::Customer), Some(&caps), Feature::Companies));
    }

    #[test]
    fn companies_names_admin_explicitly() {
        assert!(can_show(Some(Role::Admin), None, Feature::Companies));
        assert!(!can_show(Some(Role::Master), None, Feature::Companies));
        assert!(can_show(Some(Role::Master), None, Feature::Clients));
        assert!(!can_show(Some(Role::Admin), None, Feature::Clients));
    }

    #[test]
    fn no_principal_sees_nothing() {
        let all = Capabilities::default();
        let all = Capability::ALL.into_iter().fold(all, |c, cap| c.with(cap));
        for feature in Feature::ALL {
            assert!(!can_show(None, Some(&all), feature));
        }
        assert!(visible_features(None, Some(&all)).is_empty());
    }

    #[test]
    fn unknown_feature_key_is_hidden() {
        assert!(!can_show_key(Some(Role::Master), None, "SecretPage"));
        assert!(can_show_key(Some(Role::Master), None, "Users"));
    }

    #[test]
    fn routes_resolve_to_features() {
        assert_eq!(Feature::from_route("/inventory"), Some(Feature::Inventory));
        assert_eq!(Feature::from_route("/inventory/"), Some(Feature::Inventory));
        assert_eq!(Feature::from_route("/nowhere"), None);
        assert_eq!(Feature::from_route("/"), None);
        for feature in Feature::ALL {
            assert_eq!(Feature::from_key(feature.key()), Some(feature));
            if let Some(route) = feature.route() {
                assert_eq!(Feature::from_route(route), Some(feature));
            }
        }
    }

    #[test]
    fn menu_for_capable_customer() {
        let caps = Capabilities::default()
            .with(Capability::CreateInventory)
            .with(Capability::SendInvoiceEmail);
        assert_eq!(
            visible_features(Some(Role::Customer), Some(&caps)),
            vec![
                Feature::Dashboard,
                Feature::Inventory,
                Feature::Transactions,
                Feature::Invoices,
                Feature::Reports,
                Feature::Settings,
            ]
        );
        // Actions are gated but never listed in the menu.
        assert!(can_show(Some(Role::Customer), Some(&caps), Feature::SendInvoiceEmail));
    }

    #[test]
    fn quota_checks() {
        let caps = Capabilities::default().with_limit(Limit::MaxCompanies, 2);
        assert!(can_create_within_limit(Some(Role::Customer), Some(&caps), Limit::MaxCompanies, 1));
        assert!(!can_create_within_limit(Some(Role::Customer), Some(&caps), Limit::MaxCompanies, 2));
        assert!(!can_create_within_limit(Some(Role::Customer), None, Limit::MaxCompanies, 0));
        assert!(can_create_within_limit(Some(Role::Admin), None, Limit::MaxCompanies, 1_000));
        assert!(!can_create_within_limit(None, Some(&caps), Limit::MaxCompanies, 0));
    }

    proptest! {
        #[test]
        fn bypass_roles_ignore_capabilities(
            role in prop::sample::select(vec![Role::Master, Role::Admin]),
            caps in proptest::option::of(arb_capabilities()),
            feature in arb_feature(),
        ) {
            let gate = feature.gate();
            if gate.roles().contains(role) {
                prop_assert!(can_show(Some(role), caps.as_ref(), feature));
            }
            if gate.roles() == RoleSet::BYPASS {
                prop_assert!(can_show(Some(role), caps.as_ref(), feature));
            }
        }

        #[test]
        fn customer_sees_capability_gates_exactly_when_flag_is_true(
            caps in proptest::option::of(arb_capabilities()),
            feature in arb_feature(),
        ) {
            let gate = feature.gate();
            if let (false, Some(capability)) = (gate.roles().contains(Role::Customer), gate.capability()) {
                let expected = caps.as_ref().is_some_and(|c| c.granted(capability));
                prop_assert_eq!(can_show(Some(Role::Customer), caps.as_ref(), feature), expected);
            }
        }

        #[test]
        fn null_capabilities_only_admit_by_role(role in arb_role(), feature in arb_feature()) {
            prop_assert_eq!(
                can_show(Some(role), None, feature),
                feature.gate().roles().contains(role)
            );
        }

        #[test]
        fn evaluation_is_idempotent(
            role in proptest::option::of(arb_role()),
            caps in proptest::option::of(arb_capabilities()),
            feature in arb_feature(),
        ) {
            let first = can_show(role, caps.as_ref(), feature);
            let second = can_show(role, caps.as_ref(), feature);
            prop_assert_eq!(first, second);
            prop_assert_eq!(can_show_key(role, caps.as_ref(), feature.key()), first);
        }
    }
}
