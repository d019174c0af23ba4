use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role of an authenticated principal.
///
/// The set is closed: raw role strings coming from persisted session state are
/// mapped onto these variants by [`Role::normalize`], and anything that does
/// not map is treated as "no principal".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Master,
    Admin,
    Manager,
    Customer,
    User,
}

impl Role {
    /// Every canonical role, in privilege order.
    pub const ALL: [Role; 5] = [
        Role::Master,
        Role::Admin,
        Role::Manager,
        Role::Customer,
        Role::User,
    ];

    /// Map a raw role marker onto a canonical role.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Display aliases (`viewer`, `accountant`, `client`) collapse onto their
    /// canonical role. Returns `None` for empty or unrecognized input.
    pub fn normalize(raw: &str) -> Option<Role> {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "master" => Some(Role::Master),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "customer" | "client" => Some(Role::Customer),
            "user" | "viewer" | "accountant" => Some(Role::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Customer => "customer",
            Role::User => "user",
        }
    }

    /// Master and admin skip capability checks entirely (admin bypass).
    pub fn is_capability_exempt(&self) -> bool {
        matches!(self, Role::Master | Role::Admin)
    }

    /// Only customer-class principals have a tenant capability set to fetch.
    pub fn is_customer_class(&self) -> bool {
        matches!(self, Role::Customer)
    }

    const fn bit(self) -> u8 {
        match self {
            Role::Master => 1 << 0,
            Role::Admin => 1 << 1,
            Role::Manager => 1 << 2,
            Role::Customer => 1 << 3,
            Role::User => 1 << 4,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Role::normalize(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown role '{raw}'")))
    }
}

/// A set of roles, used by feature gates.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: RoleSet = RoleSet(0);

    /// Every authenticated role.
    pub const ALL: RoleSet = RoleSet::of(&Role::ALL);

    /// Roles that see bypass-gated features regardless of capabilities.
    pub const BYPASS: RoleSet = RoleSet::of(&[Role::Master, Role::Admin]);

    pub const fn of(roles: &[Role]) -> RoleSet {
        let mut bits = 0u8;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        RoleSet(bits)
    }

    pub const fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(|r| self.contains(*r))
    }
}
