//! Tenant capability set.
//!
//! Capabilities are a fixed-schema record rather than an open map: the backend
//! may send extra keys (they are ignored) or omit keys (they default to
//! denied / zero). Nothing absent is ever read as "allowed".

use serde::{Deserialize, Deserializer, Serialize};

/// Boolean capability flags from the capability catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "canCreateUsers")]
    CreateUsers,
    #[serde(rename = "canCreateProducts")]
    CreateProducts,
    #[serde(rename = "canCreateCustomers")]
    CreateCustomers,
    #[serde(rename = "canCreateVendors")]
    CreateVendors,
    #[serde(rename = "canCreateCompanies")]
    CreateCompanies,
    #[serde(rename = "canCreateInventory")]
    CreateInventory,
    #[serde(rename = "canUpdateCompanies")]
    UpdateCompanies,
    #[serde(rename = "canSendInvoiceEmail")]
    SendInvoiceEmail,
    #[serde(rename = "canSendInvoiceWhatsapp")]
    SendInvoiceWhatsapp,
}

impl Capability {
    pub const ALL: [Capability; 9] = [
        Capability::CreateUsers,
        Capability::CreateProducts,
        Capability::CreateCustomers,
        Capability::CreateVendors,
        Capability::CreateCompanies,
        Capability::CreateInventory,
        Capability::UpdateCompanies,
        Capability::SendInvoiceEmail,
        Capability::SendInvoiceWhatsapp,
    ];

    /// Wire key as sent by the permissions endpoint.
    pub fn key(&self) -> &'static str {
        match self {
            Capability::CreateUsers => "canCreateUsers",
            Capability::CreateProducts => "canCreateProducts",
            Capability::CreateCustomers => "canCreateCustomers",
            Capability::CreateVendors => "canCreateVendors",
            Capability::CreateCompanies => "canCreateCompanies",
            Capability::CreateInventory => "canCreateInventory",
            Capability::UpdateCompanies => "canUpdateCompanies",
            Capability::SendInvoiceEmail => "canSendInvoiceEmail",
            Capability::SendInvoiceWhatsapp => "canSendInvoiceWhatsapp",
        }
    }

    pub fn from_key(key: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

/// Numeric quota limits from the capability catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Limit {
    #[serde(rename = "maxCompanies")]
    MaxCompanies,
    #[serde(rename = "maxUsers")]
    MaxUsers,
    #[serde(rename = "maxInventories")]
    MaxInventories,
}

impl Limit {
    pub const ALL: [Limit; 3] = [Limit::MaxCompanies, Limit::MaxUsers, Limit::MaxInventories];

    pub fn key(&self) -> &'static str {
        match self {
            Limit::MaxCompanies => "maxCompanies",
            Limit::MaxUsers => "maxUsers",
            Limit::MaxInventories => "maxInventories",
        }
    }
}

impl core::fmt::Display for Limit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.key())
    }
}

/// Capability set of a tenant-scoped principal.
///
/// `Capabilities::default()` is the all-denied set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default, deserialize_with = "flag")]
    pub can_create_users: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_create_products: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_create_customers: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_create_vendors: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_create_companies: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_create_inventory: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_update_companies: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_send_invoice_email: bool,
    #[serde(default, deserialize_with = "flag")]
    pub can_send_invoice_whatsapp: bool,
    #[serde(default, deserialize_with = "quota")]
    pub max_companies: u32,
    #[serde(default, deserialize_with = "quota")]
    pub max_users: u32,
    #[serde(default, deserialize_with = "quota")]
    pub max_inventories: u32,
}

impl Capabilities {
    /// Whether a flag is granted. Only an explicit `true` grants.
    pub fn granted(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateUsers => self.can_create_users,
            Capability::CreateProducts => self.can_create_products,
            Capability::CreateCustomers => self.can_create_customers,
            Capability::CreateVendors => self.can_create_vendors,
            Capability::CreateCompanies => self.can_create_companies,
            Capability::CreateInventory => self.can_create_inventory,
            Capability::UpdateCompanies => self.can_update_companies,
            Capability::SendInvoiceEmail => self.can_send_invoice_email,
            Capability::SendInvoiceWhatsapp => self.can_send_invoice_whatsapp,
        }
    }

    pub fn limit(&self, limit: Limit) -> u32 {
        match limit {
            Limit::MaxCompanies => self.max_companies,
            Limit::MaxUsers => self.max_users,
            Limit::MaxInventories => self.max_inventories,
        }
    }

    /// Return a copy with `capability` granted.
    pub fn with(mut self, capability: Capability) -> Self {
        *self.flag_mut(capability) = true;
        self
    }

    /// Return a copy with `limit` set to `value`.
    pub fn with_limit(mut self, limit: Limit, value: u32) -> Self {
        match limit {
            Limit::MaxCompanies => self.max_companies = value,
            Limit::MaxUsers => self.max_users = value,
            Limit::MaxInventories => self.max_inventories = value,
        }
        self
    }

    pub fn granted_flags(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.granted(*c))
    }

    fn flag_mut(&mut self, capability: Capability) -> &mut bool {
        match capability {
            Capability::CreateUsers => &mut self.can_create_users,
            Capability::CreateProducts => &mut self.can_create_products,
            Capability::CreateCustomers => &mut self.can_create_customers,
            Capability::CreateVendors => &mut self.can_create_vendors,
            Capability::CreateCompanies => &mut self.can_create_companies,
            Capability::CreateInventory => &mut self.can_create_inventory,
            Capability::UpdateCompanies => &mut self.can_update_companies,
            Capability::SendInvoiceEmail => &mut self.can_send_invoice_email,
            Capability::SendInvoiceWhatsapp => &mut self.can_send_invoice_whatsapp,
        }
    }
}

// `null` reads as absent.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn quota<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}
