//! Catalog values.

use serde::{Deserialize, Serialize};

/// Variant-specific part of a catalog value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogValueKind {
    Fixed,
    Variable {
        ext_key: String,
        tenant: i32,
    },
    Dependent {
        ext_key: String,
        tenant: i32,
        parent_code: i32,
    },
}

/// Result of a tenant whitelist check. The numeric codes are what the
/// storage layer persists in `access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantAccess {
    Allowed = 0,
    Denied = 1,
}

impl TenantAccess {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// One code/text entry of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogValue {
    pub code: i32,
    pub text: String,
    pub sort_info: i32,
    pub access: i32,
    pub kind: CatalogValueKind,
}

impl CatalogValue {
    pub fn fixed(code: i32, text: impl Into<String>, sort_info: i32) -> Self {
        Self {
            code,
            text: text.into(),
            sort_info,
            access: 0,
            kind: CatalogValueKind::Fixed,
        }
    }

    pub fn variable(
        code: i32,
        text: impl Into<String>,
        sort_info: i32,
        ext_key: impl Into<String>,
        tenant: i32,
    ) -> Self {
        Self {
            code,
            text: text.into(),
            sort_info,
            access: 0,
            kind: CatalogValueKind::Variable {
                ext_key: ext_key.into(),
                tenant,
            },
        }
    }

    pub fn dependent(
        code: i32,
        text: impl Into<String>,
        sort_info: i32,
        ext_key: impl Into<String>,
        tenant: i32,
        parent_code: i32,
    ) -> Self {
        Self {
            code,
            text: text.into(),
            sort_info,
            access: 0,
            kind: CatalogValueKind::Dependent {
                ext_key: ext_key.into(),
                tenant,
                parent_code,
            },
        }
    }

    pub fn with_access(mut self, access: i32) -> Self {
        self.access = access;
        self
    }

    /// Tenant of the value; fixed values are unrestricted (0).
    pub fn tenant(&self) -> i32 {
        match &self.kind {
            CatalogValueKind::Fixed => 0,
            CatalogValueKind::Variable { tenant, .. }
            | CatalogValueKind::Dependent { tenant, .. } => *tenant,
        }
    }

    pub fn ext_key(&self) -> Option<&str> {
        match &self.kind {
            CatalogValueKind::Fixed => None,
            CatalogValueKind::Variable { ext_key, .. }
            | CatalogValueKind::Dependent { ext_key, .. } => Some(ext_key),
        }
    }

    pub fn parent_code(&self) -> Option<i32> {
        match &self.kind {
            CatalogValueKind::Dependent { parent_code, .. } => Some(*parent_code),
            _ => None,
        }
    }

    /// Whitelist check: tenant 0 or an empty list allows everything,
    /// otherwise the value's tenant must be listed.
    pub fn access_for_tenants(&self, tenants: &[i32]) -> TenantAccess {
        let tenant = self.tenant();
        if tenant == 0 || tenants.is_empty() || tenants.contains(&tenant) {
            TenantAccess::Allowed
        } else {
            TenantAccess::Denied
        }
    }
}
