//! Customer entity type

use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, RenameKey};

/// A customer, keyed by customer code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub code: String,

    #[serde(default)]
    pub company_name: String,

    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub address: String,

    /// Contact person and/or phone
    #[serde(default)]
    pub contact: String,
}

impl Customer {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            company_name: String::new(),
            region: String::new(),
            address: String::new(),
            contact: String::new(),
        }
    }

    /// Same record under a different code
    pub fn with_code(&self, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

impl Entity for Customer {
    const COLLECTION: &'static str = "customers";
    const LABEL: &'static str = "khách hàng";

    type Patch = CustomerPatch;

    fn key(&self) -> &str {
        &self.code
    }

    fn apply_patch(&mut self, patch: &CustomerPatch) {
        if let Some(ref name) = patch.company_name {
            self.company_name = name.clone();
        }
        if let Some(ref region) = patch.region {
            self.region = region.clone();
        }
        if let Some(ref address) = patch.address {
            self.address = address.clone();
        }
        if let Some(ref contact) = patch.contact {
            self.contact = contact.clone();
        }
    }
}

impl RenameKey for Customer {}
