//! Product entity type - catalog items reports can refer to

use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;

/// A catalog product, keyed by supplier/catalog code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub code: String,

    #[serde(default)]
    pub trade_name: String,

    #[serde(default)]
    pub device_name: String,

    #[serde(default)]
    pub product_line: String,

    #[serde(default)]
    pub brand: String,

    /// Device registration number
    #[serde(default)]
    pub registration_number: String,
}

impl Product {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            trade_name: String::new(),
            device_name: String::new(),
            product_line: String::new(),
            brand: String::new(),
            registration_number: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_number: Option<String>,
}

impl Entity for Product {
    const COLLECTION: &'static str = "products";
    const LABEL: &'static str = "sản phẩm";

    type Patch = ProductPatch;

    fn key(&self) -> &str {
        &self.code
    }

    fn apply_patch(&mut self, patch: &ProductPatch) {
        let fields = [
            (&mut self.trade_name, &patch.trade_name),
            (&mut self.device_name, &patch.device_name),
            (&mut self.product_line, &patch.product_line),
            (&mut self.brand, &patch.brand),
            (&mut self.registration_number, &patch.registration_number),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                *field = value.clone();
            }
        }
    }
}
