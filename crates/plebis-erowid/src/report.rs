//! Stored document shapes

use chrono::NaiveDate;
use plebis_core::ExternalId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::PayloadClass;

/// Topic category or attribute assigned by Erowid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErowidAttributes {
    pub categories: Vec<Tag>,
    pub attributes: Vec<Tag>,
}

/// One dose chart row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceInfo {
    pub time: Option<String>,
    pub amount: Option<String>,
    pub method: Option<String>,
    pub substance: String,
    pub form: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub erowid_id: ExternalId,
    pub reviewed: bool,
    pub available: bool,
    pub published: Option<NaiveDate>,
    pub exp_year: Option<u16>,
    pub gender: Option<String>,
    pub age: Option<u16>,
    pub views: Option<u64>,
    pub erowid_attributes: ErowidAttributes,
}

/// A transformed experience report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub meta: ReportMeta,
    pub title: String,
    pub author: Option<String>,
    /// Substance headline as shown above the report
    pub substance: Option<String>,
    pub substance_info: Vec<SubstanceInfo>,
    pub body_weight: Option<String>,
    pub report: String,
    #[serde(skip)]
    pub hidden: bool,
}

impl Report {
    pub fn erowid_id(&self) -> ExternalId {
        self.meta.erowid_id
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Stub stored for pages that are not publishable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMeta {
    pub erowid_id: ExternalId,
    pub reviewed: bool,
    pub available: bool,
}

impl StoredMeta {
    /// Stub for a marker classification; `None` for normal pages.
    ///
    /// `reviewed` is true only when the not-reviewed marker is present.
    pub fn for_class(erowid_id: ExternalId, class: PayloadClass) -> Option<Self> {
        let reviewed = match class {
            PayloadClass::Withdrawn => false,
            PayloadClass::NotReviewed => true,
            PayloadClass::Normal => return None,
        };
        Some(Self {
            erowid_id,
            reviewed,
            available: false,
        })
    }

    /// `{"meta": {...}}`; upserting it replaces only the `meta` field
    pub fn to_document(&self) -> Value {
        serde_json::json!({ "meta": self })
    }
}
