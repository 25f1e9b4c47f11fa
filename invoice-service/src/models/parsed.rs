//! Nullable invoice fields extracted from free text.
//!
//! Every field the model cannot find is `null` on the wire, never omitted,
//! so the form can bind the response without probing for keys. Only the
//! `warning` flag is optional.

use super::invoice::lenient_number;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedParty {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ParsedParty {
    pub fn has_data(&self) -> bool {
        [
            &self.name,
            &self.address,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
            &self.email,
            &self.phone,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedItem {
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedInvoice {
    pub invoice_number: Option<String>,
    pub invoice_name: Option<String>,
    pub date: Option<String>,
    pub due_date: Option<String>,
    pub sender: Option<ParsedParty>,
    pub recipient: Option<ParsedParty>,
    pub items: Option<Vec<ParsedItem>>,
    #[serde(deserialize_with = "lenient_number")]
    pub tax_rate: Option<f64>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    pub payment_instructions: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub shipping: Option<f64>,
    /// Present only on low-confidence or truncated extractions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ParsedInvoice {
    /// Whether any semantically meaningful field survived extraction.
    /// When nothing did, callers surface a soft warning instead of an error.
    pub fn has_invoice_data(&self) -> bool {
        let has_text = |field: &Option<String>| field.as_deref().is_some_and(|v| !v.trim().is_empty());

        has_text(&self.invoice_number)
            || has_text(&self.date)
            || has_text(&self.due_date)
            || self.sender.as_ref().is_some_and(ParsedParty::has_data)
            || self.recipient.as_ref().is_some_and(ParsedParty::has_data)
            || self.items.as_ref().is_some_and(|items| {
                !items.is_empty() && items.iter().any(|item| has_text(&item.description))
            })
    }
}
