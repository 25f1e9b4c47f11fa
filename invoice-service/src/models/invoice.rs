//! Invoice view model and the raw form state it derives from.
//!
//! An `Invoice` is transient: it is rederived in full from `InvoiceForm`
//! for every preview, PDF render, and email send, so all three always agree
//! on the numbers. Nothing here is ever persisted.

use crate::models::currency;
use crate::services::{invoice_name, totals};
use serde::{Deserialize, Deserializer, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

/// Maximum number of line items on one invoice.
pub const MAX_ITEMS: usize = 5;

/// Decoded-size ceiling for an embedded logo data URI.
pub const MAX_LOGO_BYTES: usize = 5 * 1024 * 1024;

/// Accept a number, a numeric string, or anything else as `None`.
///
/// Wire-level half of the leniency policy: invalid numerics never fail
/// deserialization, they surface as `None` and coerce to zero downstream.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }))
}

/// A party on the invoice. All fields are free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct Company {
    #[validate(length(max = 200))]
    pub name: String,
    #[validate(length(max = 320))]
    pub email: String,
    #[validate(length(max = 300))]
    pub address: String,
    #[validate(length(max = 300))]
    pub address2: Option<String>,
    #[validate(length(max = 100))]
    pub city: String,
    #[validate(length(max = 20))]
    pub postal_code: String,
    #[validate(length(max = 100))]
    pub country: String,
    #[validate(length(max = 100))]
    pub state: String,
    #[validate(length(max = 40))]
    pub phone: String,
}

/// One raw form row: quantity and rate arrive untrusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineInput {
    pub description: String,
    pub issue_date: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub quantity: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub rate: Option<f64>,
}

/// One derived line item; `amount` is always `quantity * rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    pub quantity: f64,
    pub rate: f64,
    pub amount: f64,
}

/// The transient form state an invoice is derived from.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceForm {
    pub invoice_number: Option<String>,
    pub invoice_name: Option<String>,
    pub date: Option<String>,
    pub due_date: Option<String>,
    #[validate(nested)]
    pub sender: Company,
    #[validate(nested)]
    pub recipient: Company,
    #[validate(length(min = 1, max = 5, message = "An invoice must have between 1 and 5 items"))]
    pub items: Vec<LineInput>,
    #[validate(range(min = 0.0, message = "Tax rate must be positive"))]
    pub tax_rate: Option<f64>,
    #[validate(range(min = 0.0, max = 1000000.0, message = "Shipping must be positive"))]
    pub shipping: Option<f64>,
    pub currency: String,
    pub notes: Option<String>,
    pub payment_instructions: Option<String>,
    pub logo: Option<String>,
}

impl Default for InvoiceForm {
    fn default() -> Self {
        Self {
            invoice_number: None,
            invoice_name: None,
            date: None,
            due_date: None,
            sender: Company::default(),
            recipient: Company::default(),
            items: Vec::new(),
            tax_rate: None,
            shipping: None,
            currency: "USD".to_string(),
            notes: None,
            payment_instructions: None,
            logo: None,
        }
    }
}

impl InvoiceForm {
    /// Checks that cannot be expressed as derive rules: currency membership,
    /// email shape of populated party emails, and the logo size ceiling.
    pub fn validate_domain(&self) -> Result<(), AppError> {
        if !currency::is_supported(&self.currency) {
            return Err(AppError::field_validation(
                "currency",
                format!("Unsupported currency: {}", self.currency),
            ));
        }

        for (who, company) in [("sender", &self.sender), ("recipient", &self.recipient)] {
            if !company.email.is_empty() && !company.email.validate_email() {
                return Err(AppError::field_validation(
                    format!("{}.email", who),
                    "Invalid email format",
                ));
            }
        }

        if let Some(logo) = &self.logo {
            if logo_decoded_len(logo) > MAX_LOGO_BYTES {
                return Err(AppError::field_validation(
                    "logo",
                    "Logo image exceeds maximum allowed size (5MB)",
                ));
            }
        }

        Ok(())
    }
}

/// Decoded-size estimate for a base64 data URI, without decoding it.
fn logo_decoded_len(data_uri: &str) -> usize {
    let payload = data_uri.rsplit(',').next().unwrap_or(data_uri);
    payload.len() / 4 * 3
}

/// The fully derived invoice view model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: Option<String>,
    pub invoice_name: String,
    pub date: Option<String>,
    pub due_date: Option<String>,
    pub sender: Company,
    pub recipient: Company,
    pub items: Vec<InvoiceItem>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub total: f64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<f64>,
}

impl Invoice {
    /// Recompute the full view model from raw form state.
    ///
    /// Total and unconditional: every call rederives item amounts and
    /// aggregate totals from scratch, so preview, PDF, and email derivations
    /// cannot drift apart.
    pub fn derive(form: &InvoiceForm) -> Invoice {
        let totals = totals::compute(&form.items, form.tax_rate, form.shipping);

        let items = form
            .items
            .iter()
            .zip(totals.amounts.iter())
            .map(|(input, amount)| InvoiceItem {
                id: Uuid::new_v4().to_string(),
                description: input.description.clone(),
                issue_date: input.issue_date.clone(),
                quantity: totals::coerce(input.quantity),
                rate: totals::coerce(input.rate),
                amount: *amount,
            })
            .collect();

        let invoice_name = form
            .invoice_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| {
                let descriptions: Vec<String> = form
                    .items
                    .iter()
                    .map(|item| item.description.clone())
                    .collect();
                invoice_name::generate(
                    &descriptions,
                    Some(&form.recipient.name),
                    form.date.as_deref(),
                )
            });

        Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: form.invoice_number.clone(),
            invoice_name,
            date: form.date.clone(),
            due_date: form.due_date.clone(),
            sender: form.sender.clone(),
            recipient: form.recipient.clone(),
            items,
            subtotal: totals.subtotal,
            tax_rate: totals::coerce(form.tax_rate),
            tax_amount: totals.tax_amount,
            total: totals.total,
            currency: form.currency.clone(),
            notes: form.notes.clone(),
            payment_instructions: form.payment_instructions.clone(),
            logo: form.logo.clone(),
            shipping: form.shipping.map(|s| totals::coerce(Some(s))),
        }
    }

    /// Invoice number for display, `preview` when none was entered.
    pub fn display_number(&self) -> &str {
        self.invoice_number
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("preview")
    }

    pub fn pdf_filename(&self) -> String {
        format!("invoice-{}.pdf", self.display_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with_items(items: Vec<LineInput>) -> InvoiceForm {
        InvoiceForm {
            items,
            tax_rate: Some(8.0),
            shipping: Some(25.0),
            ..InvoiceForm::default()
        }
    }

    #[test]
    fn derive_computes_amounts_and_totals() {
        let form = form_with_items(vec![LineInput {
            description: "Consulting".to_string(),
            issue_date: None,
            quantity: Some(10.0),
            rate: Some(100.0),
        }]);

        let invoice = Invoice::derive(&form);
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.items[0].amount, 1000.0);
        assert_eq!(invoice.subtotal, 1000.0);
        assert_eq!(invoice.tax_amount, 80.0);
        assert_eq!(invoice.total, 1105.0);
    }

    #[test]
    fn derive_generates_a_name_when_none_is_supplied() {
        let mut form = form_with_items(vec![LineInput {
            description: "Consulting".to_string(),
            ..LineInput::default()
        }]);
        form.recipient.name = "Acme Corp".to_string();
        form.date = Some("2026-08-01".to_string());

        let invoice = Invoice::derive(&form);
        assert_eq!(invoice.invoice_name, "Consulting Acme Corp 2026-08-01");

        form.invoice_name = Some("Custom name".to_string());
        let invoice = Invoice::derive(&form);
        assert_eq!(invoice.invoice_name, "Custom name");
    }

    #[test]
    fn lenient_numbers_accept_strings_and_reject_garbage() {
        let item: LineInput =
            serde_json::from_str(r#"{"description":"x","quantity":"12","rate":"abc"}"#)
                .expect("lenient parse");
        assert_eq!(item.quantity, Some(12.0));
        assert_eq!(item.rate, None);
    }

    #[test]
    fn domain_validation_rejects_unknown_currency() {
        let mut form = form_with_items(vec![LineInput::default()]);
        form.currency = "BTC".to_string();
        let err = form.validate_domain().expect_err("currency must be known");
        assert!(matches!(
            err,
            AppError::ValidationError { field: Some(f), .. } if f == "currency"
        ));
    }

    #[test]
    fn domain_validation_rejects_oversized_logo() {
        let mut form = form_with_items(vec![LineInput::default()]);
        // ~6MB decoded equivalent.
        form.logo = Some(format!(
            "data:image/png;base64,{}",
            "A".repeat(8 * 1024 * 1024)
        ));
        let err = form.validate_domain().expect_err("logo too large");
        assert!(matches!(
            err,
            AppError::ValidationError { field: Some(f), .. } if f == "logo"
        ));
    }

    #[test]
    fn schema_validation_bounds_item_count() {
        let form = form_with_items(vec![LineInput::default(); 6]);
        assert!(form.validate().is_err());

        let form = form_with_items(Vec::new());
        assert!(form.validate().is_err());
    }
}
