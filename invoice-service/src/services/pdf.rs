//! Invoice PDF rendering.
//!
//! A single-page text layout is all the service needs: the PDF exists to be
//! attached to an email or handed back to the browser. Amounts are printed
//! with the currency code rather than the symbol to stay within the base
//! font's encoding.

use crate::models::invoice::Invoice;
use crate::services::providers::ProviderError;
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

pub trait PdfRenderer: Send + Sync {
    fn render(&self, invoice: &Invoice) -> Result<Vec<u8>, ProviderError>;
}

pub struct InvoicePdfRenderer;

impl PdfRenderer for InvoicePdfRenderer {
    fn render(&self, invoice: &Invoice) -> Result<Vec<u8>, ProviderError> {
        render_invoice_pdf(invoice)
    }
}

/// Letter-size page, origin bottom-left.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 48;

struct PageText {
    operations: Vec<Operation>,
    cursor_y: i64,
}

impl PageText {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text_at(&mut self, x: i64, y: i64, font: &str, size: i64, text: &str) {
        self.operations.push(Operation::new("BT", vec![]));
        self.operations
            .push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.operations
            .push(Operation::new("Td", vec![x.into(), y.into()]));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(latin1_bytes(text), StringFormat::Literal)],
        ));
        self.operations.push(Operation::new("ET", vec![]));
    }

    fn line(&mut self, font: &str, size: i64, text: &str) {
        self.cursor_y -= size + 6;
        self.text_at(MARGIN, self.cursor_y, font, size, text);
    }

    fn row(&mut self, font: &str, size: i64, left: &str, right: &str) {
        self.cursor_y -= size + 6;
        self.text_at(MARGIN, self.cursor_y, font, size, left);
        self.text_at(PAGE_WIDTH - MARGIN - 160, self.cursor_y, font, size, right);
    }

    fn gap(&mut self, height: i64) {
        self.cursor_y -= height;
    }
}

/// Encode text as Latin-1 bytes for the base-14 fonts; anything outside the
/// range is replaced.
fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF { code as u8 } else { b'?' }
        })
        .collect()
}

fn money(amount: f64, code: &str) -> String {
    format!("{:.2} {}", amount, code)
}

fn company_lines(prefix: &str, company: &crate::models::invoice::Company) -> Vec<String> {
    let mut lines = vec![format!("{}: {}", prefix, company.name)];
    if !company.address.is_empty() {
        lines.push(format!("  {}", company.address));
    }
    let locality: Vec<&str> = [
        company.city.as_str(),
        company.state.as_str(),
        company.postal_code.as_str(),
        company.country.as_str(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect();
    if !locality.is_empty() {
        lines.push(format!("  {}", locality.join(", ")));
    }
    if !company.email.is_empty() {
        lines.push(format!("  {}", company.email));
    }
    lines
}

fn render_invoice_pdf(invoice: &Invoice) -> Result<Vec<u8>, ProviderError> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();

    let regular_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_font,
            "F2" => bold_font,
        },
    });

    let mut page = PageText::new();

    page.line("F2", 20, "INVOICE");
    page.line("F1", 11, &format!("Invoice #: {}", invoice.display_number()));
    page.line("F1", 11, &invoice.invoice_name);
    if let Some(date) = invoice.date.as_deref() {
        page.line("F1", 10, &format!("Issue date: {}", date));
    }
    if let Some(due) = invoice.due_date.as_deref() {
        page.line("F1", 10, &format!("Due date: {}", due));
    }

    page.gap(14);
    for line in company_lines("From", &invoice.sender) {
        page.line("F1", 10, &line);
    }
    page.gap(8);
    for line in company_lines("To", &invoice.recipient) {
        page.line("F1", 10, &line);
    }

    page.gap(18);
    page.row("F2", 11, "Description", "Amount");
    for item in &invoice.items {
        page.row(
            "F1",
            10,
            &format!("{} ({} x {})", item.description, item.quantity, item.rate),
            &money(item.amount, &invoice.currency),
        );
    }

    page.gap(12);
    page.row("F1", 10, "Subtotal", &money(invoice.subtotal, &invoice.currency));
    page.row(
        "F1",
        10,
        &format!("Tax ({}%)", invoice.tax_rate),
        &money(invoice.tax_amount, &invoice.currency),
    );
    if let Some(shipping) = invoice.shipping {
        page.row("F1", 10, "Shipping", &money(shipping, &invoice.currency));
    }
    page.row("F2", 12, "Total", &money(invoice.total, &invoice.currency));

    if let Some(notes) = invoice.notes.as_deref().filter(|n| !n.is_empty()) {
        page.gap(16);
        page.line("F2", 10, "Notes");
        page.line("F1", 10, notes);
    }
    if let Some(instructions) = invoice
        .payment_instructions
        .as_deref()
        .filter(|p| !p.is_empty())
    {
        page.gap(8);
        page.line("F2", 10, "Payment Instructions");
        page.line("F1", 10, instructions);
    }

    page.gap(24);
    page.line(
        "F1",
        8,
        &format!("Generated {}", Utc::now().format("%Y-%m-%d")),
    );

    let content = Content {
        operations: page.operations,
    };
    let encoded = content
        .encode()
        .map_err(|e| ProviderError::RenderFailed(format!("Failed to encode content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ProviderError::RenderFailed(format!("Failed to serialize PDF: {}", e)))?;

    Ok(buffer)
}

/// Mock renderer that produces a buffer of a fixed size, for exercising the
/// attachment size ceiling.
pub struct FixedSizePdfRenderer {
    pub size: usize,
}

impl PdfRenderer for FixedSizePdfRenderer {
    fn render(&self, _invoice: &Invoice) -> Result<Vec<u8>, ProviderError> {
        let mut bytes = vec![0u8; self.size];
        let header = b"%PDF-1.5";
        let len = header.len().min(bytes.len());
        bytes[..len].copy_from_slice(&header[..len]);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{InvoiceForm, LineInput};

    #[test]
    fn renders_a_parseable_pdf() {
        let form = InvoiceForm {
            invoice_number: Some("INV-1".to_string()),
            items: vec![LineInput {
                description: "Consulting".to_string(),
                issue_date: None,
                quantity: Some(10.0),
                rate: Some(100.0),
            }],
            tax_rate: Some(8.0),
            shipping: Some(25.0),
            ..InvoiceForm::default()
        };
        let invoice = Invoice::derive(&form);

        let bytes = InvoicePdfRenderer.render(&invoice).expect("render");
        assert!(bytes.starts_with(b"%PDF-1.5"));
        // Round-trips through the parser.
        let parsed = Document::load_mem(&bytes).expect("parse rendered pdf");
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn non_latin_text_is_replaced_not_fatal() {
        assert_eq!(latin1_bytes("abc"), b"abc".to_vec());
        assert_eq!(latin1_bytes("\u{20ac}"), vec![b'?']);
    }
}
