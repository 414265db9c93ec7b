//! Invoice model
//!
//! An [`Invoice`] is an immutable value: every edit returns a new snapshot and
//! leaves the receiver untouched. Numeric line-item fields keep the raw form
//! input and are coerced on read, so an empty or malformed entry counts as
//! zero instead of poisoning the totals.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque line-item identity, unique for the lifetime of the process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    /// Allocate a fresh id. Ids are never reused.
    pub fn next() -> Self {
        Self(NEXT_ITEM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "item-{}", self.0)
    }
}

/// Coerce raw numeric input the way the form does: blank is zero, and
/// anything unparsable or non-finite is normalized to zero.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// One billable row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(skip, default = "ItemId::next")]
    id: ItemId,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "numeric_input")]
    pub quantity: String,
    #[serde(default, deserialize_with = "numeric_input")]
    pub unit_price: String,
    /// Optional; blank means no discount.
    #[serde(default, deserialize_with = "numeric_input")]
    pub discount: String,
}

impl LineItem {
    /// A blank row with a freshly allocated id.
    pub fn blank() -> Self {
        Self {
            id: ItemId::next(),
            description: String::new(),
            quantity: String::new(),
            unit_price: String::new(),
            discount: String::new(),
        }
    }

    pub fn new(
        description: impl Into<String>,
        quantity: impl Into<String>,
        unit_price: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            quantity: quantity.into(),
            unit_price: unit_price.into(),
            ..Self::blank()
        }
    }

    pub fn with_discount(mut self, discount: impl Into<String>) -> Self {
        self.discount = discount.into();
        self
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn quantity_value(&self) -> f64 {
        coerce_number(&self.quantity)
    }

    pub fn unit_price_value(&self) -> f64 {
        coerce_number(&self.unit_price)
    }

    pub fn discount_value(&self) -> f64 {
        coerce_number(&self.discount)
    }

    /// `quantity × unit_price`. The discount is not subtracted here.
    pub fn total(&self) -> f64 {
        let total = self.quantity_value() * self.unit_price_value();
        if total.is_finite() {
            total
        } else {
            0.0
        }
    }

    fn apply(&mut self, field: ItemField) {
        match field {
            ItemField::Description(v) => self.description = v,
            ItemField::Quantity(v) => self.quantity = v,
            ItemField::UnitPrice(v) => self.unit_price = v,
            ItemField::Discount(v) => self.discount = v,
        }
    }
}

/// A single line-item field replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemField {
    Description(String),
    Quantity(String),
    UnitPrice(String),
    Discount(String),
}

/// A single header field replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderField {
    CustomerName(String),
    CustomerPhone(String),
    InvoiceNumber(String),
    Date(NaiveDate),
}

/// Invoice snapshot: customer, metadata and at least one line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawInvoice")]
pub struct Invoice {
    customer_name: String,
    customer_phone: String,
    invoice_number: String,
    date: NaiveDate,
    items: Vec<LineItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInvoice {
    #[serde(default)]
    customer_name: String,
    #[serde(default)]
    customer_phone: String,
    #[serde(default)]
    invoice_number: String,
    date: NaiveDate,
    #[serde(default)]
    items: Vec<LineItem>,
}

impl TryFrom<RawInvoice> for Invoice {
    type Error = Error;

    fn try_from(raw: RawInvoice) -> Result<Self> {
        let invoice = Invoice::from_items(raw.date, raw.items)?;
        Ok(invoice
            .set_header_field(HeaderField::CustomerName(raw.customer_name))
            .set_header_field(HeaderField::CustomerPhone(raw.customer_phone))
            .set_header_field(HeaderField::InvoiceNumber(raw.invoice_number)))
    }
}

impl Invoice {
    /// A fresh invoice as the form opens: blank header, one blank item.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            customer_name: String::new(),
            customer_phone: String::new(),
            invoice_number: String::new(),
            date,
            items: vec![LineItem::blank()],
        }
    }

    /// Build an invoice around existing rows. Fails when `items` is empty.
    pub fn from_items(date: NaiveDate, items: Vec<LineItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(Error::Validation(
                "an invoice needs at least one line item".into(),
            ));
        }
        Ok(Self {
            items,
            ..Self::new(date)
        })
    }

    /// Parse a JSON draft (camelCase keys, numbers or strings for amounts).
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Validation(format!("invalid draft: {}", e)))
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_phone(&self) -> &str {
        &self.customer_phone
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Items in display (insertion) order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn add_item(&self) -> Self {
        let mut next = self.clone();
        next.items.push(LineItem::blank());
        next
    }

    /// Remove the matching item. Removing the last remaining item, or an
    /// unknown id, returns an unchanged copy.
    pub fn remove_item(&self, id: ItemId) -> Self {
        if self.items.len() <= 1 {
            return self.clone();
        }
        let mut next = self.clone();
        next.items.retain(|i| i.id != id);
        next
    }

    pub fn update_item(&self, id: ItemId, field: ItemField) -> Self {
        let mut next = self.clone();
        if let Some(item) = next.items.iter_mut().find(|i| i.id == id) {
            item.apply(field);
        }
        next
    }

    pub fn set_header_field(&self, field: HeaderField) -> Self {
        let mut next = self.clone();
        match field {
            HeaderField::CustomerName(v) => next.customer_name = v,
            HeaderField::CustomerPhone(v) => next.customer_phone = v,
            HeaderField::InvoiceNumber(v) => next.invoice_number = v,
            HeaderField::Date(d) => next.date = d,
        }
        next
    }

    /// Sum of `quantity × unit_price` over all items, before discounts.
    pub fn grand_total(&self) -> f64 {
        self.items.iter().map(LineItem::total).sum()
    }

    pub fn total_discount(&self) -> f64 {
        self.items.iter().map(LineItem::discount_value).sum()
    }

    /// Whether the discount line should be shown.
    pub fn has_discount(&self) -> bool {
        self.items
            .iter()
            .any(|i| !i.discount.trim().is_empty() && i.discount_value() != 0.0)
    }

    /// Amount shown on the total line. The discount line is cosmetic unless
    /// `subtract_discount` is set.
    pub fn payable_total(&self, subtract_discount: bool) -> f64 {
        if subtract_discount {
            self.grand_total() - self.total_discount()
        } else {
            self.grand_total()
        }
    }

    /// Required-field check performed before switching to the preview.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("customer name", &self.customer_name),
            ("customer phone", &self.customer_phone),
            ("invoice number", &self.invoice_number),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{} is required", name)));
            }
        }

        for (idx, item) in self.items.iter().enumerate() {
            let fields = [
                ("description", &item.description),
                ("quantity", &item.quantity),
                ("unit price", &item.unit_price),
            ];
            for (name, value) in fields {
                if value.trim().is_empty() {
                    return Err(Error::Validation(format!(
                        "item {}: {} is required",
                        idx + 1,
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    /// `Invoice-<invoice number>.pdf`, with path separators flattened.
    pub fn export_filename(&self) -> String {
        export_filename(&self.invoice_number)
    }
}

pub(crate) fn export_filename(invoice_number: &str) -> String {
    let safe: String = invoice_number
        .chars()
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    format!("Invoice-{}.pdf", safe)
}

fn numeric_input<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumeric {
        Text(String),
        Number(f64),
    }

    Ok(match Option::<RawNumeric>::deserialize(deserializer)? {
        Some(RawNumeric::Text(s)) => s,
        Some(RawNumeric::Number(n)) => n.to_string(),
        None => String::new(),
    })
}
