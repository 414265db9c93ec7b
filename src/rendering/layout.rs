/// Block layout of the invoice preview
///
/// Stacks the header, billing block, item table, totals, and payment box
/// vertically. Text metrics come from the 8x8 glyph cell, so every text run
/// is `8 * scale` pixels tall and `8 * scale` pixels per character wide.

use crate::currency::{display_amount, format_currency};
use crate::invoice::Invoice;
use crate::rendering::images::EmbeddedImage;
use crate::rendering::paint::{text_width, PaintCommand, Rgba, GLYPH_SIZE};
use crate::rendering::VisualNode;

const PADDING: u32 = 32;
const LOGO_SIZE: u32 = 160;
const LOGO_INSET: u32 = 4;
const SECTION_GAP: u32 = 48;
const ROW_PADDING: u32 = 16;
const MIN_WIDTH: u32 = 320;
const TITLE_LEFT: u32 = PADDING + LOGO_SIZE + SECTION_GAP / 2;

const BLACK: Rgba = (0, 0, 0, 255);
const WHITE: Rgba = (255, 255, 255, 255);
const TEAL: Rgba = (45, 212, 191, 255);
const BLUE: Rgba = (30, 64, 175, 255);
const RED: Rgba = (185, 28, 28, 255);
const GRAY_100: Rgba = (243, 244, 246, 255);
const GRAY_200: Rgba = (229, 231, 235, 255);
const GRAY_300: Rgba = (209, 213, 219, 255);

/// Presentation settings for the preview.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    /// Logo drawn in the top-left badge
    pub logo: Option<EmbeddedImage>,
    /// Text shown in the badge when there is no logo
    pub logo_alt: String,
    /// Lines of the payment information box; the box is omitted when empty
    pub payment_lines: Vec<String>,
    /// Currency code printed on the total line
    pub currency: String,
    /// Content width in CSS pixels
    pub width: u32,
    /// Minimum content height in CSS pixels (one A4 page at 96 dpi)
    pub min_height: u32,
    /// Whether the total line subtracts the discount line
    pub subtract_discount: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            logo: None,
            logo_alt: String::new(),
            payment_lines: Vec::new(),
            currency: "IDR".to_string(),
            width: 794,
            min_height: 1123,
            subtract_discount: false,
        }
    }
}

struct Columns {
    item_x: u32,
    item_chars: usize,
    quantity_center: u32,
    unit_price_right: u32,
    total_right: u32,
}

impl Columns {
    fn for_width(width: u32) -> Self {
        let inner = width - PADDING * 2;
        let item_w = inner * 40 / 100;
        Self {
            item_x: PADDING,
            item_chars: fit_chars(item_w, 2),
            quantity_center: PADDING + inner * 50 / 100,
            unit_price_right: PADDING + inner * 75 / 100,
            total_right: PADDING + inner,
        }
    }
}

fn text(node: &mut VisualNode, x: u32, y: u32, s: &str, scale: u32, rgba: Rgba) {
    if s.is_empty() {
        return;
    }
    node.push(PaintCommand::Text {
        x: x as i32,
        y: y as i32,
        text: s.to_string(),
        scale,
        rgba,
    });
}

fn text_right(node: &mut VisualNode, right: u32, y: u32, s: &str, scale: u32, rgba: Rgba) {
    let x = right.saturating_sub(text_width(s, scale));
    text(node, x, y, s, scale, rgba);
}

fn text_center(node: &mut VisualNode, center: u32, y: u32, s: &str, scale: u32, rgba: Rgba) {
    let x = center.saturating_sub(text_width(s, scale) / 2);
    text(node, x, y, s, scale, rgba);
}

fn rect(node: &mut VisualNode, x: u32, y: u32, width: u32, height: u32, rgba: Rgba) {
    node.push(PaintCommand::SolidRect {
        x: x as i32,
        y: y as i32,
        width,
        height,
        rgba,
    });
}

/// Characters of `scale` text that fit in `width` pixels, at least one.
fn fit_chars(width: u32, scale: u32) -> usize {
    ((width / (GLYPH_SIZE * scale)) as usize).max(1)
}

/// Greedy word wrap to `max_chars` per line; words longer than a line are split.
pub fn wrap_text(s: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in s.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !cur.is_empty() {
                lines.push(std::mem::take(&mut cur));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let cur_len = cur.chars().count();
        if cur_len + word.chars().count() + 1 > max_chars && !cur.is_empty() {
            lines.push(cur);
            cur = word;
        } else {
            if !cur.is_empty() {
                cur.push(' ');
            }
            cur.push_str(&word);
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

/// Render an invoice snapshot into a visual node.
pub fn render_invoice(invoice: &Invoice, options: &PreviewOptions) -> VisualNode {
    let width = options.width.max(MIN_WIDTH);
    let right = width - PADDING;
    let mut node = VisualNode::new(width, options.min_height);
    let mut y = PADDING;

    // Header: logo badge on the left, title block on the right.
    let badge_y = y + 16;
    rect(&mut node, PADDING, badge_y, LOGO_SIZE, LOGO_SIZE, BLACK);
    match &options.logo {
        Some(logo) => node.embed_image(
            logo.clone(),
            (PADDING + LOGO_INSET) as i32,
            (badge_y + LOGO_INSET) as i32,
            LOGO_SIZE - LOGO_INSET * 2,
            LOGO_SIZE - LOGO_INSET * 2,
        ),
        None => {
            for (i, line) in wrap_text(&options.logo_alt, (LOGO_SIZE / GLYPH_SIZE) as usize - 2)
                .iter()
                .enumerate()
            {
                text_center(
                    &mut node,
                    PADDING + LOGO_SIZE / 2,
                    badge_y + 60 + i as u32 * 12,
                    line,
                    1,
                    WHITE,
                );
            }
        }
    }

    // The title block stays right of the badge.
    let line_h = GLYPH_SIZE * 2 + 8;
    text_right(&mut node, right, y, "INVOICE", 5, TEAL);
    let mut title_y = y + GLYPH_SIZE * 5 + 12;
    let title_chars = fit_chars(right - TITLE_LEFT, 2);
    let number = format!("Invoice No. {}", invoice.invoice_number());
    for line in wrap_text(&number, title_chars) {
        text_right(&mut node, right, title_y, &line, 2, BLACK);
        title_y += line_h;
    }
    text_right(&mut node, right, title_y, &invoice.date().to_string(), 2, BLACK);
    title_y += GLYPH_SIZE * 2;
    y = (badge_y + LOGO_SIZE).max(title_y) + SECTION_GAP;

    // Billed to
    text(&mut node, PADDING, y, "BILLED TO:", 2, BLACK);
    y += GLYPH_SIZE * 2 + 12;
    let body_chars = fit_chars(right - PADDING, 2);
    for value in [invoice.customer_name(), invoice.customer_phone()] {
        let lines = wrap_text(value, body_chars);
        for line in &lines {
            text(&mut node, PADDING, y, line, 2, BLACK);
            y += line_h;
        }
        if lines.is_empty() {
            y += line_h;
        }
    }
    y += SECTION_GAP - 8;

    // Item table
    let cols = Columns::for_width(width);
    let row_text_h = GLYPH_SIZE * 2;
    y += 12;
    text(&mut node, cols.item_x, y, "Item", 2, BLACK);
    text_center(&mut node, cols.quantity_center, y, "Quantity", 2, BLACK);
    text_right(&mut node, cols.unit_price_right, y, "Unit Price", 2, BLACK);
    text_right(&mut node, cols.total_right, y, "Total", 2, BLACK);
    y += row_text_h + 12;
    rect(&mut node, PADDING, y, right - PADDING, 2, GRAY_300);
    y += 2;

    for item in invoice.items() {
        let lines = wrap_text(&item.description, cols.item_chars);
        let line_count = (lines.len() as u32).max(1);
        let top = y + ROW_PADDING;
        for (i, line) in lines.iter().enumerate() {
            text(&mut node, cols.item_x, top + i as u32 * (row_text_h + 4), line, 2, BLACK);
        }
        text_center(&mut node, cols.quantity_center, top, item.quantity.trim(), 2, BLACK);
        if !item.unit_price.trim().is_empty() {
            let price = format_currency(item.unit_price_value());
            text_right(&mut node, cols.unit_price_right, top, &price, 2, BLACK);
        }
        let total = item.total();
        if total != 0.0 {
            text_right(&mut node, cols.total_right, top, &format_currency(total), 2, BLACK);
        }
        y = top + line_count * (row_text_h + 4) - 4 + ROW_PADDING;
        rect(&mut node, PADDING, y, right - PADDING, 1, GRAY_200);
        y += 1;
    }

    if invoice.has_discount() {
        let top = y + ROW_PADDING;
        text(&mut node, cols.item_x, top, "Discount", 2, BLACK);
        let amount = format!("-{}", format_currency(invoice.total_discount()));
        text_right(&mut node, cols.total_right, top, &amount, 2, BLACK);
        y = top + row_text_h + ROW_PADDING;
        rect(&mut node, PADDING, y, right - PADDING, 1, GRAY_200);
        y += 1;
    }
    y += SECTION_GAP;

    // Total line
    let total = display_amount(&options.currency, invoice.payable_total(options.subtract_discount));
    text(&mut node, PADDING, y, "Total", 3, BLACK);
    text_right(&mut node, right, y, &total, 3, BLUE);
    y += GLYPH_SIZE * 3 + SECTION_GAP;

    text(&mut node, PADDING, y, "Thank You!", 3, BLACK);
    y += GLYPH_SIZE * 3 + SECTION_GAP;

    if !options.payment_lines.is_empty() {
        let box_padding = 24;
        let line_h = GLYPH_SIZE * 2 + 8;
        let box_h = box_padding * 2 + line_h + 4 + options.payment_lines.len() as u32 * line_h;
        rect(&mut node, PADDING, y, right - PADDING, box_h, GRAY_100);
        let mut by = y + box_padding;
        text(&mut node, PADDING + box_padding, by, "PAYMENT INFORMATION", 2, RED);
        by += line_h + 4;
        for line in &options.payment_lines {
            text(&mut node, PADDING + box_padding, by, line, 2, BLACK);
            by += line_h;
        }
        y += box_h;
    }

    node.set_height((y + PADDING).max(options.min_height));
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{HeaderField, LineItem};
    use crate::rendering::images::ImageOrigin;
    use chrono::NaiveDate;

    fn sample(items: Vec<LineItem>) -> Invoice {
        Invoice::from_items(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(), items)
            .unwrap()
            .set_header_field(HeaderField::CustomerName("Budi".into()))
            .set_header_field(HeaderField::CustomerPhone("0812".into()))
            .set_header_field(HeaderField::InvoiceNumber("INV-001".into()))
    }

    fn texts(node: &VisualNode) -> Vec<String> {
        node.commands()
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn renders_header_totals_and_rows() {
        let inv = sample(vec![LineItem::new("PPF Install", "2", "250000").with_discount("0")]);
        let node = render_invoice(&inv, &PreviewOptions::default());
        let t = texts(&node);
        assert!(t.contains(&"INVOICE".to_string()));
        assert!(t.contains(&"Invoice No. INV-001".to_string()));
        assert!(t.contains(&"2024-05-17".to_string()));
        assert!(t.contains(&"PPF Install".to_string()));
        assert!(t.contains(&"250.000".to_string()));
        assert!(t.contains(&"IDR 500.000.00".to_string()));
        assert!(!t.contains(&"Discount".to_string()));
        assert!(!t.contains(&"PAYMENT INFORMATION".to_string()));
        assert_eq!(node.scroll_width(), 794);
        assert_eq!(node.scroll_height(), 1123);
    }

    #[test]
    fn discount_row_is_cosmetic_by_default() {
        let inv = sample(vec![
            LineItem::new("A", "1", "10000").with_discount("1000"),
            LineItem::new("B", "1", "10000"),
        ]);
        let t = texts(&render_invoice(&inv, &PreviewOptions::default()));
        assert!(t.contains(&"Discount".to_string()));
        assert!(t.contains(&"-1.000".to_string()));
        assert!(t.contains(&"IDR 20.000.00".to_string()));

        let opts = PreviewOptions {
            subtract_discount: true,
            ..Default::default()
        };
        let t = texts(&render_invoice(&inv, &opts));
        assert!(t.contains(&"IDR 19.000.00".to_string()));
    }

    #[test]
    fn blank_amounts_are_not_printed() {
        let inv = sample(vec![LineItem::new("Consultation", "", "")]);
        let t = texts(&render_invoice(&inv, &PreviewOptions::default()));
        assert!(t.contains(&"Consultation".to_string()));
        assert!(t.contains(&"IDR 0.00".to_string()));
        assert!(!t.iter().any(|s| s == "0"));
    }

    #[test]
    fn long_content_grows_past_min_height() {
        let items = (0..40)
            .map(|i| LineItem::new(format!("Item {}", i), "1", "1000"))
            .collect();
        let node = render_invoice(&sample(items), &PreviewOptions::default());
        assert!(node.scroll_height() > 1123);
    }

    #[test]
    fn logo_and_payment_box_are_placed() {
        let logo = EmbeddedImage::failed("logo.png", "missing");
        let opts = PreviewOptions {
            logo: Some(logo),
            payment_lines: vec!["BCA 123".into()],
            ..Default::default()
        };
        let node = render_invoice(&sample(vec![LineItem::new("A", "1", "1")]), &opts);
        assert_eq!(node.images().len(), 1);
        assert_eq!(node.images()[0].origin(), ImageOrigin::Local);
        let t = texts(&node);
        assert!(t.contains(&"PAYMENT INFORMATION".to_string()));
        assert!(t.contains(&"BCA 123".to_string()));
    }

    #[test]
    fn long_header_values_wrap_inside_the_page() {
        let inv = sample(vec![LineItem::new("A", "1", "1")])
            .set_header_field(HeaderField::InvoiceNumber("INV-2024-05-17-BRANCH-JAKARTA-SELATAN-0001".into()))
            .set_header_field(HeaderField::CustomerName(
                "PT Sumber Rejeki Makmur Sentosa Abadi Jaya Kendaraan Bermotor Indonesia".into(),
            ))
            .set_header_field(HeaderField::CustomerPhone("0".repeat(60)));
        let opts = PreviewOptions::default();
        let node = render_invoice(&inv, &opts);
        let badge_bottom = PADDING + 16 + LOGO_SIZE;

        let mut number_lines = 0;
        for cmd in node.commands() {
            if let PaintCommand::Text { x, y, text, scale, .. } = cmd {
                let x = *x as u32;
                assert!(x >= PADDING, "{:?} starts left of the margin", text);
                assert!(
                    x + text_width(text, *scale) <= opts.width - PADDING,
                    "{:?} runs past the right margin",
                    text
                );
                if *scale == 2 && (*y as u32) < badge_bottom {
                    assert!(x >= TITLE_LEFT, "{:?} overlaps the logo badge", text);
                    number_lines += 1;
                }
            }
        }
        // Two lines of invoice number plus the date.
        assert!(number_lines >= 3);
        assert!(texts(&node).contains(&"PT Sumber Rejeki Makmur Sentosa Abadi Jaya".to_string()));
    }

    #[test]
    fn wrap_text_splits_words_and_long_tokens() {
        assert_eq!(wrap_text("hello big world", 9), vec!["hello big", "world"]);
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", 4).is_empty());
    }
}
