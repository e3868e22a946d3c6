use chrono::{DateTime, NaiveDate, Utc};
use lopdf::{
    Document, Object, Stream,
    content::{Content, Operation},
    dictionary,
};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// Everything the renderer needs; read from the store once, after the order is final.
#[derive(Debug, Clone)]
pub struct InvoiceSnapshot {
    pub order_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub delivery_date: NaiveDate,
    pub contractor_name: String,
    pub items: Vec<InvoiceLine>,
}

impl InvoiceSnapshot {
    pub fn grand_total(&self) -> Decimal {
        self.items.iter().map(|item| item.total).sum()
    }
}

pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, snapshot: &InvoiceSnapshot) -> anyhow::Result<Vec<u8>>;
}

// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 57;
const ROW_HEIGHT: i64 = 18;
const NAME_COLUMN_CHARS: usize = 40;
const COLUMNS: [i64; 4] = [MARGIN, 330, 400, 480];

/// Renders with the PDF standard fonts, so no font files are needed.
pub struct PdfInvoiceRenderer;

impl InvoiceRenderer for PdfInvoiceRenderer {
    fn render(&self, snapshot: &InvoiceSnapshot) -> anyhow::Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular_id,
                "F2" => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for operations in layout_pages(snapshot) {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let page_count = kids.len() as i64;
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

fn layout_pages(snapshot: &InvoiceSnapshot) -> Vec<Vec<Operation>> {
    let mut pages = Vec::new();
    let mut ops = Vec::new();

    let mut y = PAGE_HEIGHT - MARGIN - 20;
    text(&mut ops, "F2", 20, MARGIN, y, &format!("Order {}", snapshot.order_id));
    y -= 10;
    rule(&mut ops, y);
    y -= 24;
    let date = snapshot.created_at.format("%Y-%m-%d %H:%M UTC").to_string();
    text(&mut ops, "F1", 11, MARGIN, y, &format!("Date: {date}"));
    y -= ROW_HEIGHT;
    text(
        &mut ops,
        "F1",
        11,
        MARGIN,
        y,
        &format!("Delivery date: {}", snapshot.delivery_date),
    );
    y -= ROW_HEIGHT;
    text(
        &mut ops,
        "F1",
        11,
        MARGIN,
        y,
        &format!("Contractor: {}", snapshot.contractor_name),
    );
    y -= 2 * ROW_HEIGHT;
    y = table_header(&mut ops, y);

    for item in &snapshot.items {
        if y < MARGIN + ROW_HEIGHT {
            pages.push(std::mem::take(&mut ops));
            y = table_header(&mut ops, PAGE_HEIGHT - MARGIN - ROW_HEIGHT);
        }
        let cells = [
            truncate(&item.name, NAME_COLUMN_CHARS),
            item.quantity.to_string(),
            item.price.to_string(),
            item.total.to_string(),
        ];
        for (x, cell) in COLUMNS.iter().zip(cells.iter()) {
            text(&mut ops, "F1", 10, *x, y, cell);
        }
        y -= ROW_HEIGHT;
    }

    if y < MARGIN + 2 * ROW_HEIGHT {
        pages.push(std::mem::take(&mut ops));
        y = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
    }
    rule(&mut ops, y + ROW_HEIGHT - 4);
    y -= 6;
    text(
        &mut ops,
        "F2",
        14,
        COLUMNS[2],
        y,
        &format!("Total: {}", snapshot.grand_total()),
    );
    pages.push(ops);
    pages
}

fn table_header(ops: &mut Vec<Operation>, y: i64) -> i64 {
    for (x, label) in COLUMNS.iter().zip(["Item", "Quantity", "Price", "Total"]) {
        text(ops, "F2", 10, *x, y, label);
    }
    rule(ops, y - 6);
    y - ROW_HEIGHT - 4
}

fn text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(win_ansi(value))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn rule(ops: &mut Vec<Operation>, y: i64) {
    ops.push(Operation::new("w", vec![Object::Integer(1)]));
    ops.push(Operation::new("m", vec![MARGIN.into(), y.into()]));
    ops.push(Operation::new("l", vec![(PAGE_WIDTH - MARGIN).into(), y.into()]));
    ops.push(Operation::new("S", vec![]));
}

/// Standard fonts only cover Latin-1; anything else prints as '?'.
fn win_ansi(value: &str) -> Vec<u8> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut short: String = value.chars().take(max_chars - 3).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(item_count: usize) -> InvoiceSnapshot {
        InvoiceSnapshot {
            order_id: Uuid::new_v4(),
            created_at: Utc::now(),
            delivery_date: NaiveDate::from_ymd_opt(2030, 1, 31).unwrap(),
            contractor_name: "Acme Supplies".into(),
            items: (0..item_count)
                .map(|i| InvoiceLine {
                    name: format!("Item {i}"),
                    quantity: 2,
                    price: Decimal::new(1000, 2),
                    total: Decimal::new(2000, 2),
                })
                .collect(),
        }
    }

    #[test]
    fn renders_a_loadable_pdf() {
        let bytes = PdfInvoiceRenderer.render(&snapshot(3)).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_orders_continue_on_new_pages() {
        let bytes = PdfInvoiceRenderer.render(&snapshot(120)).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 3);
    }

    #[test]
    fn grand_total_sums_item_totals() {
        assert_eq!(snapshot(3).grand_total(), Decimal::new(6000, 2));
    }

    #[test]
    fn text_outside_latin1_is_replaced() {
        assert_eq!(win_ansi("Caf\u{e9} \u{416}"), vec![b'C', b'a', b'f', 0xE9, b' ', b'?']);
        assert_eq!(truncate("abcdefgh", 6), "abc...");
    }
}
