use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use invoicer::rendering::layout::{render_invoice, PreviewOptions};
use invoicer::rendering::raster::{RasterOptions, Rasterizer, SoftwareRasterizer};
use invoicer::{ExportConfig, HeaderField, Invoice, LineItem};

fn sample(rows: usize) -> Invoice {
    let items = (0..rows)
        .map(|i| LineItem::new(format!("Window film {}", i), "2", "250000"))
        .collect();
    Invoice::from_items(NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(), items)
        .unwrap()
        .set_header_field(HeaderField::CustomerName("Budi Santoso".into()))
        .set_header_field(HeaderField::InvoiceNumber("INV-001".into()))
}

fn bench_layout(c: &mut Criterion) {
    let invoice = sample(10);
    let opts = PreviewOptions::default();
    c.bench_function("render_invoice_10_rows", |b| {
        b.iter(|| render_invoice(black_box(&invoice), &opts))
    });
}

fn bench_rasterize(c: &mut Criterion) {
    let node = render_invoice(&sample(10), &PreviewOptions::default());
    let raster = RasterOptions::for_node(&node, &ExportConfig::default());
    let rasterizer = SoftwareRasterizer::new();
    c.bench_function("rasterize_a4_2x", |b| {
        b.iter(|| rasterizer.render(black_box(&node), &raster).unwrap())
    });
}

criterion_group!(benches, bench_layout, bench_rasterize);
criterion_main!(benches);
