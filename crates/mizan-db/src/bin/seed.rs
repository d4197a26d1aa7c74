//! # Seed Data Generator
//!
//! Populates a development database with a small shop.
//!
//! ## Usage
//! ```bash
//! cargo run -p mizan-db --bin seed
//! cargo run -p mizan-db --bin seed -- --db ./data/mizan.db --sales 50
//! ```
//!
//! ## Generated Data
//! - One category per department, products in each
//! - A handful of customers and suppliers
//! - Opening purchases (credit, from suppliers) and a stream of sales,
//!   every third one on credit, all through the invoice processor

use std::env;

use mizan_core::invoice::{DraftLine, InvoiceDraft};
use mizan_core::{InvoiceType, PaymentMethod, Product};
use mizan_db::{Database, DbConfig, NewCategory, NewParty, NewProduct};

/// (category, colour, [(name, price_cents, unit)])
const CATALOG: &[(&str, &str, &[(&str, i64, &str)])] = &[
    (
        "Beverages",
        "#0ea5e9",
        &[
            ("Green Tea 250g", 450, "box"),
            ("Black Tea 500g", 780, "box"),
            ("Instant Coffee 100g", 650, "jar"),
            ("Mineral Water 1.5L", 90, "bottle"),
            ("Orange Juice 1L", 320, "pack"),
        ],
    ),
    (
        "Grocery",
        "#22c55e",
        &[
            ("Basmati Rice 5kg", 2450, "bag"),
            ("Chickpeas 1kg", 410, "bag"),
            ("Red Lentils 1kg", 380, "bag"),
            ("Sunflower Oil 3L", 1890, "bottle"),
            ("Sugar 1kg", 160, "bag"),
            ("Flour 10kg", 1500, "bag"),
        ],
    ),
    (
        "Dairy",
        "#f59e0b",
        &[
            ("Fresh Milk 1L", 220, "pack"),
            ("Yogurt 500g", 180, "tub"),
            ("Butter 200g", 560, "pack"),
            ("Cheddar 400g", 990, "pack"),
        ],
    ),
    (
        "Household",
        "#a855f7",
        &[
            ("Dish Soap 750ml", 350, "bottle"),
            ("Laundry Powder 2kg", 1120, "bag"),
            ("Tissue Box", 140, "box"),
        ],
    ),
];

const CUSTOMERS: &[&str] = &["Ayesha Khan", "Bilal Ahmed", "Sara Malik", "Omar Farooq"];
const SUPPLIERS: &[&str] = &["Metro Wholesale", "Green Valley Dairy"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sales: usize = 30;
    let mut db_path = String::from("./mizan_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(30);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mizan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sale invoices to generate (default: 30)");
                println!("  -d, --db <PATH>    Database file path (default: ./mizan_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mizan Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    // ---- catalog ---------------------------------------------------------
    let mut products: Vec<Product> = Vec::new();
    for (dept_idx, (category, color, items)) in CATALOG.iter().enumerate() {
        let category = db
            .categories()
            .create(&NewCategory {
                name: category.to_string(),
                description: None,
                color: Some(color.to_string()),
                parent_id: None,
            })
            .await?;

        for (item_idx, (name, price_cents, unit)) in items.iter().enumerate() {
            let seed = dept_idx * 10 + item_idx;
            let input = NewProduct {
                name: name.to_string(),
                description: None,
                sku: format!("{}-{:03}", &category.name[..3].to_uppercase(), seed),
                barcode: Some(format!("590{:010}", seed)),
                category_id: Some(category.id.clone()),
                price_cents: *price_cents,
                // 60-80% of price
                cost_cents: price_cents * (60 + (seed % 20) as i64) / 100,
                quantity: 0,
                min_quantity: 5 + (seed % 6) as i64,
                unit: Some(unit.to_string()),
            };

            match db.products().create(&input).await {
                Ok(product) => products.push(product),
                Err(e) => eprintln!("Failed to insert {}: {}", input.sku, e),
            }
        }
    }
    println!("✓ {} products in {} categories", products.len(), CATALOG.len());
    if products.is_empty() {
        return Err("no products were created".into());
    }

    // ---- parties ---------------------------------------------------------
    let mut customer_ids = Vec::new();
    for name in CUSTOMERS {
        let customer = db.customers().create(&party(name)).await?;
        customer_ids.push(customer.id);
    }
    let mut supplier_ids = Vec::new();
    for name in SUPPLIERS {
        let supplier = db.suppliers().create(&party(name)).await?;
        supplier_ids.push(supplier.id);
    }
    println!(
        "✓ {} customers, {} suppliers",
        customer_ids.len(),
        supplier_ids.len()
    );

    // ---- opening stock: one credit purchase per supplier -----------------
    for (s_idx, supplier_id) in supplier_ids.iter().enumerate() {
        let lines: Vec<DraftLine> = products
            .iter()
            .enumerate()
            .filter(|(p_idx, _)| p_idx % supplier_ids.len() == s_idx)
            .map(|(p_idx, p)| DraftLine::new(&p.id, &p.name, 20 + (p_idx % 15) as i64, p.cost_cents))
            .collect();

        let draft = InvoiceDraft {
            invoice_type: InvoiceType::Purchase,
            customer_id: None,
            supplier_id: Some(supplier_id.clone()),
            payment_method: PaymentMethod::Credit,
            discount_cents: 0,
            amount_paid_cents: Some(0),
            notes: Some("Opening stock".into()),
            items: lines,
        };
        db.processor().process(&draft, Some("seed")).await?;
    }
    println!("✓ Opening stock purchased");

    // ---- sales -----------------------------------------------------------
    let start = std::time::Instant::now();
    let mut generated = 0;
    for n in 0..sales {
        let lines: Vec<DraftLine> = (0..1 + n % 3)
            .map(|k| &products[(n * 7 + k * 3) % products.len()])
            .map(|p| DraftLine::new(&p.id, &p.name, 1 + (n % 4) as i64, p.price_cents))
            .collect();

        let on_credit = n % 3 == 2;
        let draft = InvoiceDraft {
            invoice_type: InvoiceType::Sale,
            customer_id: on_credit.then(|| customer_ids[n % customer_ids.len()].clone()),
            supplier_id: None,
            payment_method: if on_credit {
                PaymentMethod::Credit
            } else {
                PaymentMethod::Cash
            },
            discount_cents: 0,
            amount_paid_cents: on_credit.then_some(0),
            notes: None,
            items: lines,
        };

        match db.processor().process(&draft, Some("seed")).await {
            Ok(_) => generated += 1,
            Err(e) => eprintln!("Failed to process sale {}: {}", n, e),
        }
    }

    println!("✓ {} sales in {:?}", generated, start.elapsed());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn party(name: &str) -> NewParty {
    NewParty {
        name: name.to_string(),
        phone: None,
        email: None,
        address: None,
    }
}
