//! # Seed Data Generator
//!
//! Populates a store's inventory with demo optical products for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default store
//! cargo run -p otica-db --bin seed
//!
//! # Custom store, database and variant count
//! cargo run -p otica-db --bin seed -- --store loja-centro --db ./data/otica.db --count 300
//! ```
//!
//! ## Generated Products
//! - Armações: frame models in several colors
//! - Lentes: lens types in several indices
//! - Solares: sunglasses models in several colors
//!
//! Each product has a code `{CAT}-{MODEL}-{VARIANT}`, a price and a stock
//! between 0 and 12. Every seventh product has no stock tracking.

use std::env;

use otica_core::{Category, Money, Product};
use otica_db::repository::product::generate_product_id;
use otica_db::{Database, DbConfig};

/// (category, code prefix, [(brand, model, base price in centavos)])
const CATALOG: &[(Category, &str, &[(&str, &str, i64)])] = &[
    (
        Category::Armacoes,
        "ARM",
        &[
            ("Ray-Ban", "Aviador RX", 54_900),
            ("Ray-Ban", "Clubmaster RX", 61_900),
            ("Oakley", "Crosslink", 58_900),
            ("Vogue", "Cat Eye VO", 38_900),
            ("Chilli Beans", "Quadrado Acetato", 24_900),
            ("Atitude", "Retangular Metal", 29_900),
            ("Prada", "Linea Rossa", 129_900),
            ("Tommy Hilfiger", "Redondo TH", 45_900),
        ],
    ),
    (
        Category::Lentes,
        "LEN",
        &[
            ("Zeiss", "Monofocal DuraVision", 42_000),
            ("Zeiss", "Progressiva SmartLife", 189_000),
            ("Essilor", "Varilux Comfort", 165_000),
            ("Essilor", "Crizal Sapphire", 68_000),
            ("Hoya", "Hilux Antirreflexo", 39_000),
            ("Hoya", "Blue Control", 52_000),
            ("Transitions", "Gen 8 Fotossensível", 98_000),
        ],
    ),
    (
        Category::Solares,
        "SOL",
        &[
            ("Ray-Ban", "Wayfarer", 69_900),
            ("Ray-Ban", "Erika", 59_900),
            ("Oakley", "Holbrook", 74_900),
            ("Oakley", "Frogskins", 64_900),
            ("Chilli Beans", "Espelhado", 19_900),
            ("Carrera", "Champion", 79_900),
        ],
    ),
];

/// Variant label and price add-on in centavos.
const VARIANTS: &[(&str, i64)] = &[
    ("Preto", 0),
    ("Tartaruga", 2_000),
    ("Dourado", 4_000),
    ("Azul", 1_000),
    ("1.50", 0),
    ("1.67", 15_000),
    ("1.74", 30_000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 150;
    let mut db_path = String::from("./otica_dev.db");
    let mut store_id = String::from("loja-01");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(150);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--store" | "-s" => {
                if i + 1 < args.len() {
                    store_id = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Otica POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 150)");
                println!("  -d, --db <PATH>    Database file path (default: ./otica_dev.db)");
                println!("  -s, --store <ID>   Store id (default: loja-01)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Otica POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Store:    {}", store_id);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let products = db.products();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = products.count(&store_id).await?;
    if existing > 0 {
        println!("⚠ Store already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let mut generated = 0;
    let start = std::time::Instant::now();

    'outer: for (category, prefix, models) in CATALOG {
        for (model_idx, (brand, model, base_price)) in models.iter().enumerate() {
            for (variant_idx, (variant, addon)) in VARIANTS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let product = generate_product(
                    &store_id,
                    *category,
                    prefix,
                    brand,
                    model,
                    variant,
                    base_price + addon,
                    model_idx * VARIANTS.len() + variant_idx,
                );

                if let Err(e) = products.upsert(&product).await {
                    eprintln!("Failed to insert {}: {}", product.title, e);
                    continue;
                }

                generated += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    println!();
    println!("Verifying search...");
    let matches = products.search(&store_id, &[], "ray-ban", 10).await?;
    println!("  Search 'ray-ban': {} results", matches.products.len());
    let matches = products.search(&store_id, &[Category::Lentes], "zeiss", 10).await?;
    println!("  Search 'zeiss' in lentes: {} results", matches.products.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a single product with deterministic demo data.
#[allow(clippy::too_many_arguments)]
fn generate_product(
    store_id: &str,
    category: Category,
    prefix: &str,
    brand: &str,
    model: &str,
    variant: &str,
    price_cents: i64,
    seed: usize,
) -> Product {
    let code = format!("{}-{:03}-{:02}", prefix, seed / VARIANTS.len(), seed % VARIANTS.len());
    let stock = if seed % 7 == 6 { None } else { Some((seed % 13) as i64) };

    Product {
        id: generate_product_id(),
        store_id: store_id.to_string(),
        category,
        title: format!("{} {}", model, variant),
        brand: Some(brand.to_string()),
        code: Some(code),
        sku: Some(format!("{}{:05}", prefix, seed)),
        price: Money::from_cents(price_cents),
        stock,
    }
}
