use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use cart_rs::{CartForm, HeaderForm, ItemForm, UserForm, create_or_upsert_statement, initialize_db};

/// A utility for creating a test database for the REST API server of cart_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating unscoped statement 012025...");
    create_or_upsert_statement(&demo_statement("012025", None), &conn)?;

    println!("Creating statement 022025 for test@example.com...");
    create_or_upsert_statement(&demo_statement("022025", Some("test@example.com")), &conn)?;

    println!("Success!");

    Ok(())
}

fn demo_statement(reference: &str, email: Option<&str>) -> CartForm {
    let month = &reference[..2];
    let year = &reference[2..];
    let item = |day: &str, description: &str, value: f64, classification: &str| ItemForm {
        date: format!("{day}/{month}/{year}"),
        description: description.to_owned(),
        value,
        classification: classification.to_owned(),
    };

    let items = vec![
        item("05", "Supermercado", 512.35, "Alimentação"),
        item("09", "Combustível", 230.00, "Transporte"),
        item("14", "Farmácia", 87.90, "Saúde"),
        item("21", "Cinema", 64.00, "Lazer"),
    ];

    CartForm {
        header: HeaderForm {
            reference: reference.to_owned(),
            total_value: items.iter().map(|item| item.value).sum(),
        },
        user: email.map(|email| UserForm {
            name: "Test User".to_owned(),
            email: email.to_owned(),
        }),
        items,
    }
}
