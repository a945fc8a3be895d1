use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Date, Duration, OffsetDateTime};

use temple_ledger::{
    Email, PasswordHash, RecordFields, TransactionKind, count_records, create_user, initialize_db,
    insert_record,
};

/// A utility for creating a test database for the temple_ledger server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The email address of the demo user.
    #[arg(long, default_value = "test@example.com")]
    email: String,

    /// The password of the demo user.
    #[arg(long, default_value = "test1234")]
    password: String,
}

/// Sample rows as (kind, days ago, label, amount, notes).
const SAMPLE_ROWS: [(TransactionKind, i64, &str, f64, Option<&str>); 10] = [
    (TransactionKind::Income, 1, "Donation", 5_000.0, None),
    (TransactionKind::Income, 3, "Hundi", 12_450.5, Some("Weekly count")),
    (TransactionKind::Income, 7, "Pooja Booking", 2_100.0, None),
    (TransactionKind::Income, 12, "Donation", 25_000.0, Some("Festival")),
    (TransactionKind::Income, 20, "Prasadam Sales", 3_380.0, None),
    (TransactionKind::Expense, 2, "Flowers", 850.0, None),
    (TransactionKind::Expense, 5, "Electricity", 4_200.0, Some("Monthly bill")),
    (TransactionKind::Expense, 9, "Maintenance", 7_500.0, Some("Roof repair")),
    (TransactionKind::Expense, 14, "Priest Honorarium", 15_000.0, None),
    (TransactionKind::Expense, 21, "Flowers", 920.0, None),
];

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

    println!("Creating test user {}...", args.email);

    let password_hash =
        PasswordHash::from_raw_password(&args.password, PasswordHash::DEFAULT_COST)?;
    let user = create_user(Email::new(&args.email)?, password_hash, &conn)?;

    println!("Adding sample transactions...");

    let today = OffsetDateTime::now_utc().date();
    for (kind, days_ago, label, amount, notes) in SAMPLE_ROWS {
        insert_record(
            kind,
            &RecordFields {
                date: days_before(today, days_ago),
                category_label: label.to_owned(),
                amount,
                notes: notes.map(str::to_owned),
            },
            user.id,
            &conn,
        )?;
    }

    println!(
        "Added {} income and {} expense rows.",
        count_records(TransactionKind::Income, user.id, &conn)?,
        count_records(TransactionKind::Expense, user.id, &conn)?
    );
    println!("Success!");

    Ok(())
}

fn days_before(date: Date, days: i64) -> Date {
    date.checked_sub(Duration::days(days)).unwrap_or(date)
}
