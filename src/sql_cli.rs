//! Interactive SQLite REPL over the local store.
//!
//! Arbitrary input runs through the guarded `execute_query`, so only single
//! SELECT statements ever reach the database.

use std::io::{self, Write};

use anyhow::Result;

use crate::store::{Database, QueryResult};

pub fn run_sql_repl(db: &Database) -> Result<()> {
    println!("SQLite CLI for the agri-advisor store");
    println!("Type 'quit' or 'exit' to exit, 'help' for available commands");
    println!("{}", "-".repeat(40));

    loop {
        print!("\nsqlite> ");
        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.is_empty() {
            break; // EOF
        }
        let query = input.trim();

        if query.is_empty() {
            continue;
        }
        let lower = query.to_lowercase();
        if matches!(lower.as_str(), "quit" | "exit") {
            break;
        }
        if lower == "help" {
            print_help();
            continue;
        }
        if lower == "tables" {
            match db.list_tables() {
                Ok(tables) => {
                    println!("\nTables in database:");
                    for t in tables {
                        println!("  - {}", t);
                    }
                }
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }
        if lower == "schema" {
            match db.list_tables() {
                Ok(tables) => {
                    for t in tables {
                        println!("\nSchema for table '{}':", t);
                        println!("{}", "-".repeat(30));
                        if let Ok(cols) = db.table_schema(&t) {
                            for (name, ty) in cols {
                                println!("  {} ({})", name, ty);
                            }
                        }
                    }
                }
                Err(e) => println!("Error: {}", e),
            }
            continue;
        }

        match db.execute_query(query) {
            Ok((columns, rows)) => {
                if rows.is_empty() {
                    println!("Query executed successfully. No data returned.");
                } else {
                    println!("\nQuery returned {} rows:", rows.len());
                    QueryResult { sql: query.to_string(), columns, rows }.print_table();
                }
            }
            Err(e) => println!("Error executing query: {}", e),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_help() {
    println!("\nAvailable commands:");
    println!("  tables    - Show all tables");
    println!("  schema    - Show table schemas");
    println!("  help      - Show this help");
    println!("  quit/exit - Exit the program");
    println!("\nOr enter any SELECT query directly.");
    println!("\nExample queries:");
    println!("  SELECT * FROM mandi_prices LIMIT 5");
    println!("  SELECT DISTINCT Commodity FROM mandi_prices");
    println!("  SELECT * FROM soil_health");
}
