use std::fs;
use std::path::PathBuf;

use agri_advisor::store::Database;

const PRICES_CSV: &str = "\
State,District,Market,Commodity,Variety,Arrival_Date,Min_Price,Max_Price,Modal_Price
Maharashtra,Nashik,Lasalgaon,Onion,Red,2026-08-27,900,1400,1200
Maharashtra,Nashik,Pimpalgaon,Onion,Local,2026-08-27,850,1350,1150
Uttar Pradesh,Kanpur,Kanpur Mandi,Wheat,Dara,2026-08-27,2100,2350,2250
";

const SOIL_CSV: &str = "\
District,pH,Organic_Carbon,Nitrogen,Phosphorus,Potassium
Nashik,6.8,0.52,240,18.5,310
Kanpur,7.4,0.41,195,14.2,265
";

fn temp_db(dir: &tempfile::TempDir) -> Database {
    let path = dir.path().join("agri_test.db");
    Database::open(path.to_str().unwrap()).unwrap()
}

fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn import_reports_row_counts() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = temp_db(&dir);

    let prices = write_csv(&dir, "prices.csv", PRICES_CSV);
    let soil = write_csv(&dir, "soil.csv", SOIL_CSV);

    assert_eq!(db.import_prices_csv(&prices).unwrap(), 3);
    assert_eq!(db.import_soil_csv(&soil).unwrap(), 2);
    assert_eq!(db.count_rows("mandi_prices").unwrap(), 3);
    assert_eq!(db.count_rows("soil_health").unwrap(), 2);
}

#[test]
fn reimport_replaces_wholesale() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = temp_db(&dir);

    let first = write_csv(&dir, "first.csv", PRICES_CSV);
    db.import_prices_csv(&first).unwrap();
    assert_eq!(db.count_rows("mandi_prices").unwrap(), 3);

    let second = write_csv(
        &dir,
        "second.csv",
        "State,District,Market,Commodity,Variety,Arrival_Date,Min_Price,Max_Price,Modal_Price\n\
         Punjab,Ludhiana,Ludhiana Mandi,Rice,Basmati,2026-08-28,3100,3600,3400\n",
    );
    db.import_prices_csv(&second).unwrap();

    // The table is a snapshot: second import wins outright.
    assert_eq!(db.count_rows("mandi_prices").unwrap(), 1);
    let (_, rows) = db
        .execute_query("SELECT State FROM mandi_prices")
        .unwrap();
    assert_eq!(rows, vec![vec!["Punjab".to_string()]]);
}

#[test]
fn missing_header_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = temp_db(&dir);

    let bad = write_csv(
        &dir,
        "bad.csv",
        "State,District,Commodity\nMaharashtra,Nashik,Onion\n",
    );
    let err = db.import_prices_csv(&bad).unwrap_err();
    assert!(err.to_string().contains("missing required column"));

    // A failed import must not have replaced anything.
    assert_eq!(db.count_rows("mandi_prices").unwrap(), 0);
}

#[test]
fn commodity_is_lowercased_on_import() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = temp_db(&dir);

    let prices = write_csv(&dir, "prices.csv", PRICES_CSV);
    db.import_prices_csv(&prices).unwrap();

    let (_, rows) = db
        .execute_query("SELECT DISTINCT Commodity FROM mandi_prices ORDER BY Commodity")
        .unwrap();
    assert_eq!(
        rows,
        vec![vec!["onion".to_string()], vec!["wheat".to_string()]]
    );
}

#[test]
fn guarded_query_execution() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = temp_db(&dir);
    let prices = write_csv(&dir, "prices.csv", PRICES_CSV);
    db.import_prices_csv(&prices).unwrap();

    let (columns, rows) = db
        .execute_query(
            "SELECT Market, Modal_Price FROM mandi_prices \
             WHERE lower(Commodity) = 'onion' ORDER BY Modal_Price DESC",
        )
        .unwrap();
    assert_eq!(columns, vec!["Market".to_string(), "Modal_Price".to_string()]);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["Lasalgaon".to_string(), "1200.00".to_string()]);

    // Write statements never reach SQLite.
    assert!(db.execute_query("DELETE FROM mandi_prices").is_err());
    assert!(db.execute_query("SELECT 1; DROP TABLE mandi_prices").is_err());
    assert_eq!(db.count_rows("mandi_prices").unwrap(), 3);
}

#[test]
fn row_evaluation_error_surfaces_instead_of_truncating() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = temp_db(&dir);

    // abs() of i64::MIN overflows at step time, after the statement has
    // already prepared cleanly. That must come back as an error, not an
    // empty result set.
    let res = db.execute_query("SELECT abs(-9223372036854775807 - 1)");
    let err = res.unwrap_err();
    assert!(err.to_string().contains("query execution error"));
}

#[test]
fn soil_lookup_is_case_insensitive() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = temp_db(&dir);
    let soil = write_csv(&dir, "soil.csv", SOIL_CSV);
    db.import_soil_csv(&soil).unwrap();

    let rec = db.soil_for_district("nashik").unwrap().unwrap();
    assert_eq!(rec.district, "Nashik");
    assert_eq!(rec.ph, Some(6.8));
    assert_eq!(rec.potassium, Some(310.0));

    assert!(db.soil_for_district("Atlantis").unwrap().is_none());
}

#[test]
fn introspection_lists_tables_and_columns() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = temp_db(&dir);

    let tables = db.list_tables().unwrap();
    assert!(tables.contains(&"mandi_prices".to_string()));
    assert!(tables.contains(&"soil_health".to_string()));

    let cols = db.table_schema("soil_health").unwrap();
    assert!(cols.iter().any(|(name, _)| name == "pH"));
    assert!(db.table_schema("no_such_table").is_err());
}
