use ::duckdb::{Connection, ToSql};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "0001_stock_cache",
        sql: r#"
CREATE TABLE IF NOT EXISTS stock_cache (
    symbol TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    price DOUBLE NOT NULL,
    change_amount DOUBLE NOT NULL,
    change_percent DOUBLE NOT NULL,
    volume BIGINT NOT NULL,
    last_updated BIGINT NOT NULL,
    in_watchlist BOOLEAN NOT NULL DEFAULT FALSE
);
"#,
    },
    Migration {
        version: "0002_snapshot_cycles",
        sql: r#"
CREATE TABLE IF NOT EXISTS snapshot_cycles (
    written_at BIGINT NOT NULL
);
"#,
    },
];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let params: [&dyn ToSql; 1] = [&migration.version];
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            tracing::debug!(version = migration.version, "applying warehouse migration");
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params.as_slice(),
            )?;
        }
    }

    Ok(())
}
