use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    execute(db, "PRAGMA foreign_keys = ON").await?;

    // Directory: companies, persons, parks, categories
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS companies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            legal_name TEXT NOT NULL UNIQUE,
            phone TEXT,
            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS persons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT UNIQUE,
            phone TEXT,
            company_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (company_id) REFERENCES companies(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS parks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            address TEXT,
            note TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS sub_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (category_id, name),
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    // Catalog: materials and their serialized units
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            reference TEXT NOT NULL UNIQUE,
            description TEXT,
            category_id INTEGER,
            sub_category_id INTEGER,
            park_id INTEGER,
            is_unitary BOOLEAN NOT NULL DEFAULT 0,
            stock_quantity INTEGER,
            out_of_order_quantity INTEGER NOT NULL DEFAULT 0,
            lost_quantity INTEGER NOT NULL DEFAULT 0,
            rental_price REAL NOT NULL DEFAULT 0,
            replacement_price REAL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT,
            FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
            FOREIGN KEY (sub_category_id) REFERENCES sub_categories(id) ON DELETE SET NULL,
            FOREIGN KEY (park_id) REFERENCES parks(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS material_units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            material_id INTEGER NOT NULL,
            serial_number TEXT NOT NULL,
            is_broken BOOLEAN NOT NULL DEFAULT 0,
            is_lost BOOLEAN NOT NULL DEFAULT 0,
            person_id INTEGER,
            state TEXT NOT NULL DEFAULT 'state-of-use',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (material_id, serial_number),
            FOREIGN KEY (material_id) REFERENCES materials(id) ON DELETE CASCADE,
            FOREIGN KEY (person_id) REFERENCES persons(id) ON DELETE SET NULL
        )
        "#,
    )
    .await?;

    // Ledger: events, their lines and unit assignments
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            reference TEXT,
            description TEXT,
            location TEXT,
            start_date DATETIME NOT NULL,
            end_date DATETIME NOT NULL,
            is_confirmed BOOLEAN NOT NULL DEFAULT 0,
            is_billable BOOLEAN NOT NULL DEFAULT 1,
            is_return_inventory_done BOOLEAN NOT NULL DEFAULT 0,
            user_id INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_events_period ON events (start_date, end_date)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS event_materials (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL,
            material_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL CHECK (quantity > 0),
            quantity_returned INTEGER,
            quantity_broken INTEGER NOT NULL DEFAULT 0,
            UNIQUE (event_id, material_id),
            FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
            FOREIGN KEY (material_id) REFERENCES materials(id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS event_material_units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_material_id INTEGER NOT NULL,
            material_unit_id INTEGER NOT NULL,
            is_broken BOOLEAN NOT NULL DEFAULT 0,
            is_lost BOOLEAN NOT NULL DEFAULT 0,
            UNIQUE (event_material_id, material_unit_id),
            FOREIGN KEY (event_material_id) REFERENCES event_materials(id) ON DELETE CASCADE,
            FOREIGN KEY (material_unit_id) REFERENCES material_units(id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_event_material_units_unit ON event_material_units (material_unit_id)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS event_beneficiaries (
            event_id INTEGER NOT NULL,
            person_id INTEGER NOT NULL,
            PRIMARY KEY (event_id, person_id),
            FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
            FOREIGN KEY (person_id) REFERENCES persons(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS event_assignees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL,
            person_id INTEGER NOT NULL,
            position TEXT,
            start_time DATETIME,
            end_time DATETIME,
            FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
            FOREIGN KEY (person_id) REFERENCES persons(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    tracing::debug!("Database schema is up to date");

    Ok(())
}
