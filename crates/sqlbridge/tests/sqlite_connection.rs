//! End-to-end tests of `Connection` over an in-memory SQLite database.

use sqlbridge::{
    Connection, ConnectionConfig, DbError, Dialect, Driver, Params, SqlValue, XmlOptions,
};

async fn connect() -> Connection {
    Connection::connect(&ConnectionConfig::sqlite_memory())
        .await
        .unwrap()
}

async fn shop() -> Connection {
    let conn = connect().await;
    for sql in [
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            email VARCHAR(255) NOT NULL,
            score NUMERIC(10,2) DEFAULT 0,
            created_at TEXT
        )",
        "CREATE TABLE orders (
            id INTEGER NOT NULL,
            line INTEGER NOT NULL,
            user_id INTEGER REFERENCES users(id),
            PRIMARY KEY (id, line)
        )",
        "CREATE TABLE audit_log (message TEXT)",
        "CREATE VIEW active_users AS SELECT * FROM users",
    ] {
        conn.execute(sql, &Params::new()).await.unwrap();
    }
    conn
}

#[tokio::test]
async fn test_get_tables_excludes_views_and_orders_by_name() {
    let conn = shop().await;
    let tables = conn.get_tables(None).await.unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["audit_log", "orders", "users"]);
    assert!(tables.iter().all(|t| t.comment.is_empty()));
}

#[tokio::test]
async fn test_get_columns_in_ordinal_order() {
    let conn = shop().await;
    let columns = conn.get_columns("users", None).await.unwrap();

    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "email", "score", "created_at"]);

    let email = &columns[1];
    assert_eq!(email.data_type, "VARCHAR");
    assert_eq!(email.length, Some(255));
    assert!(!email.nullable);

    let score = &columns[2];
    assert_eq!(score.data_type, "NUMERIC");
    assert_eq!(score.length, Some(10));
    assert_eq!(score.default.as_deref(), Some("0"));
    assert!(score.nullable);

    assert_eq!(columns[3].length, None);
    assert_eq!(conn.get_comment("users", None).await.unwrap(), "");
}

#[tokio::test]
async fn test_primary_and_foreign_keys() {
    let conn = shop().await;

    assert_eq!(conn.get_primary_keys("users", None).await.unwrap(), vec!["id"]);
    assert_eq!(
        conn.get_primary_keys("orders", None).await.unwrap(),
        vec!["id", "line"]
    );
    assert!(conn
        .get_primary_keys("audit_log", None)
        .await
        .unwrap()
        .is_empty());

    let fks = conn.get_foreign_keys("orders", None).await.unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].column, "user_id");
    assert_eq!(fks[0].referenced_table, "users");
    assert_eq!(fks[0].referenced_column, "id");
    assert!(!fks[0].constraint_name.is_empty());

    assert!(conn.get_foreign_keys("users", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_describe_table() {
    let conn = shop().await;
    let schema = conn.describe_table("orders", Some("main")).await.unwrap();
    assert_eq!(schema.table.name, "orders");
    assert_eq!(schema.columns.len(), 3);
    assert_eq!(schema.primary_key, vec!["id", "line"]);
    assert_eq!(schema.foreign_key_groups().len(), 1);
}

#[tokio::test]
async fn test_named_placeholders_and_fetch_primitives() {
    let conn = shop().await;
    let insert = "INSERT INTO users (id, email, score) VALUES (:id, :email, :score)";
    for (id, email) in [(1, "a@example.com"), (2, "b@example.com"), (3, "c@example.com")] {
        let params = Params::new()
            .bind("id", id)
            .bind("email", email)
            .bind("score", SqlValue::F64(1.5));
        assert_eq!(conn.execute(insert, &params).await.unwrap(), 1);
    }

    let rows = conn
        .query(
            "SELECT id, email FROM users WHERE id >= :min ORDER BY id",
            &Params::new().bind("min", 2),
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_text("email").as_deref(), Some("b@example.com"));

    let ids = conn
        .fetch_column("SELECT id FROM users ORDER BY id", &Params::new())
        .await
        .unwrap();
    assert_eq!(ids, vec![SqlValue::I64(1), SqlValue::I64(2), SqlValue::I64(3)]);

    let count = conn
        .fetch_scalar(
            "SELECT COUNT(*) FROM users WHERE email LIKE ':not_a_param%'",
            &Params::new(),
        )
        .await
        .unwrap();
    assert_eq!(count, Some(SqlValue::I64(0)));

    let none = conn
        .fetch_scalar(
            "SELECT id FROM users WHERE id = :id",
            &Params::new().bind("id", 99),
        )
        .await
        .unwrap();
    assert_eq!(none, None);

    // The same name used twice binds twice
    let same = conn
        .fetch_scalar(
            "SELECT COUNT(*) FROM users WHERE id = :id OR id = :id + 1",
            &Params::new().bind("id", 1),
        )
        .await
        .unwrap();
    assert_eq!(same, Some(SqlValue::I64(2)));
}

#[tokio::test]
async fn test_set_limit_pages_through_rows() {
    let conn = connect().await;
    conn.execute("CREATE TABLE n (v INTEGER)", &Params::new())
        .await
        .unwrap();
    for v in 0..10 {
        conn.execute("INSERT INTO n (v) VALUES (:v)", &Params::new().bind("v", v))
            .await
            .unwrap();
    }

    let sql = conn.set_limit("SELECT v FROM n ORDER BY v", 3, 4);
    assert_eq!(sql, "SELECT v FROM n ORDER BY v LIMIT 4,3");
    let page = conn.fetch_column(&sql, &Params::new()).await.unwrap();
    assert_eq!(page, vec![SqlValue::I64(4), SqlValue::I64(5), SqlValue::I64(6)]);
}

#[tokio::test]
async fn test_date_expressions_evaluate() {
    let conn = connect().await;
    let ym = conn.date("Ym", Some("'2024-03-05 10:00:00'"), None).unwrap();
    let day = conn.date("d", Some("'2024-03-05 10:00:00'"), Some("int")).unwrap();

    let sql = format!("SELECT {} AS ym, {} AS d", ym, day);
    let rows = conn.query(&sql, &Params::new()).await.unwrap();
    assert_eq!(rows[0].get_text("ym").as_deref(), Some("202403"));
    assert_eq!(rows[0].get_text("d").as_deref(), Some("5"));

    let now = conn.date("Y", None, None).unwrap();
    let year = conn
        .fetch_scalar(&format!("SELECT {}", now), &Params::new())
        .await
        .unwrap()
        .and_then(|v| v.to_text())
        .unwrap();
    assert_eq!(year.len(), 4);

    assert!(matches!(
        conn.date("Q", None, None).unwrap_err(),
        DbError::UnsupportedDateToken(_)
    ));
}

#[tokio::test]
async fn test_xml_is_unsupported_on_sqlite() {
    let conn = connect().await;
    let err = conn
        .xml("doc", &["a/b"], &XmlOptions::default())
        .unwrap_err();
    assert!(matches!(err, DbError::UnsupportedCapability { .. }));
}

#[tokio::test]
async fn test_query_errors_carry_engine_message() {
    let conn = connect().await;
    let err = conn
        .query("SELECT * FROM missing_table", &Params::new())
        .await
        .unwrap_err();
    match err {
        DbError::Query { message, .. } => assert!(message.contains("missing_table")),
        other => panic!("expected query error, got {:?}", other),
    }

    let err = conn
        .query("SELECT :unbound", &Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::MissingParameter(name) if name == "unbound"));
}

#[tokio::test]
async fn test_closed_connection_fails_with_connection_error() {
    let conn = connect().await;
    conn.ping().await.unwrap();
    conn.close().await.unwrap();
    assert!(!conn.is_open().await);

    let err = conn.query("SELECT 1", &Params::new()).await.unwrap_err();
    assert!(matches!(err, DbError::Connection { .. }));
}

#[tokio::test]
async fn test_lazy_connection_opens_on_first_statement() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lazy.db");

    let mut config = ConnectionConfig::new(Driver::Sqlite, path.to_string_lossy());
    config.persistent = false;
    let conn = Connection::connect(&config).await.unwrap();
    assert!(!path.exists());

    conn.execute("CREATE TABLE t (id INTEGER)", &Params::new())
        .await
        .unwrap();
    assert!(path.exists());
    assert_eq!(conn.dialect().name(), "sqlite");
    assert_eq!(conn.default_schema(), "main");
    assert_eq!(conn.quote_ident("t"), "\"t\"");
}

#[tokio::test]
async fn test_backslash_in_literal_does_not_hide_placeholders() {
    let conn = connect().await;
    let rows = conn
        .query("SELECT 'C:\\' AS p, :v AS v", &Params::new().bind("v", 7))
        .await
        .unwrap();
    assert_eq!(rows[0].get_text("p").as_deref(), Some("C:\\"));
    assert_eq!(rows[0].get("v"), Some(&SqlValue::I64(7)));
}

#[tokio::test]
async fn test_introspection_honours_attached_schema() {
    let conn = connect().await;
    for sql in [
        "CREATE TABLE main_only (id INTEGER PRIMARY KEY)",
        "ATTACH DATABASE ':memory:' AS aux",
        "CREATE TABLE aux.parents (id INTEGER PRIMARY KEY)",
        "CREATE TABLE aux.aux_only (
            code TEXT PRIMARY KEY,
            parent_id INTEGER REFERENCES parents(id)
        )",
    ] {
        conn.execute(sql, &Params::new()).await.unwrap();
    }

    let names = |tables: Vec<sqlbridge::TableDescriptor>| {
        tables.into_iter().map(|t| t.name).collect::<Vec<_>>()
    };
    assert_eq!(names(conn.get_tables(None).await.unwrap()), vec!["main_only"]);
    assert_eq!(
        names(conn.get_tables(Some("aux")).await.unwrap()),
        vec!["aux_only", "parents"]
    );

    let columns = conn.get_columns("aux_only", Some("aux")).await.unwrap();
    assert_eq!(columns.len(), 2);
    assert!(conn.get_columns("aux_only", Some("main")).await.unwrap().is_empty());

    assert_eq!(
        conn.get_primary_keys("aux_only", Some("aux")).await.unwrap(),
        vec!["code"]
    );
    let fks = conn.get_foreign_keys("aux_only", Some("aux")).await.unwrap();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].referenced_table, "parents");
    assert!(conn
        .get_foreign_keys("aux_only", None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_only_rowid_primary_key_is_implicitly_not_null() {
    let conn = connect().await;
    for sql in [
        "CREATE TABLE codes (code TEXT PRIMARY KEY, label TEXT NOT NULL)",
        "CREATE TABLE pairs (a INTEGER, b INTEGER, PRIMARY KEY (a, b))",
    ] {
        conn.execute(sql, &Params::new()).await.unwrap();
    }

    let codes = conn.get_columns("codes", None).await.unwrap();
    assert!(codes[0].nullable);
    assert!(!codes[1].nullable);

    let pairs = conn.get_columns("pairs", None).await.unwrap();
    assert!(pairs.iter().all(|c| c.nullable));

    let users = shop().await.get_columns("users", None).await.unwrap();
    assert!(!users[0].nullable);
}
