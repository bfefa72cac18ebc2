use std::cell::RefCell;

use lean_orm::{
    row, Conditional, DatabaseConnection, DatabaseValue, Entity, EntitySchema, Model,
    ModelFactory, OrmResult, QueryBuilder, Row, SqlDialect, SqliteConnection,
};

#[derive(Debug, Default, PartialEq)]
struct User {
    id: Option<i64>,
    name: String,
    email: String,
    active: bool,
}

impl Entity for User {
    fn describe(schema: &mut EntitySchema<Self>) {
        schema
            .field("id", |user: &mut User, value| user.id = value)
            .field("name", |user: &mut User, value| user.name = value)
            .field("email", |user: &mut User, value| user.email = value)
            .field("active", |user: &mut User, value| user.active = value)
            .map_data_key("is_active", "active");
    }
}

impl Model for User {
    fn to_database_row(&self) -> Row {
        row! {
            "name" => self.name.as_str(),
            "email" => self.email.as_str(),
            "is_active" => self.active,
        }
    }
}

struct UserFactory;

impl ModelFactory for UserFactory {
    type Model = User;

    fn definition(&self) -> Row {
        row! { "name" => "Florent", "email" => "flo@flo.fr", "is_active" => 1 }
    }
}

fn setup() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE `users` (
          `id` INTEGER PRIMARY KEY AUTOINCREMENT,
          `name` TEXT NOT NULL,
          `email` TEXT NOT NULL,
          `is_active` INTEGER NOT NULL DEFAULT 0
        )",
    )
    .unwrap();
    conn
}

#[test]
fn test_factory_saves_models_in_their_table() {
    let conn = setup();
    let mut query = QueryBuilder::new(&conn);

    let saved = UserFactory
        .save_many(
            &mut query,
            3,
            vec![
                row! { "name" => "first" },
                row! { "email" => "second@flo.fr", "is_active" => 0 },
            ],
        )
        .unwrap();

    assert!(saved);
    assert_eq!(
        query.to_sql(),
        "INSERT INTO `users` (`name`, `email`, `is_active`) VALUES (?, ?, ?), (?, ?, ?), (?, ?, ?)"
    );

    let users: Vec<User> = User::query(&conn)
        .order_by("id")
        .hydrate::<User>()
        .select_many(&[])
        .unwrap();

    assert_eq!(users.len(), 3);
    assert_eq!(users[0].id, Some(1));
    assert_eq!(users[0].name, "first");
    assert_eq!(users[1].email, "second@flo.fr");
    assert!(!users[1].active);
    assert!(users[2].active);
}

#[test]
fn test_save_one_then_reload() {
    let conn = setup();
    let mut query = QueryBuilder::new(&conn);
    UserFactory
        .save_one(&mut query, row! { "name" => "solo" })
        .unwrap();

    let row = User::query(&conn)
        .and_where("name", "=", "solo")
        .unwrap()
        .select_single(&[])
        .unwrap()
        .unwrap();
    let user = User::from_database_row(row).unwrap();

    assert_eq!(
        user,
        User {
            id: Some(1),
            name: "solo".to_string(),
            email: "flo@flo.fr".to_string(),
            active: true,
        }
    );
    assert_eq!(user.to_database_row().get("is_active"), Some(&DatabaseValue::Bool(true)));
}

#[test]
fn test_saving_nothing_skips_the_insert() {
    let conn = setup();
    let mut query = QueryBuilder::new(&conn);

    assert!(!UserFactory.save_many(&mut query, 0, Vec::new()).unwrap());
    assert_eq!(User::query(&conn).count().unwrap(), 0);
}

/// Connection recording statements instead of running them
struct RecordingConnection {
    dialect: SqlDialect,
    executed: RefCell<Vec<(String, Vec<DatabaseValue>)>>,
}

impl RecordingConnection {
    fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            executed: RefCell::new(Vec::new()),
        }
    }
}

impl DatabaseConnection for RecordingConnection {
    fn execute(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<u64> {
        self.executed
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Vec<Row>> {
        self.execute(sql, params)?;
        Ok(Vec::new())
    }

    fn fetch_optional(&self, sql: &str, params: &[DatabaseValue]) -> OrmResult<Option<Row>> {
        self.execute(sql, params)?;
        Ok(None)
    }

    fn last_insert_id(&self) -> i64 {
        0
    }

    fn dialect(&self) -> SqlDialect {
        self.dialect
    }
}

#[test]
fn test_mysql_dialect_upsert() {
    let conn = RecordingConnection::new(SqlDialect::MySQL);
    let mut query = QueryBuilder::new(&conn);

    query
        .in_table("users")
        .upsert_single(
            row! { "email" => "flo@flo.fr", "name" => "Florent" },
            &["email"],
        )
        .unwrap();

    let executed = conn.executed.borrow();
    assert_eq!(
        executed[0].0,
        "INSERT INTO `users` (`email`, `name`) VALUES (?, ?) ON DUPLICATE KEY UPDATE `name` = VALUES(`name`)"
    );
    assert_eq!(
        executed[0].1,
        vec![DatabaseValue::from("flo@flo.fr"), DatabaseValue::from("Florent")]
    );
}

#[test]
fn test_bindings_follow_placeholder_order() {
    let conn = RecordingConnection::new(SqlDialect::SQLite);
    let mut query = QueryBuilder::new(&conn);

    query
        .in_table("users")
        .where_in("id", [4, 5])
        .unwrap()
        .or_where("name", "=", "x")
        .unwrap()
        .update(row! { "email" => "e", "is_active" => false })
        .unwrap();

    let executed = conn.executed.borrow();
    assert_eq!(
        executed[0].0,
        "UPDATE `users` SET `email` = ?, `is_active` = ? WHERE `id` IN (?, ?) OR `name` = ?"
    );
    assert_eq!(
        executed[0].1,
        vec![
            DatabaseValue::from("e"),
            DatabaseValue::Bool(false),
            DatabaseValue::Integer(4),
            DatabaseValue::Integer(5),
            DatabaseValue::from("x"),
        ]
    );
}
