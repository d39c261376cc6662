use futures::FutureExt;
use trellis_core::{
    op, Adapter, Config, Connection, JoinType, QueryBuilder, Raw, Row, Value, WriteResult,
};

// Prints every statement instead of talking to a server
struct EchoAdapter;

impl Adapter for EchoAdapter {
    async fn fetch(&self, sql: &str, bindings: &[Value]) -> trellis_core::Result<Vec<Row>> {
        println!("   FETCH:   {} {:?}", sql, bindings);
        Ok(vec![Row::from_pairs(vec![("field", Value::I64(3))])])
    }

    async fn execute(&self, sql: &str, bindings: &[Value]) -> trellis_core::Result<WriteResult> {
        println!("   EXECUTE: {} {:?}", sql, bindings);
        Ok(WriteResult {
            affected_rows: 1,
            last_insert_id: Some(42),
        })
    }

    async fn begin_transaction(&self) -> trellis_core::Result<()> {
        println!("   START TRANSACTION");
        Ok(())
    }

    async fn commit(&self) -> trellis_core::Result<()> {
        println!("   COMMIT");
        Ok(())
    }

    async fn rollback(&self) -> trellis_core::Result<()> {
        println!("   ROLLBACK");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> trellis_core::Result<()> {
    let conn = Connection::with_config(EchoAdapter, Config::new().with_prefix("wp_"));
    let db = QueryBuilder::new(conn);

    // SELECT with joins, grouped conditions and paging
    let query = db
        .table("users")
        .select(("users.id", "users.name", "posts.title"))
        .join_with(JoinType::Left, "posts", |j| {
            j.on("users.id", "=", "posts.author_id");
        })
        .where_(("age", op::GT, 18))
        .where_group(|g| {
            g.where_(("status", "active")).or_where_null("banned_at");
        })
        .order_by_desc("posts.created_at")
        .limit(10);

    println!("SELECT SQL: {}", query.to_sql()?);
    println!("SELECT raw: {}", query.to_raw_sql()?);

    // Aggregates wrap anything beyond a bare table
    println!("Active users: {}", query.count().await?);

    // Writes
    let id = db
        .table("users")
        .insert(vec![("name", Value::from("John Doe")), ("age", Value::from(30))])
        .await?;
    println!("Inserted id: {:?}", id);

    let updated = db
        .table("users")
        .where_(("id", 123))
        .update(vec![("email", "newemail@example.com")])
        .await?;
    println!("Updated rows: {}", updated);

    // Hand-written statement through the same pipeline
    let rows = db
        .new_query()
        .query(Raw::with_bindings(
            "SELECT * FROM wp_users WHERE email LIKE %s",
            "%@example.com",
        ))
        .get()
        .await?;
    println!("Raw query returned {} row(s)", rows.len());

    // Transaction with implicit commit
    db.transaction(|tx| {
        async move {
            tx.table("accounts")
                .where_(("id", 1))
                .update(vec![("balance", 900)])
                .await?;
            tx.table("accounts")
                .where_(("id", 2))
                .update(vec![("balance", 1100)])
                .await?;
            Ok::<_, trellis_core::Error>(())
        }
        .boxed()
    })
    .await?;

    Ok(())
}
