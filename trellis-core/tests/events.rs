//! Connection hooks around statement execution

mod common;

use std::sync::{Arc, Mutex};

use common::{builder, builder_with_prefix, row, Call};
use futures::FutureExt;
use trellis_core::{Error, Event, Value};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test]
async fn test_select_hooks_see_table_and_statement() {
    let db = builder_with_prefix("wp_");
    let adapter = db.connection().adapter();
    adapter.push_rows(vec![row(vec![("id", 7)])]);

    let seen = log();
    let before = Arc::clone(&seen);
    db.connection()
        .events()
        .register(Event::BeforeSelect, "posts", move |ctx| {
            assert!(ctx.elapsed.is_none());
            before
                .lock()
                .unwrap()
                .push(format!("before {:?} {}", ctx.table, ctx.statement.sql));
            Ok(())
        });
    let after = Arc::clone(&seen);
    db.connection()
        .events()
        .register(Event::AfterSelect, "posts", move |ctx| {
            assert!(ctx.elapsed.is_some());
            after.lock().unwrap().push(format!("after {:?}", ctx.event));
            Ok(())
        });

    let rows = db.table("posts").where_(("id", 7)).get().await.unwrap();
    assert_eq!(rows.len(), 1);
    // other tables are not observed
    db.table("users").get().await.unwrap();

    assert_eq!(
        entries(&seen),
        vec![
            "before Some(\"posts\") SELECT * FROM wp_posts WHERE id = %d",
            "after AfterSelect",
        ]
    );
}

#[tokio::test]
async fn test_failing_before_hook_stops_the_write() {
    let db = builder();
    let adapter = db.connection().adapter();
    db.connection()
        .events()
        .register_any(Event::BeforeDelete, |ctx| {
            if ctx.statement.sql.contains("WHERE") {
                Ok(())
            } else {
                Err(Error::invalid_statement("refusing to delete every row"))
            }
        });

    let err = db.table("foo").delete().await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid statement: refusing to delete every row");
    assert!(adapter.calls().is_empty());

    let deleted = db.table("foo").where_(("id", 1)).delete().await.unwrap();
    assert_eq!(deleted, 0);
    assert_eq!(
        adapter.calls(),
        vec![Call::execute("DELETE FROM foo WHERE id = %d", vec![Value::from(1)])]
    );
}

#[tokio::test]
async fn test_after_hooks_skip_failed_statements() {
    let db = builder();
    let adapter = db.connection().adapter();
    adapter.push_write_error("Duplicate entry '1' for key 'PRIMARY'");
    adapter.push_write(1, Some(2));

    let seen = log();
    let after = Arc::clone(&seen);
    db.connection()
        .events()
        .register(Event::AfterInsert, "foo", move |ctx| {
            after.lock().unwrap().push(ctx.statement.sql.clone());
            Ok(())
        });

    assert!(db.table("foo").insert(vec![("id", 1)]).await.is_err());
    assert_eq!(db.table("foo").insert(vec![("id", 2)]).await.unwrap(), Some(2));
    assert_eq!(entries(&seen), vec!["INSERT INTO foo (id) VALUES (%d)"]);
}

#[tokio::test]
async fn test_update_or_insert_fires_each_statement() {
    let db = builder();

    let seen = log();
    for event in [
        Event::BeforeSelect,
        Event::AfterSelect,
        Event::BeforeInsert,
        Event::AfterInsert,
        Event::BeforeUpdate,
        Event::AfterUpdate,
    ] {
        let sink = Arc::clone(&seen);
        db.connection().events().register_any(event, move |ctx| {
            sink.lock().unwrap().push(format!("{:?}", ctx.event));
            Ok(())
        });
    }

    db.table("foo")
        .where_(("email", "a@b.c"))
        .update_or_insert(vec![("email", "a@b.c")])
        .await
        .unwrap();

    assert_eq!(
        entries(&seen),
        vec!["BeforeSelect", "AfterSelect", "BeforeInsert", "AfterInsert"]
    );
}

#[tokio::test]
async fn test_hook_error_inside_transaction_rolls_back() {
    let db = builder();
    let adapter = db.connection().adapter();
    db.connection()
        .events()
        .register(Event::BeforeUpdate, "accounts", |_| {
            Err(Error::invalid_statement("accounts are read-only"))
        });

    let err = db
        .transaction(|tx| {
            async move {
                tx.table("audit").insert(vec![("note", "start")]).await?;
                tx.table("accounts").update(vec![("balance", 0)]).await?;
                Ok::<_, Error>(())
            }
            .boxed()
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidStatement { .. }));
    assert_eq!(
        adapter.calls(),
        vec![
            Call::Begin,
            Call::execute("INSERT INTO audit (note) VALUES (%s)", vec![Value::from("start")]),
            Call::Rollback,
        ]
    );
}

#[test]
fn test_hooks_are_shared_by_connection_clones() {
    let db = builder();
    let clone = db.connection().clone();
    clone.events().register_any(Event::AfterDelete, |_| Ok(()));

    assert_eq!(db.connection().events().len(), 1);
    assert_eq!(db.new_query().connection().events().len(), 1);
}
