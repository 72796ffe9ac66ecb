use strata_core::{op, table, AggregateFunction, Config, Query, Value};

fn main() -> strata_core::Result<()> {
    // SELECT with clean where syntax
    let select_query = table("users")
        .select(("id", "name", "email"))
        .where_(("age", op::GT, 18)) // Using op constants
        .where_(("status", "active")) // Defaults to =
        .or_where(("city", "LIKE", "%York%")) // Using string operators
        .where_in("role", ["admin", "editor"])
        .for_page(2, 10);

    let compiled = select_query.to_sql()?;
    println!("SELECT SQL: {}", compiled.sql);
    println!("  params: {:?}", compiled.params);

    // INSERT
    let insert = table("users").to_insert_sql([
        ("name", Value::from("John Doe")),
        ("email", Value::from("john@example.com")),
        ("age", Value::from(30)),
    ])?;
    println!("INSERT SQL: {}", insert.sql);

    // Per-table settings, e.g. soft deletes on posts
    let config = Config::from_toml_str(
        r#"
        [tables.posts.soft_deletes]
        deleted_at_column = "deleted_at"
        "#,
    )?;

    let posts = || config.query("posts").where_(("author_id", 7));
    println!("Live posts: {}", posts().to_sql()?.sql);
    println!("Trashed posts: {}", posts().only_trashed().to_sql()?.sql);
    println!("Soft DELETE: {}", posts().to_delete_sql()?.sql);
    println!("Force DELETE: {}", posts().to_force_delete_sql()?.sql);
    println!("Restore: {}", posts().to_restore_sql()?.sql);

    // Aggregates leave the projection untouched
    let mut orders = table("orders").select(("id", "total")).where_(("paid", true));
    println!(
        "SUM SQL: {}",
        orders.to_aggregate_sql(AggregateFunction::Sum, "total")?.sql
    );
    println!("Projection afterwards: {}", orders.to_sql()?.sql);

    // Raw statements are passed through untouched
    let raw = Query::raw("SELECT * FROM users WHERE id = ?", [1]);
    println!("Raw SQL: {}", raw.to_sql()?.sql);

    Ok(())
}
