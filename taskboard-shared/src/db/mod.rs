/// PostgreSQL plumbing for the `PgStore` adapter
///
/// - `pool`: connection pool creation and health checks
/// - `migrations`: embedded schema migrations, run at startup

pub mod migrations;
pub mod pool;
