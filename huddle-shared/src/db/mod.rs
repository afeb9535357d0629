/// Database layer for Huddle
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded migration runner
///
/// SQL for each table lives with its model in [`crate::models`].

pub mod migrations;
pub mod pool;
