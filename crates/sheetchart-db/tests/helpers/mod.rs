//! Test helpers: a throwaway PostgreSQL container with the workspace
//! migrations applied.
//!
//! Needs a running Docker daemon. Run from workspace root:
//! `cargo test -p sheetchart-db --test repository_test`.

use sheetchart_core::constants::XLSX_CONTENT_TYPE;
use sheetchart_core::models::{
    Aggregation, AxisConfig, AxisKind, ChartConfig, ChartType, NewChart, NewFile, SeriesConfig,
};
use sheetchart_db::{ChartRepository, FileRepository};
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use uuid::Uuid;

/// Repositories over an isolated database. Dropping it stops the container.
pub struct TestDb {
    pub files: FileRepository,
    pub charts: ChartRepository,
    pub _container: ContainerAsync<Postgres>,
}

pub async fn setup_test_db() -> TestDb {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start postgres container");

    let connection_string = format!(
        "postgresql://postgres:postgres@{}:{}/postgres",
        container.get_host().await.expect("Failed to resolve container host"),
        container
            .get_host_port_ipv4(5432)
            .await
            .expect("Failed to resolve postgres port")
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&connection_string)
        .await
        .expect("Failed to connect to test database");

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .expect("Failed to load migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    TestDb {
        files: FileRepository::new(pool.clone()),
        charts: ChartRepository::new(pool),
        _container: container,
    }
}

pub fn new_file(owner: Uuid, name: &str) -> NewFile {
    NewFile {
        filename: format!("excel-{}-{}.xlsx", name, Uuid::new_v4()),
        original_name: format!("{}.xlsx", name),
        mimetype: XLSX_CONTENT_TYPE.to_string(),
        size: 42,
        path: format!("excel-{}.xlsx", name),
        uploaded_by: owner,
    }
}

pub fn new_chart(owner: Uuid, source: Uuid, title: &str, auto_generated: bool) -> NewChart {
    let axis = |field: &str, kind| AxisConfig {
        field: field.into(),
        label: field.into(),
        kind,
    };
    NewChart {
        title: title.into(),
        description: None,
        chart_type: ChartType::Bar,
        config: ChartConfig {
            x_axis: axis("Month", AxisKind::Category),
            y_axis: axis("Revenue", AxisKind::Value),
            series: vec![SeriesConfig {
                field: "Revenue".into(),
                label: "Revenue".into(),
                color: None,
                series_type: None,
            }],
            filters: None,
            aggregation: Aggregation::None,
            group_by: None,
            sort_by: None,
            limit: 10,
            data: None,
        },
        source_file: source,
        created_by: owner,
        is_public: false,
        tags: vec!["sales".into()],
        auto_generated,
    }
}

/// Rows are stamped with the client clock; keep consecutive inserts apart.
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}
