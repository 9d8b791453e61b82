use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_create_demand_observations_table::Migration),
            Box::new(m20250601_000002_create_forecast_history_table::Migration),
        ]
    }
}

mod m20250601_000001_create_demand_observations_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000001_create_demand_observations_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Aligned with models::demand_observation::Model
            manager
                .create_table(
                    Table::create()
                        .table(DemandObservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DemandObservations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(DemandObservations::Sku).string().not_null())
                        .col(ColumnDef::new(DemandObservations::Date).date().not_null())
                        .col(
                            ColumnDef::new(DemandObservations::Quantity)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(DemandObservations::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_demand_observations_sku_date")
                        .table(DemandObservations::Table)
                        .col(DemandObservations::Sku)
                        .col(DemandObservations::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DemandObservations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DemandObservations {
        Table,
        Id,
        Sku,
        Date,
        Quantity,
        RecordedAt,
    }
}

mod m20250601_000002_create_forecast_history_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250601_000002_create_forecast_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ForecastHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ForecastHistory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ForecastHistory::ForecastId)
                                .uuid()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ForecastHistory::Sku).string().not_null())
                        .col(
                            ColumnDef::new(ForecastHistory::GeneratedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ForecastHistory::HorizonDays)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ForecastHistory::Model).string().not_null())
                        .col(
                            ColumnDef::new(ForecastHistory::FallbackUsed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        // JSON array of daily points
                        .col(ColumnDef::new(ForecastHistory::Predictions).text().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_forecast_history_sku_generated_at")
                        .table(ForecastHistory::Table)
                        .col(ForecastHistory::Sku)
                        .col(ForecastHistory::GeneratedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ForecastHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ForecastHistory {
        Table,
        Id,
        ForecastId,
        Sku,
        GeneratedAt,
        HorizonDays,
        Model,
        FallbackUsed,
        Predictions,
    }
}
