use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_manifests_table::Migration),
            Box::new(m20250101_000002_create_manifest_items_table::Migration),
            Box::new(m20250101_000003_create_uploads_table::Migration),
        ]
    }
}

mod m20250101_000001_create_manifests_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_manifests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Manifests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Manifests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Manifests::CreatedAt).timestamp().not_null())
                        .col(
                            ColumnDef::new(Manifests::TotalItems)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Manifests::TotalMsrp)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Manifests::ProjectedRevenue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Manifests::ProfitMargin)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Manifests::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Manifests {
        Table,
        Id,
        CreatedAt,
        TotalItems,
        TotalMsrp,
        ProjectedRevenue,
        ProfitMargin,
    }
}

mod m20250101_000002_create_manifest_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_manifest_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ManifestItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ManifestItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ManifestItems::ManifestId).uuid().not_null())
                        .col(
                            ColumnDef::new(ManifestItems::ItemNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ManifestItems::Title).string().not_null())
                        .col(
                            ColumnDef::new(ManifestItems::Msrp)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ManifestItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(ManifestItems::Pallet).string().null())
                        .col(ColumnDef::new(ManifestItems::Notes).string().null())
                        .col(
                            ColumnDef::new(ManifestItems::EstimatedSalePrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ManifestItems::Profit)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ManifestItems::Demand).string().not_null())
                        .col(
                            ColumnDef::new(ManifestItems::SalesTime)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ManifestItems::Reasoning)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ManifestItems::AssessmentSource)
                                .string()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_manifest_items_manifest_id")
                                .from(ManifestItems::Table, ManifestItems::ManifestId)
                                .to(Manifests::Table, Manifests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_manifest_items_manifest_id")
                        .table(ManifestItems::Table)
                        .col(ManifestItems::ManifestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ManifestItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ManifestItems {
        Table,
        Id,
        ManifestId,
        ItemNumber,
        Title,
        Msrp,
        Quantity,
        Pallet,
        Notes,
        EstimatedSalePrice,
        Profit,
        Demand,
        SalesTime,
        Reasoning,
        AssessmentSource,
    }

    #[derive(Iden)]
    enum Manifests {
        Table,
        Id,
    }
}

mod m20250101_000003_create_uploads_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_uploads_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Uploads::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Uploads::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Uploads::Filename).string().not_null())
                        .col(ColumnDef::new(Uploads::FileHash).string().not_null())
                        .col(ColumnDef::new(Uploads::Status).string().not_null())
                        .col(
                            ColumnDef::new(Uploads::TotalItems)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Uploads::ManifestId).uuid().null())
                        .col(ColumnDef::new(Uploads::CreatedAt).timestamp().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_uploads_manifest_id")
                                .from(Uploads::Table, Uploads::ManifestId)
                                .to(Manifests::Table, Manifests::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_uploads_file_hash")
                        .table(Uploads::Table)
                        .col(Uploads::FileHash)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Uploads::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Uploads {
        Table,
        Id,
        Filename,
        FileHash,
        Status,
        TotalItems,
        ManifestId,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Manifests {
        Table,
        Id,
    }
}
