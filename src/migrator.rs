use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_cattle_table::Migration),
            Box::new(m20240301_000003_create_staff_table::Migration),
            Box::new(m20240301_000004_create_transactions_table::Migration),
        ]
    }
}

mod m20240301_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Email,
        Name,
        PasswordHash,
        Role,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_cattle_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_cattle_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Cattle::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Cattle::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Cattle::Name).string().not_null())
                        .col(ColumnDef::new(Cattle::Type).string().not_null())
                        .col(ColumnDef::new(Cattle::Age).integer().not_null().default(0))
                        .col(
                            ColumnDef::new(Cattle::PurchasePrice)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Cattle::PurchaseDate).date().not_null())
                        .col(
                            ColumnDef::new(Cattle::Status)
                                .string_len(32)
                                .not_null()
                                .default("active"),
                        )
                        .col(ColumnDef::new(Cattle::MarketPrice).big_integer().null())
                        .col(
                            ColumnDef::new(Cattle::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Cattle::UpdatedAt)
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
                        .name("idx_cattle_status")
                        .table(Cattle::Table)
                        .col(Cattle::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Cattle::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Cattle {
        Table,
        Id,
        Name,
        Type,
        Age,
        PurchasePrice,
        PurchaseDate,
        Status,
        MarketPrice,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_staff_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_staff_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Staff::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Staff::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Staff::Name).string().not_null())
                        .col(ColumnDef::new(Staff::Cnic).string().not_null())
                        .col(ColumnDef::new(Staff::Phone).string().not_null())
                        .col(
                            ColumnDef::new(Staff::Salary)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Staff::DateOfHiring).date().not_null())
                        .col(
                            ColumnDef::new(Staff::Status)
                                .string_len(32)
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(Staff::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Staff::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Staff::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Staff {
        Table,
        Id,
        Name,
        Cnic,
        Phone,
        Salary,
        DateOfHiring,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_transactions_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_transactions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Transactions::Name).string().not_null())
                        .col(
                            ColumnDef::new(Transactions::Type)
                                .string_len(16)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Category).string().not_null())
                        .col(
                            ColumnDef::new(Transactions::Amount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Transactions::Date).date().not_null())
                        .col(ColumnDef::new(Transactions::Details).json().null())
                        .col(ColumnDef::new(Transactions::CattleId).integer().null())
                        .col(ColumnDef::new(Transactions::StaffId).integer().null())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transactions_cattle_id")
                                .from(Transactions::Table, Transactions::CattleId)
                                .to(Cattle::Table, Cattle::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transactions_staff_id")
                                .from(Transactions::Table, Transactions::StaffId)
                                .to(Staff::Table, Staff::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_date")
                        .table(Transactions::Table)
                        .col(Transactions::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_cattle_id")
                        .table(Transactions::Table)
                        .col(Transactions::CattleId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_staff_id")
                        .table(Transactions::Table)
                        .col(Transactions::StaffId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        Name,
        Type,
        Category,
        Amount,
        Date,
        Details,
        CattleId,
        StaffId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Cattle {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Staff {
        Table,
        Id,
    }
}
