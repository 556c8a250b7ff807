use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if !manager.has_table("transactions").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Transactions::Address).string().not_null())
                        .col(ColumnDef::new(Transactions::TxHash).string().not_null())
                        .col(ColumnDef::new(Transactions::Lt).big_integer().not_null())
                        .col(ColumnDef::new(Transactions::OpCode).string().not_null())
                        .col(ColumnDef::new(Transactions::ExitCode).integer().not_null())
                        .col(
                            ColumnDef::new(Transactions::Detail)
                                .text()
                                .not_null()
                                .default("{}"),
                        )
                        .col(
                            ColumnDef::new(Transactions::IsOrderPlacement)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // (address, tx_hash, lt) is the idempotency key of the indexer
            manager
                .create_index(
                    Index::create()
                        .name("transactions_address_hash_lt")
                        .table(Transactions::Table)
                        .col(Transactions::Address)
                        .col(Transactions::TxHash)
                        .col(Transactions::Lt)
                        .unique()
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("transactions_is_order_placement")
                        .table(Transactions::Table)
                        .col(Transactions::IsOrderPlacement)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("orders").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Orders::Address)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::TorrentHash).string().not_null())
                        .col(ColumnDef::new(Orders::OwnerAddress).string().not_null())
                        .col(ColumnDef::new(Orders::FileMerkleHash).string().not_null())
                        .col(
                            ColumnDef::new(Orders::FileSizeInBytes)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::StoragePeriodInSec)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::MaxStorageProofSpanInSec)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::MaxStorageProviders)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::TreasuryInfo)
                                .text()
                                .not_null()
                                .default("{}"),
                        )
                        .col(
                            ColumnDef::new(Orders::Started)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalRewards)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::PeriodFinish)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Price)
                                .double()
                                .not_null()
                                .default(0.0),
                        )
                        .col(
                            ColumnDef::new(Orders::OrderState)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("orders_torrent_hash", Orders::TorrentHash),
                ("orders_order_state", Orders::OrderState),
                ("orders_total_rewards", Orders::TotalRewards),
                ("orders_period_finish", Orders::PeriodFinish),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .name(name)
                            .table(Orders::Table)
                            .col(column)
                            .if_not_exists()
                            .to_owned(),
                    )
                    .await?;
            }
        }

        if !manager.has_table("tasks").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Tasks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Tasks::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Tasks::OrderId)
                                .big_integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Tasks::ProviderAddress)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Tasks::TaskState)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Tasks::LastProofTime)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Tasks::NextProofTime)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Tasks::HeaderRetries)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Tasks::ChildRetries)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Tasks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Tasks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("tasks_task_state")
                        .table(Tasks::Table)
                        .col(Tasks::TaskState)
                        .if_not_exists()
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_table("configs").await? {
            manager
                .create_table(
                    Table::create()
                        .table(Configs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Configs::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Configs::ConfigKey)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Configs::ConfigValue).string().not_null())
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Configs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Address,
    TxHash,
    Lt,
    OpCode,
    ExitCode,
    Detail,
    IsOrderPlacement,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
enum Orders {
    Table,
    Id,
    Address,
    TorrentHash,
    OwnerAddress,
    FileMerkleHash,
    FileSizeInBytes,
    StoragePeriodInSec,
    MaxStorageProofSpanInSec,
    MaxStorageProviders,
    TreasuryInfo,
    Started,
    TotalRewards,
    PeriodFinish,
    Price,
    OrderState,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    OrderId,
    ProviderAddress,
    TaskState,
    LastProofTime,
    NextProofTime,
    HeaderRetries,
    ChildRetries,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Configs {
    Table,
    Id,
    ConfigKey,
    ConfigValue,
}
