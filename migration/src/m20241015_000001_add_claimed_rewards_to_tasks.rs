use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Amount settled by the reward claim stage
        if manager.has_table("tasks").await?
            && !manager.has_column("tasks", "claimed_rewards").await?
        {
            manager
                .alter_table(
                    Table::alter()
                        .table(Tasks::Table)
                        .add_column(
                            ColumnDef::new(Tasks::ClaimedRewards)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.has_table("tasks").await?
            && manager.has_column("tasks", "claimed_rewards").await?
        {
            manager
                .alter_table(
                    Table::alter()
                        .table(Tasks::Table)
                        .drop_column(Tasks::ClaimedRewards)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}

#[derive(Iden)]
enum Tasks {
    Table,
    ClaimedRewards,
}
