//! Create vote table migration.

use sea_orm_migration::prelude::*;

use super::m20250101_000002_create_question_table::Question;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vote::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vote::QuestionId).integer().not_null())
                    .col(ColumnDef::new(Vote::IpAddress).string_len(45).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_question")
                            .from(Vote::Table, Vote::QuestionId)
                            .to(Question::Table, Question::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (question_id, ip_address), one vote per address
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_question_ip_unique")
                    .table(Vote::Table)
                    .col(Vote::QuestionId)
                    .col(Vote::IpAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    QuestionId,
    IpAddress,
}
